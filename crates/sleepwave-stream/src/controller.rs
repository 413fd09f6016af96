//! Background streaming task with a control channel

use crate::event::{EndReason, StreamEvent};
use crate::session::StreamSession;
use serde::{Deserialize, Serialize};
use sleepwave_core::ErrorKind;
use std::io::Read;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Commands accepted by a running stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCommand {
    /// Hold ticks until resumed; the read handle stays open
    Pause,
    Resume,
    /// End the stream without a terminal event
    Stop,
}

/// How a spawned stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    Completed(EndReason),
    Failed(ErrorKind),
    /// Stopped by command or by the event receiver going away
    Cancelled,
}

/// Handles to a stream running on the tokio runtime
pub struct StreamHandle {
    /// Events in tick order; the last one is terminal unless cancelled
    pub events: mpsc::Receiver<StreamEvent>,
    pub control: mpsc::Sender<StreamCommand>,
    pub task: JoinHandle<StreamOutcome>,
}

impl StreamHandle {
    /// Ask the stream to stop and wait for the task to finish
    pub async fn stop(self) -> StreamOutcome {
        let StreamHandle {
            events,
            control,
            task,
        } = self;
        // dropping the receiver cancels even if the control send races the end
        let _ = control.send(StreamCommand::Stop).await;
        drop(events);
        task.await.unwrap_or(StreamOutcome::Cancelled)
    }
}

/// Run `session` on a background task
pub fn spawn_stream<R>(session: StreamSession<R>) -> StreamHandle
where
    R: Read + Send + 'static,
{
    let buffer = session.config().event_buffer.max(1);
    let (event_tx, events) = mpsc::channel(buffer);
    let (control, control_rx) = mpsc::channel(8);

    let task = tokio::spawn(run_stream(session, event_tx, control_rx));

    StreamHandle {
        events,
        control,
        task,
    }
}

async fn run_stream<R: Read>(
    mut session: StreamSession<R>,
    event_tx: mpsc::Sender<StreamEvent>,
    mut control_rx: mpsc::Receiver<StreamCommand>,
) -> StreamOutcome {
    let mut control = ControlState::default();

    tracing::info!(
        channel = session.channel(),
        label = %session.channel_label(),
        tick_interval_ms = session.config().tick_interval_ms,
        "stream task started"
    );

    loop {
        tokio::select! {
            biased;

            command = control_rx.recv(), if control.open => {
                if control.apply(command, session.ticks()) {
                    session.cancel();
                    return StreamOutcome::Cancelled;
                }
            }

            _ = event_tx.closed() => {
                tracing::debug!("event receiver dropped");
                session.cancel();
                return StreamOutcome::Cancelled;
            }

            event = session.next_event(), if !control.paused => {
                let event = match event {
                    Some(event) => event,
                    None => return StreamOutcome::Cancelled,
                };
                let outcome = match &event {
                    StreamEvent::Data(_) => None,
                    StreamEvent::Done(summary) => Some(StreamOutcome::Completed(summary.reason)),
                    StreamEvent::Error(failure) => Some(StreamOutcome::Failed(failure.kind)),
                };

                let ticks = session.ticks();
                match reserve_slot(&event_tx, &mut control_rx, &mut control, ticks).await {
                    Some(permit) => permit.send(event),
                    None => {
                        session.cancel();
                        return StreamOutcome::Cancelled;
                    }
                }
                if let Some(outcome) = outcome {
                    return outcome;
                }
            }
        }
    }
}

/// Pause and channel state driven by [`StreamCommand`]s
#[derive(Debug)]
struct ControlState {
    paused: bool,
    open: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        ControlState {
            paused: false,
            open: true,
        }
    }
}

impl ControlState {
    /// Apply one received command; `true` means stop
    fn apply(&mut self, command: Option<StreamCommand>, ticks: u64) -> bool {
        match command {
            Some(StreamCommand::Stop) => return true,
            Some(StreamCommand::Pause) => {
                tracing::info!(ticks, "stream paused");
                self.paused = true;
            }
            Some(StreamCommand::Resume) => {
                tracing::info!(ticks, "stream resumed");
                self.paused = false;
            }
            None => {
                tracing::debug!("control channel closed");
                self.open = false;
            }
        }
        false
    }
}

/// Wait for room in the event channel while still serving commands.
///
/// `None` when the stream must stop: a `Stop` arrived or the receiver is gone.
async fn reserve_slot<'a>(
    event_tx: &'a mpsc::Sender<StreamEvent>,
    control_rx: &mut mpsc::Receiver<StreamCommand>,
    control: &mut ControlState,
    ticks: u64,
) -> Option<mpsc::Permit<'a, StreamEvent>> {
    loop {
        tokio::select! {
            biased;

            command = control_rx.recv(), if control.open => {
                if control.apply(command, ticks) {
                    return None;
                }
            }

            permit = event_tx.reserve() => return permit.ok(),
        }
    }
}

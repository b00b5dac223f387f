//! Funnel runtime: hosts a [`FlowController`] on a single tokio task and
//! carries out the effects it asks for.
//!
//! User actions arrive as commands with a oneshot reply; timers, the idle
//! monitor and remote calls report back through an internal event channel.
//! Both are drained by the same loop, so the controller sees one input at a
//! time in arrival order.

use crate::backend::{ContactSink, ProductMatcher};
use crate::dialogue::flow::{Effect, FlowController, FlowError, FlowEvent, FlowSnapshot, TimerSlot, UserAction};
use crate::dialogue::idle_timeout::IdleTimeout;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("Funnel runtime has stopped")]
    Stopped,
}

enum Command {
    Act {
        action: UserAction,
        reply: oneshot::Sender<Result<(), FlowError>>,
    },
    Shutdown,
}

/// Cloneable front door to a running funnel.
#[derive(Clone)]
pub struct FunnelHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<FlowSnapshot>,
}

impl FunnelHandle {
    /// Submit a user action and wait until the controller has applied it.
    pub async fn act(&self, action: UserAction) -> Result<(), RuntimeError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Act { action, reply })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        outcome.await.map_err(|_| RuntimeError::Stopped)??;
        Ok(())
    }

    /// Latest published snapshot plus change notifications.
    pub fn snapshots(&self) -> watch::Receiver<FlowSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Ask the loop to stop. Outstanding timers and remote calls are dropped.
    pub async fn shutdown(&self) {
        if self.commands.send(Command::Shutdown).await.is_err() {
            tracing::debug!("[Runtime] Shutdown requested but the loop is already gone");
        }
    }
}

pub struct FunnelRuntime {
    controller: FlowController,
    matcher: Arc<dyn ProductMatcher>,
    sink: Arc<dyn ContactSink>,
    idle: IdleTimeout,
    timers: HashMap<TimerSlot, JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<FlowEvent>,
    events: mpsc::UnboundedReceiver<FlowEvent>,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<FlowSnapshot>,
}

impl FunnelRuntime {
    /// Start the controller on its own task. The controller's `start` runs
    /// first, so the returned handle already sees the welcome snapshot.
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        controller: FlowController,
        matcher: Arc<dyn ProductMatcher>,
        sink: Arc<dyn ContactSink>,
        idle_timeout: Duration,
    ) -> (FunnelHandle, JoinHandle<()>) {
        let (commands_tx, commands) = mpsc::channel(32);
        let (events_tx, events) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(controller.snapshot());

        let idle_tx = events_tx.clone();
        let idle = IdleTimeout::new(idle_timeout, move || {
            // The loop owns the receiver; a send only fails once it has exited
            let _ = idle_tx.send(FlowEvent::IdleTimeout);
        });
        // Armed only on request from the controller
        let mut runtime = Self {
            controller,
            matcher,
            sink,
            idle,
            timers: HashMap::new(),
            events_tx,
            events,
            commands,
            snapshots,
        };

        let effects = runtime.controller.start();
        runtime.apply(effects);
        runtime.publish();

        let task = tokio::spawn(runtime.run());
        let handle = FunnelHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (handle, task)
    }

    async fn run(mut self) {
        tracing::info!("[Runtime] Funnel started at step {}", self.controller.step());
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Act { action, reply }) => {
                        let outcome = match self.controller.handle_action(action) {
                            Ok(effects) => {
                                self.apply(effects);
                                Ok(())
                            }
                            Err(e) => {
                                tracing::debug!("[Runtime] Action rejected: {}", e);
                                Err(e)
                            }
                        };
                        self.publish();
                        let _ = reply.send(outcome);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = self.events.recv() => {
                    let effects = self.controller.handle_event(event);
                    self.apply(effects);
                    self.publish();
                }
            }
        }
        self.teardown();
        tracing::info!("[Runtime] Funnel stopped");
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Schedule {
                    slot,
                    generation,
                    after,
                } => {
                    let tx = self.events_tx.clone();
                    let sleeper = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(FlowEvent::Timer { slot, generation });
                    });
                    if let Some(previous) = self.timers.insert(slot, sleeper) {
                        previous.abort();
                    }
                }
                Effect::Cancel { slot } => {
                    if let Some(sleeper) = self.timers.remove(&slot) {
                        sleeper.abort();
                    }
                }
                Effect::ArmIdle => self.idle.reset_timeout(),
                Effect::DisarmIdle => self.idle.clear_timer(),
                Effect::FetchProduct {
                    request_id,
                    preferences,
                } => {
                    let matcher = self.matcher.clone();
                    let tx = self.events_tx.clone();
                    tokio::spawn(async move {
                        let result = matcher.match_product(&preferences).await;
                        let _ = tx.send(FlowEvent::ProductFetched { request_id, result });
                    });
                }
                Effect::SubmitContact {
                    request_id,
                    submission,
                } => {
                    let sink = self.sink.clone();
                    let tx = self.events_tx.clone();
                    tokio::spawn(async move {
                        let result = sink.submit(&submission).await;
                        let _ = tx.send(FlowEvent::ContactSubmitted { request_id, result });
                    });
                }
            }
        }
    }

    fn publish(&self) {
        let snapshot = self.controller.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn teardown(&mut self) {
        for (_, sleeper) in self.timers.drain() {
            sleeper.abort();
        }
        self.idle.clear_timer();
    }
}

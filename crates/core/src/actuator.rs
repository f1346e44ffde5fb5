//! Rate-limited shutter actuator.
//!
//! A shutter cannot jump to a new position. Each [`Actuator`] owns a bounded
//! command queue and one background worker that walks `current` toward the
//! accepted target by at most `max_step` points per tick. State is exposed
//! only through [`Actuator::snapshot`], which copies all fields under a
//! single read lock.
//!
//! # Lifecycle
//!
//! ```text
//!  spawn ──► worker waits on queue ──► target accepted ──► tick/step ... ──► settled
//!                 ▲                                                            │
//!                 └────────────────────────────────────────────────────────────┘
//!  shutdown ──► queue closed ──► worker drains remaining commands ──► Stopped
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::{ActuatorConfig, RetargetPolicy};
use crate::error::Error;
use crate::percentage::Percentage;
use crate::result::Result;
use crate::state::ActuatorState;

const EVENT_CAPACITY: usize = 64;

/// Progress notifications published by an actuator's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorEvent {
    /// The worker dequeued a command and made it the target.
    TargetAccepted { target: u8 },
    /// One tick moved the shutter.
    Stepped { current: u8 },
    /// `current` reached `target`.
    Settled { position: u8 },
    /// The queue was closed and drained; the worker exited.
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct Position {
    current: u8,
    target: u8,
    moving: bool,
}

/// Next position after one tick, never crossing `target`.
#[must_use]
pub fn next_position(current: u8, target: u8, max_step: u8) -> u8 {
    let step = current.abs_diff(target).min(max_step);
    if current < target {
        current.saturating_add(step)
    } else {
        current.saturating_sub(step)
    }
}

/// One shutter: its state, command queue and convergence worker.
pub struct Actuator {
    name: String,
    state: Arc<RwLock<Position>>,
    commands: Mutex<Option<mpsc::Sender<Percentage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<ActuatorEvent>,
}

impl Actuator {
    /// Spawn a fully open actuator.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(name: impl Into<String>, config: &ActuatorConfig) -> Self {
        Self::spawn_at(name, config, Percentage::OPEN)
    }

    /// Spawn an actuator resting at `position`.
    ///
    /// Used to rehydrate persisted state: `current` and `target` both start
    /// at `position`, so nothing moves until a command arrives.
    pub fn spawn_at(name: impl Into<String>, config: &ActuatorConfig, position: Percentage) -> Self {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(config.queue_depth.max(1));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = Arc::new(RwLock::new(Position {
            current: position.value(),
            target: position.value(),
            moving: false,
        }));

        let worker = Worker {
            name: name.clone(),
            state: Arc::clone(&state),
            commands: receiver,
            events: events.clone(),
            tick: config.tick_interval,
            max_step: config.max_step.max(1),
            policy: config.retarget,
        };
        let handle = tokio::spawn(worker.run());

        debug!(shutter = %name, position = position.value(), "Actuator spawned");

        Self {
            name,
            state,
            commands: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate and queue a new target.
    ///
    /// Waits for queue space when the queue is full. The target is applied
    /// by the worker, not by this call.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when `percentage` is outside `0..=100` (nothing
    /// is queued), [`Error::QueueClosed`] after [`Actuator::shutdown`].
    pub async fn set_target(&self, percentage: i64) -> Result<()> {
        let target = Percentage::new(percentage)?;
        self.request(target).await
    }

    /// Queue an already validated target.
    ///
    /// # Errors
    ///
    /// [`Error::QueueClosed`] after [`Actuator::shutdown`].
    pub async fn request(&self, target: Percentage) -> Result<()> {
        let sender = self
            .commands
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::queue_closed(&self.name))?;

        sender
            .send(target)
            .await
            .map_err(|_| Error::queue_closed(&self.name))?;

        debug!(shutter = %self.name, target = target.value(), "Target queued");
        Ok(())
    }

    /// Consistent copy of the current state.
    pub async fn snapshot(&self) -> ActuatorState {
        let position = *self.state.read().await;
        ActuatorState {
            name: self.name.clone(),
            current: position.current,
            target: position.target,
            moving: position.moving,
        }
    }

    /// Number of commands queued but not yet taken by the worker.
    ///
    /// Zero once the queue is closed.
    pub async fn pending(&self) -> usize {
        self.commands
            .lock()
            .await
            .as_ref()
            .map_or(0, |sender| sender.max_capacity().saturating_sub(sender.capacity()))
    }

    /// Receive worker progress events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ActuatorEvent> {
        self.events.subscribe()
    }

    /// Close the command queue.
    ///
    /// The worker finishes what is already queued and then exits. The
    /// actuator cannot be reused afterwards.
    pub async fn shutdown(&self) {
        if self.commands.lock().await.take().is_some() {
            debug!(shutter = %self.name, "Command queue closed");
        }
    }

    /// Wait for the worker to exit.
    ///
    /// Only returns after [`Actuator::shutdown`] and once queued commands have
    /// been drained. Later calls return immediately.
    pub async fn stopped(&self) {
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(shutter = %self.name, error = %e, "Actuator worker ended abnormally");
            }
        }
    }
}

impl std::fmt::Debug for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuator").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The single writer of one actuator's position.
struct Worker {
    name: String,
    state: Arc<RwLock<Position>>,
    commands: mpsc::Receiver<Percentage>,
    events: broadcast::Sender<ActuatorEvent>,
    tick: Duration,
    max_step: u8,
    policy: RetargetPolicy,
}

impl Worker {
    async fn run(mut self) {
        while let Some(requested) = self.commands.recv().await {
            self.retarget(requested).await;
            self.converge().await;
        }

        debug!(shutter = %self.name, "Worker stopped");
        self.emit(ActuatorEvent::Stopped);
    }

    async fn converge(&mut self) {
        while !self.is_settled().await {
            tokio::time::sleep(self.tick).await;

            if self.policy == RetargetPolicy::Interrupt {
                if let Ok(next) = self.commands.try_recv() {
                    self.retarget(next).await;
                }
            }

            self.step().await;
        }
    }

    async fn is_settled(&self) -> bool {
        let state = self.state.read().await;
        state.current == state.target
    }

    async fn retarget(&self, requested: Percentage) {
        let target = requested.value();
        let (current, settled) = {
            let mut state = self.state.write().await;
            state.target = target;
            state.moving = state.current != target;
            (state.current, !state.moving)
        };

        debug!(shutter = %self.name, current, target, "Target accepted");
        self.emit(ActuatorEvent::TargetAccepted { target });
        if settled {
            self.emit(ActuatorEvent::Settled { position: target });
        }
    }

    async fn step(&self) {
        let moved = {
            let mut state = self.state.write().await;
            if state.current == state.target {
                None
            } else {
                state.current = next_position(state.current, state.target, self.max_step);
                state.moving = state.current != state.target;
                Some((state.current, state.target))
            }
        };

        if let Some((current, target)) = moved {
            trace!(shutter = %self.name, current, target, "Stepped");
            self.emit(ActuatorEvent::Stepped { current });
            if current == target {
                debug!(shutter = %self.name, position = current, "Settled");
                self.emit(ActuatorEvent::Settled { position: current });
            }
        }
    }

    fn emit(&self, event: ActuatorEvent) {
        // No subscribers is the normal case.
        let _ = self.events.send(event);
    }
}

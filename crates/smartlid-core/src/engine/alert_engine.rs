//! The alert engine task.
//!
//! One tokio task owns [`AlertState`] and consumes commands from a single
//! channel. Sensor edge handlers (possibly running on a GPIO interrupt
//! thread) and countdown timers only send commands, so the state is never
//! touched from two places at once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::responder::{Job, Responder};
use super::state::AlertState;
use crate::config::{Config, SoundConfig};
use crate::error::{CoreError, HardwareError};
use crate::events::Event;
use crate::hardware::{Actuator, BinarySensor, LidState, SoundPlayer};
use crate::notify::Notifier;

const EVENT_CAPACITY: usize = 64;

/// Engine parameters taken from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub lid_open_timeout: Duration,
    pub daily_alert_threshold: u32,
    pub sounds: SoundConfig,
    /// Report the finished day's total when the counter rolls over.
    pub daily_summary: bool,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            lid_open_timeout: config.alert.lid_open_timeout(),
            daily_alert_threshold: config.alert.daily_alert_threshold,
            sounds: config.sounds.clone(),
            daily_summary: config.line.daily_summary,
        }
    }
}

/// Everything the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub sensor: Arc<dyn BinarySensor>,
    pub actuator: Arc<dyn Actuator>,
    pub player: Arc<dyn SoundPlayer>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Release sensor, actuator and sound player.
    pub fn release(&self) {
        self.sensor.release();
        self.actuator.release();
        self.player.release();
        info!("hardware released");
    }
}

/// Point-in-time view of the engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub countdown_active: bool,
    pub daily_count: u32,
    pub last_reset_date: NaiveDate,
    pub threshold: u32,
}

enum Command {
    Opened,
    Closed,
    Expired { generation: u64 },
    Snapshot(oneshot::Sender<EngineSnapshot>),
    Shutdown,
}

/// Handle to a running engine task.
pub struct AlertEngine {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<Event>,
    task: JoinHandle<()>,
}

impl AlertEngine {
    /// Subscribe to the sensor, read its current value and spawn the engine
    /// and responder tasks. A lid that is already open starts a countdown
    /// immediately.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if edge handlers cannot be registered or the initial
    /// sensor read fails.
    pub fn start(settings: EngineSettings, collaborators: &Collaborators) -> Result<Self, HardwareError> {
        let (commands, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let opened = commands.clone();
        collaborators.sensor.on_rising(Box::new(move || {
            let _ = opened.send(Command::Opened);
        }))?;
        let closed = commands.clone();
        collaborators.sensor.on_falling(Box::new(move || {
            let _ = closed.send(Command::Closed);
        }))?;
        let lid = collaborators.sensor.read()?;

        let (escalations, escalation_rx) = mpsc::unbounded_channel();
        let responder = Responder::new(
            Arc::clone(&collaborators.player),
            Arc::clone(&collaborators.actuator),
            Arc::clone(&collaborators.notifier),
            settings.sounds.clone(),
            events.clone(),
        )
        .spawn(escalation_rx);

        let task = EngineTask {
            state: AlertState::new(settings.daily_alert_threshold, collaborators.clock.today()),
            settings,
            sensor: Arc::clone(&collaborators.sensor),
            clock: Arc::clone(&collaborators.clock),
            commands: commands.downgrade(),
            events: events.clone(),
            timer: None,
            escalations: Some(escalations),
            responder: Some(responder),
        };
        let task = tokio::spawn(task.run(rx, lid));

        Ok(Self {
            commands,
            events,
            task,
        })
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Read the state through the engine's own queue.
    pub async fn snapshot(&self) -> Result<EngineSnapshot, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .map_err(|_| CoreError::Custom("alert engine is not running".into()))?;
        rx.await
            .map_err(|_| CoreError::Custom("alert engine is not running".into()))
    }

    /// Feed a lid-open edge as if it came from the sensor.
    pub fn lid_opened(&self) {
        let _ = self.commands.send(Command::Opened);
    }

    /// Feed a lid-closed edge as if it came from the sensor.
    pub fn lid_closed(&self) {
        let _ = self.commands.send(Command::Closed);
    }

    /// Cancel any countdown, let the responder finish what it already has,
    /// and stop. Collaborators are left for the caller to release.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            error!("alert engine task ended abnormally: {e}");
        }
    }
}

struct EngineTask {
    state: AlertState,
    settings: EngineSettings,
    sensor: Arc<dyn BinarySensor>,
    clock: Arc<dyn Clock>,
    commands: mpsc::WeakUnboundedSender<Command>,
    events: broadcast::Sender<Event>,
    timer: Option<JoinHandle<()>>,
    escalations: Option<mpsc::UnboundedSender<Job>>,
    responder: Option<JoinHandle<()>>,
}

impl EngineTask {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>, lid: LidState) {
        info!(
            lid = ?lid,
            timeout_secs = self.settings.lid_open_timeout.as_secs(),
            threshold = self.state.threshold(),
            "alert engine started"
        );
        self.emit(Event::EngineStarted { lid, at: Utc::now() });
        if lid.is_open() {
            self.arm();
        }

        while let Some(command) = rx.recv().await {
            match command {
                Command::Opened => self.arm(),
                Command::Closed => self.cancel(),
                Command::Expired { generation } => self.expired(generation),
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Command::Shutdown => break,
            }
        }

        self.stop().await;
    }

    fn arm(&mut self) {
        let Some(generation) = self.state.arm() else {
            debug!("countdown already running");
            return;
        };
        let timeout = self.settings.lid_open_timeout;
        let commands = self.commands.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(Command::Expired { generation });
            }
        }));
        self.emit(Event::CountdownStarted {
            generation,
            duration_secs: timeout.as_secs(),
            at: Utc::now(),
        });
    }

    fn cancel(&mut self) {
        let Some(generation) = self.state.cancel() else {
            return;
        };
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.emit(Event::CountdownCancelled {
            generation,
            at: Utc::now(),
        });
    }

    fn expired(&mut self, generation: u64) {
        if !self.state.expire(generation) {
            debug!(generation, "stale countdown expiry ignored");
            return;
        }
        self.timer = None;
        self.emit(Event::CountdownExpired {
            generation,
            at: Utc::now(),
        });

        let lid = self.sensor.read().unwrap_or_else(|e| {
            warn!("sensor read failed at check time, treating lid as closed: {e}");
            LidState::Closed
        });
        if !lid.is_open() {
            self.emit(Event::CheckSkipped {
                generation,
                at: Utc::now(),
            });
            return;
        }

        let escalation = self.state.record_escalation(self.clock.today());
        if let Some((previous_date, previous_count)) = escalation.rolled_over {
            self.emit(Event::DailyCounterReset {
                previous_date,
                previous_count,
                date: escalation.date,
                at: Utc::now(),
            });
            if self.settings.daily_summary {
                self.dispatch(Job::DailySummary {
                    date: previous_date,
                    total_count: previous_count,
                });
            }
        }
        self.emit(Event::EscalationTriggered {
            stage: escalation.stage,
            daily_count: escalation.daily_count,
            at: Utc::now(),
        });
        self.dispatch(Job::Escalate(escalation));
    }

    fn dispatch(&self, job: Job) {
        match &self.escalations {
            Some(tx) if tx.send(job).is_ok() => {}
            _ => error!("responder is gone; job dropped"),
        }
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            countdown_active: self.state.is_counting(),
            daily_count: self.state.daily_count(),
            last_reset_date: self.state.last_reset_date(),
            threshold: self.state.threshold(),
        }
    }

    async fn stop(&mut self) {
        self.cancel();
        self.escalations = None;
        if let Some(responder) = self.responder.take() {
            if let Err(e) = responder.await {
                error!("responder task ended abnormally: {e}");
            }
        }
        self.emit(Event::EngineStopped { at: Utc::now() });
        info!(daily_count = self.state.daily_count(), "alert engine stopped");
    }

    fn emit(&self, event: Event) {
        debug!(kind = event.kind(), "engine event");
        let _ = self.events.send(event);
    }
}

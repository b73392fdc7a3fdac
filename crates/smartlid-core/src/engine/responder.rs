//! Escalation responder.
//!
//! Runs the side effects of each escalation in order: sound, servo push, then
//! the remote notification for severe escalations. Jobs are taken from a
//! channel one at a time so the actuator and the notifier never overlap.
//! Every failure is logged and swallowed.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::escalation::Escalation;
use crate::config::SoundConfig;
use crate::error::HardwareError;
use crate::events::Event;
use crate::hardware::{Actuator, SoundPlayer};
use crate::notify::Notifier;

pub(crate) enum Job {
    Escalate(Escalation),
    /// Report the total of a day that has just ended.
    DailySummary { date: NaiveDate, total_count: u32 },
}

pub(crate) struct Responder {
    player: Arc<dyn SoundPlayer>,
    actuator: Arc<dyn Actuator>,
    notifier: Arc<dyn Notifier>,
    sounds: SoundConfig,
    events: broadcast::Sender<Event>,
}

impl Responder {
    pub(crate) fn new(
        player: Arc<dyn SoundPlayer>,
        actuator: Arc<dyn Actuator>,
        notifier: Arc<dyn Notifier>,
        sounds: SoundConfig,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            player,
            actuator,
            notifier,
            sounds,
            events,
        }
    }

    /// Consume jobs until every sender is dropped.
    pub(crate) fn spawn(self, mut rx: mpsc::UnboundedReceiver<Job>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Escalate(escalation) => self.respond(&escalation).await,
                    Job::DailySummary { date, total_count } => {
                        self.summarize(date, total_count).await;
                    }
                }
            }
            debug!("responder drained");
        })
    }

    async fn respond(&self, escalation: &Escalation) {
        let stage = escalation.stage;
        let count = escalation.daily_count;
        info!(stage = stage.number(), count, "responding to escalation");

        let sound = stage.sound(&self.sounds).to_path_buf();
        let sound_played = match self.play(sound.clone()).await {
            Ok(()) => true,
            Err(e) => {
                error!(path = %sound.display(), "alert sound failed: {e}");
                false
            }
        };

        let actuated = match self.push().await {
            Ok(()) => true,
            Err(e) => {
                error!("servo push failed: {e}");
                false
            }
        };

        let notified = if stage.notifies_remote() {
            match self.notifier.send_alert(count, escalation.date).await {
                Ok(()) => Some(true),
                Err(e) => {
                    warn!(notifier = self.notifier.name(), count, "notification not delivered: {e}");
                    Some(false)
                }
            }
        } else {
            None
        };

        let _ = self.events.send(Event::EscalationCompleted {
            stage,
            daily_count: count,
            sound_played,
            actuated,
            notified,
            at: Utc::now(),
        });
    }

    async fn summarize(&self, date: NaiveDate, total_count: u32) {
        let delivered = match self.notifier.send_daily_summary(date, total_count).await {
            Ok(()) => true,
            Err(e) => {
                warn!(notifier = self.notifier.name(), %date, "daily summary not delivered: {e}");
                false
            }
        };
        let _ = self.events.send(Event::DailySummarySent {
            date,
            total_count,
            delivered,
            at: Utc::now(),
        });
    }

    async fn play(&self, path: PathBuf) -> Result<(), HardwareError> {
        let player = Arc::clone(&self.player);
        tokio::task::spawn_blocking(move || player.play(&path))
            .await
            .map_err(|e| HardwareError::Audio(format!("playback task failed: {e}")))?
    }

    async fn push(&self) -> Result<(), HardwareError> {
        let actuator = Arc::clone(&self.actuator);
        tokio::task::spawn_blocking(move || actuator.push())
            .await
            .map_err(|e| HardwareError::Gpio(format!("actuator task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Stage;
    use crate::hardware::simulated::{SimulatedActuator, SimulatedPlayer};
    use crate::notify::recording::RecordingNotifier;

    struct Rig {
        player: Arc<SimulatedPlayer>,
        actuator: Arc<SimulatedActuator>,
        notifier: Arc<RecordingNotifier>,
        events: broadcast::Receiver<Event>,
        tx: mpsc::UnboundedSender<Job>,
        handle: JoinHandle<()>,
    }

    fn rig() -> Rig {
        let player = Arc::new(SimulatedPlayer::new());
        let actuator = Arc::new(SimulatedActuator::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let (events_tx, events) = broadcast::channel(16);
        let responder = Responder::new(
            player.clone(),
            actuator.clone(),
            notifier.clone(),
            SoundConfig {
                alert1: "one.mp3".into(),
                alert2: "two.mp3".into(),
            },
            events_tx,
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = responder.spawn(rx);
        Rig {
            player,
            actuator,
            notifier,
            events,
            tx,
            handle,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn escalation(stage: Stage, daily_count: u32) -> Job {
        Job::Escalate(Escalation {
            stage,
            daily_count,
            date: day(),
            rolled_over: None,
        })
    }

    #[tokio::test]
    async fn mild_plays_and_pushes_without_notifying() {
        let mut rig = rig();
        rig.tx.send(escalation(Stage::Mild, 1)).unwrap();
        drop(rig.tx);
        rig.handle.await.unwrap();

        assert_eq!(rig.player.played(), vec![PathBuf::from("one.mp3")]);
        assert_eq!(rig.actuator.push_count(), 1);
        assert!(rig.notifier.alerts().is_empty());
        match rig.events.recv().await.unwrap() {
            Event::EscalationCompleted { notified, .. } => assert_eq!(notified, None),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn failures_do_not_stop_later_steps() {
        let mut rig = rig();
        rig.player.set_failing(true);
        rig.actuator.set_failing(true);
        rig.notifier.set_failing(true);
        rig.tx.send(escalation(Stage::Severe, 2)).unwrap();
        drop(rig.tx);
        rig.handle.await.unwrap();

        assert_eq!(rig.notifier.dated_alerts(), vec![(2, day())]);
        match rig.events.recv().await.unwrap() {
            Event::EscalationCompleted {
                sound_played,
                actuated,
                notified,
                ..
            } => {
                assert!(!sound_played);
                assert!(!actuated);
                assert_eq!(notified, Some(false));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn daily_summary_reports_through_notifier() {
        let mut rig = rig();
        rig.tx
            .send(Job::DailySummary {
                date: day(),
                total_count: 3,
            })
            .unwrap();
        drop(rig.tx);
        rig.handle.await.unwrap();

        assert_eq!(rig.notifier.summaries(), vec![(day(), 3)]);
        assert_eq!(rig.actuator.push_count(), 0);
        match rig.events.recv().await.unwrap() {
            Event::DailySummarySent {
                date,
                total_count,
                delivered,
                ..
            } => {
                assert_eq!(date, day());
                assert_eq!(total_count, 3);
                assert!(delivered);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

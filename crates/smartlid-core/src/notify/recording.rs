//! Notifier that records sends instead of delivering them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::Notifier;
use crate::error::NotifyError;

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(u32, NaiveDate)>>,
    summaries: Mutex<Vec<(NaiveDate, u32)>>,
    messages: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts passed to `send_alert`, including failed attempts.
    pub fn alerts(&self) -> Vec<u32> {
        self.dated_alerts().into_iter().map(|(count, _)| count).collect()
    }

    pub fn dated_alerts(&self) -> Vec<(u32, NaiveDate)> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// `(date, total_count)` per daily summary.
    pub fn summaries(&self) -> Vec<(NaiveDate, u32)> {
        self.summaries.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Answer every send with HTTP 500.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn outcome(&self) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(NotifyError::Http {
                status: 500,
                body: "simulated failure".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send_alert(&self, count: u32, date: NaiveDate) -> Result<(), NotifyError> {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push((count, date));
        }
        self.outcome()
    }

    async fn send_daily_summary(
        &self,
        date: NaiveDate,
        total_count: u32,
    ) -> Result<(), NotifyError> {
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.push((date, total_count));
        }
        self.outcome()
    }

    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(text.to_string());
        }
        self.outcome()
    }
}

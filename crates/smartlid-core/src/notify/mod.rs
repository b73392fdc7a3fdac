pub mod line;
pub mod recording;

pub use line::LineMessaging;
pub use recording::RecordingNotifier;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::NotifyError;

/// A remote channel that receives stage 2 alerts.
/// Implementations are constructed once and shared with the responder;
/// a channel without credentials reports `NotifyError::Disabled` on send.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Unique identifier (e.g. "line").
    fn name(&self) -> &str;

    /// Whether sends can possibly succeed.
    fn is_enabled(&self) -> bool;

    /// Deliver the daily-count alert for the escalation dated `date`.
    /// `Ok` means the remote accepted it.
    async fn send_alert(&self, count: u32, date: NaiveDate) -> Result<(), NotifyError>;

    /// Report how many escalations `date` ended with.
    async fn send_daily_summary(&self, date: NaiveDate, total_count: u32)
        -> Result<(), NotifyError>;

    /// Deliver arbitrary text.
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;
}

//! LINE Messaging API -- push a text or Flex message to one user.

use async_trait::async_trait;
use chrono::NaiveDate;
use indoc::formatdoc;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::Notifier;
use crate::config::{LineConfig, MessageStyle};
use crate::error::NotifyError;

const FLEX_ALT_TEXT: &str = "SmartLid lid reminder";
const CONNECTION_TEST_TEXT: &str = "SmartLid system test message\nEverything is working.";

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Message<'a> {
    Text {
        text: &'a str,
    },
    Flex {
        #[serde(rename = "altText")]
        alt_text: &'a str,
        contents: serde_json::Value,
    },
}

struct Credentials {
    token: String,
    user_id: String,
}

pub struct LineMessaging {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
    template: String,
    style: MessageStyle,
    /// Daily totals below this read as a good day in the report.
    summary_threshold: u32,
    credentials: Option<Credentials>,
}

impl LineMessaging {
    /// Build from config. Missing credentials give a disabled channel.
    ///
    /// # Errors
    ///
    /// Returns an error only if the HTTP client cannot be constructed.
    pub fn new(config: &LineConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;

        let credentials = if config.has_credentials() {
            info!("LINE messaging ready");
            Some(Credentials {
                token: config.channel_access_token.trim().to_string(),
                user_id: config.user_id.trim().to_string(),
            })
        } else {
            warn!("LINE credentials not configured; remote notifications disabled");
            None
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout_secs,
            template: config.message_template.clone(),
            style: config.message_style,
            summary_threshold: 2,
            credentials,
        })
    }

    /// Use the configured alert threshold as the daily report's bar.
    pub fn with_summary_threshold(mut self, threshold: u32) -> Self {
        self.summary_threshold = threshold;
        self
    }

    /// Render the alert text for `count` on `date`.
    pub fn render_alert(&self, count: u32, date: NaiveDate) -> String {
        render_template(&self.template, count, date)
    }

    /// Alert as a Flex bubble, whatever the configured style.
    ///
    /// # Errors
    ///
    /// Same as [`Notifier::send_alert`].
    pub async fn send_alert_flex(&self, count: u32, date: NaiveDate) -> Result<(), NotifyError> {
        self.push(Message::Flex {
            alt_text: FLEX_ALT_TEXT,
            contents: alert_bubble(count, date),
        })
        .await
    }

    /// Push a fixed system message to check token and user id.
    ///
    /// # Errors
    ///
    /// Same as [`Notifier::send_message`].
    pub async fn test_connection(&self) -> Result<(), NotifyError> {
        info!("testing LINE connection");
        self.send_message(CONNECTION_TEST_TEXT).await
    }

    async fn push(&self, message: Message<'_>) -> Result<(), NotifyError> {
        let credentials = self.credentials.as_ref().ok_or(NotifyError::Disabled)?;

        let body = PushRequest {
            to: &credentials.user_id,
            messages: [message],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&credentials.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Http {
            status: status.as_u16(),
            body,
        })
    }

    fn classify(&self, err: reqwest::Error) -> NotifyError {
        if err.is_timeout() {
            NotifyError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            NotifyError::Transport(err)
        }
    }
}

/// Substitute `{count}` and `{date}`; an empty template falls back to a
/// built-in message.
pub fn render_template(template: &str, count: u32, date: NaiveDate) -> String {
    let date = date.format("%Y-%m-%d").to_string();
    if template.trim().is_empty() {
        return formatdoc! {"
            SmartLid reminder

            Date: {date}
            Lid left up today: {count} times"};
    }
    template
        .replace("{count}", &count.to_string())
        .replace("{date}", &date)
}

/// Text of the end-of-day report.
pub fn render_daily_summary(date: NaiveDate, total_count: u32, threshold: u32) -> String {
    let date = date.format("%Y-%m-%d");
    let verdict = if total_count < threshold {
        "Nice work today!"
    } else {
        "Please keep an eye on the habit."
    };
    formatdoc! {"
        SmartLid daily report

        Date: {date}
        Lid left up: {total_count} times

        {verdict}"}
}

fn alert_bubble(count: u32, date: NaiveDate) -> serde_json::Value {
    let date = date.format("%Y-%m-%d").to_string();
    json!({
        "type": "bubble",
        "hero": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                {"type": "text", "text": "SmartLid reminder", "weight": "bold", "size": "xl", "color": "#FF6B6B"}
            ],
            "backgroundColor": "#FFF3E0",
            "paddingAll": "20px"
        },
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                {"type": "text", "text": format!("Date: {date}"), "size": "sm", "color": "#666666"},
                {"type": "text", "text": format!("Today: {count} times"), "size": "md", "color": "#FF6B6B", "weight": "bold", "margin": "lg"},
                {"type": "separator", "margin": "lg"},
                {"type": "text", "text": "Please put the lid down after use.", "size": "sm", "color": "#666666", "wrap": true, "margin": "lg"}
            ]
        }
    })
}

#[async_trait]
impl Notifier for LineMessaging {
    fn name(&self) -> &str {
        "line"
    }

    fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    async fn send_alert(&self, count: u32, date: NaiveDate) -> Result<(), NotifyError> {
        info!(count, %date, style = ?self.style, "sending LINE alert");
        let result = match self.style {
            MessageStyle::Text => {
                let text = self.render_alert(count, date);
                self.push(Message::Text { text: &text }).await
            }
            MessageStyle::Flex => self.send_alert_flex(count, date).await,
        };
        match &result {
            Ok(()) => info!(count, "LINE alert delivered"),
            Err(e) => error!(count, "LINE alert failed: {e}"),
        }
        result
    }

    async fn send_daily_summary(
        &self,
        date: NaiveDate,
        total_count: u32,
    ) -> Result<(), NotifyError> {
        let text = render_daily_summary(date, total_count, self.summary_threshold);
        let result = self.push(Message::Text { text: &text }).await;
        match &result {
            Ok(()) => info!(%date, total_count, "LINE daily report delivered"),
            Err(e) => error!(%date, total_count, "LINE daily report failed: {e}"),
        }
        result
    }

    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        self.push(Message::Text { text }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn template_substitutes_count_and_date() {
        let text = render_template("{count} times on {date}", 3, date());
        assert_eq!(text, "3 times on 2026-03-14");
    }

    #[test]
    fn default_template_mentions_count() {
        let line = LineMessaging::new(&LineConfig::default()).unwrap();
        let text = line.render_alert(2, date());
        assert!(text.contains("2 times"));
        assert!(text.contains("2026-03-14"));
    }

    #[test]
    fn empty_template_uses_builtin_text() {
        let text = render_template("  ", 5, date());
        assert!(text.starts_with("SmartLid reminder"));
        assert!(text.contains("Lid left up today: 5 times"));
    }

    #[test]
    fn push_body_matches_line_schema() {
        let body = PushRequest {
            to: "U123",
            messages: [Message::Text { text: "hello" }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "to": "U123",
                "messages": [{"type": "text", "text": "hello"}]
            })
        );
    }

    #[test]
    fn flex_body_carries_alt_text_and_bubble() {
        let body = PushRequest {
            to: "U123",
            messages: [Message::Flex {
                alt_text: FLEX_ALT_TEXT,
                contents: alert_bubble(4, date()),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        let message = &json["messages"][0];
        assert_eq!(message["type"], "flex");
        assert_eq!(message["altText"], FLEX_ALT_TEXT);
        assert_eq!(message["contents"]["type"], "bubble");
        let texts = message["contents"]["body"]["contents"].to_string();
        assert!(texts.contains("Date: 2026-03-14"));
        assert!(texts.contains("Today: 4 times"));
    }

    #[test]
    fn daily_summary_verdict_follows_threshold() {
        let good = render_daily_summary(date(), 1, 2);
        assert!(good.starts_with("SmartLid daily report"));
        assert!(good.contains("Date: 2026-03-14"));
        assert!(good.contains("Lid left up: 1 times"));
        assert!(good.ends_with("Nice work today!"));

        let bad = render_daily_summary(date(), 2, 2);
        assert!(bad.ends_with("Please keep an eye on the habit."));
    }

    #[test]
    fn blank_credentials_disable_the_channel() {
        let config = LineConfig {
            channel_access_token: "   ".into(),
            user_id: "U1".into(),
            ..LineConfig::default()
        };
        let line = LineMessaging::new(&config).unwrap();
        assert!(!line.is_enabled());
        assert_eq!(line.name(), "line");
    }
}

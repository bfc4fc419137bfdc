//! Outbound notifications.
//!
//! Jobs render one message per user and hand the batch to [`fan_out`],
//! which keeps going past individual delivery failures.

use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::ledger::UserId;
use crate::storage::NotificationsConfig;

pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, user: UserId, message: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, user: UserId, message: &str) -> Result<(), NotifyError> {
        info!(user, text = message, "notification");
        Ok(())
    }
}

/// POSTs `{"chat_id": user, "text": message}` to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    url: String,
    timeout: Duration,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(NotifyError::NotConfigured("webhook_url is empty".into()));
        }
        Ok(Self {
            url,
            timeout: Duration::from_secs(10),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn deliver(&self, user: UserId, message: &str) -> Result<(), NotifyError> {
        // Built per call: a blocking client must not be created or dropped
        // on an async executor thread.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let body = json!({ "chat_id": user, "text": message });
        let resp = client.post(&self.url).json(&body).send()?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().unwrap_or_default();
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Records deliveries in memory. Users added with [`MemorySink::fail_for`]
/// get an error instead.
#[derive(Debug, Default)]
pub struct MemorySink {
    sent: Mutex<Vec<(UserId, String)>>,
    failing: Mutex<BTreeSet<UserId>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, user: UserId) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(user);
        }
    }

    pub fn messages(&self) -> Vec<(UserId, String)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn deliver(&self, user: UserId, message: &str) -> Result<(), NotifyError> {
        let fails = self.failing.lock().map(|f| f.contains(&user)).unwrap_or(false);
        if fails {
            return Err(NotifyError::Http(format!("delivery to {user} refused")));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((user, message.to_string()));
        }
        Ok(())
    }
}

/// Pick the sink the configuration asks for. Falls back to [`LogSink`]
/// when notifications are disabled or no webhook is set.
pub fn sink_from_config(config: &NotificationsConfig) -> Box<dyn NotificationSink> {
    match config.webhook_url.as_deref() {
        Some(url) if config.enabled => match WebhookSink::new(url) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                warn!(error = %e, "webhook sink unavailable, logging notifications instead");
                Box::new(LogSink)
            }
        },
        _ => Box::new(LogSink),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: Vec<(UserId, String)>,
}

/// Deliver every message, logging and collecting failures.
pub fn fan_out<I>(sink: &dyn NotificationSink, deliveries: I) -> DeliveryReport
where
    I: IntoIterator<Item = (UserId, String)>,
{
    let mut report = DeliveryReport::default();
    for (user, message) in deliveries {
        match sink.deliver(user, &message) {
            Ok(()) => report.sent += 1,
            Err(e) => {
                warn!(sink = sink.name(), user, error = %e, "notification failed");
                report.failed.push((user, e.to_string()));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn webhook_posts_chat_id_and_text() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/hook")
            .match_body(Matcher::Json(json!({ "chat_id": 42, "text": "hello" })))
            .with_status(200)
            .create();

        let sink = WebhookSink::new(format!("{}/hook", server.url())).unwrap();
        sink.deliver(42, "hello").unwrap();
        mock.assert();
    }

    #[test]
    fn webhook_non_success_is_rejected() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("boom")
            .create();

        let sink = WebhookSink::new(format!("{}/hook", server.url())).unwrap();
        match sink.deliver(1, "x") {
            Err(NotifyError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn empty_webhook_url_is_not_configured() {
        assert!(matches!(
            WebhookSink::new("  "),
            Err(NotifyError::NotConfigured(_))
        ));
    }

    #[test]
    fn fan_out_isolates_failures() {
        let sink = MemorySink::new();
        sink.fail_for(2);
        let report = fan_out(
            &sink,
            vec![(1, "a".to_string()), (2, "b".to_string()), (3, "c".to_string())],
        );
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2);
        assert_eq!(
            sink.messages(),
            vec![(1, "a".to_string()), (3, "c".to_string())]
        );
    }

    #[test]
    fn config_without_webhook_logs() {
        let config = NotificationsConfig::default();
        assert_eq!(sink_from_config(&config).name(), "log");

        let config = NotificationsConfig {
            webhook_url: Some("http://localhost:1/hook".into()),
            ..Default::default()
        };
        assert_eq!(sink_from_config(&config).name(), "webhook");

        let config = NotificationsConfig {
            enabled: false,
            webhook_url: Some("http://localhost:1/hook".into()),
            ..Default::default()
        };
        assert_eq!(sink_from_config(&config).name(), "log");
    }
}

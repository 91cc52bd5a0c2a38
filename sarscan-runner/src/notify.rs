//! Notification sink — pushes the report text to the LINE Messaging API.
//!
//! Delivery is fire-and-forget: one attempt, fixed timeout, failures are logged and
//! never abort a run.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NotifyConfig;

pub const LINE_PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";
pub const TOKEN_ENV: &str = "LINE_TOKEN";
pub const RECIPIENT_ENV: &str = "LINE_USER_ID";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("push rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("push request failed: {0}")]
    Network(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Anything that can deliver a text message.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, text: &str) -> Result<(), NotifyError>;

    /// False for sinks that accept messages without delivering them.
    fn delivers(&self) -> bool {
        true
    }
}

/// Send `text`, logging the outcome. Returns whether a message went out; never fails.
pub fn deliver(notifier: &dyn Notifier, text: &str) -> bool {
    match notifier.send(text) {
        Ok(()) if !notifier.delivers() => {
            debug!(sink = notifier.name(), "notification dropped");
            false
        }
        Ok(()) => {
            info!(sink = notifier.name(), chars = text.chars().count(), "notification sent");
            true
        }
        Err(e) => {
            warn!(sink = notifier.name(), error = %e, "notification failed");
            false
        }
    }
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

/// LINE Messaging API push to a single recipient.
pub struct LinePush {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
    recipient: String,
    max_chars: usize,
}

impl LinePush {
    pub fn new(
        token: impl Into<String>,
        recipient: impl Into<String>,
        config: &NotifyConfig,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: LINE_PUSH_URL.to_string(),
            token: token.into(),
            recipient: recipient.into(),
            max_chars: config.max_chars,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn body<'a>(&'a self, text: &'a str) -> PushRequest<'a> {
        PushRequest {
            to: &self.recipient,
            messages: vec![TextMessage {
                kind: "text",
                text: truncate_chars(text, self.max_chars),
            }],
        }
    }
}

impl Notifier for LinePush {
    fn name(&self) -> &str {
        "line"
    }

    fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&self.body(text))
            .send()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Sink used when pushing is disabled: drops every message.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn name(&self) -> &str {
        "null"
    }

    fn send(&self, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    fn delivers(&self) -> bool {
        false
    }
}

/// Pick a sink from explicit credentials. Missing or blank credentials disable
/// pushing with a warning.
pub fn from_credentials(
    token: Option<String>,
    recipient: Option<String>,
    config: &NotifyConfig,
) -> Box<dyn Notifier> {
    if !config.enabled {
        return Box::new(NullNotifier);
    }
    let token = token.filter(|t| !t.trim().is_empty());
    let recipient = recipient.filter(|r| !r.trim().is_empty());
    let (Some(token), Some(recipient)) = (token, recipient) else {
        warn!("{TOKEN_ENV} or {RECIPIENT_ENV} not set; notifications disabled");
        return Box::new(NullNotifier);
    };

    match LinePush::new(token.trim(), recipient.trim(), config) {
        Ok(push) => Box::new(push),
        Err(e) => {
            warn!(error = %e, "notifications disabled");
            Box::new(NullNotifier)
        }
    }
}

/// Pick a sink from `LINE_TOKEN` / `LINE_USER_ID`.
pub fn from_env(config: &NotifyConfig) -> Box<dyn Notifier> {
    from_credentials(
        std::env::var(TOKEN_ENV).ok(),
        std::env::var(RECIPIENT_ENV).ok(),
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        // multi-byte: each CJK char is 3 bytes
        assert_eq!(truncate_chars("台積電買進", 2), "台積");
        assert_eq!(truncate_chars("📈📉", 1), "📈");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn body_matches_push_api() {
        let config = NotifyConfig {
            max_chars: 4,
            ..Default::default()
        };
        let push = LinePush::new("tok", "U123", &config).unwrap();
        let json = serde_json::to_value(push.body("hello world")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "to": "U123",
                "messages": [{"type": "text", "text": "hell"}]
            })
        );
    }

    #[test]
    fn missing_credentials_disable_push() {
        let config = NotifyConfig::default();
        assert_eq!(from_credentials(None, Some("U1".into()), &config).name(), "null");
        assert_eq!(
            from_credentials(Some("  ".into()), Some("U1".into()), &config).name(),
            "null"
        );
        assert_eq!(
            from_credentials(Some("tok".into()), Some("U1".into()), &config).name(),
            "line"
        );
    }

    #[test]
    fn disabled_config_wins_over_credentials() {
        let config = NotifyConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(
            from_credentials(Some("tok".into()), Some("U1".into()), &config).name(),
            "null"
        );
    }

    #[test]
    fn unreachable_endpoint_is_logged_not_fatal() {
        let config = NotifyConfig {
            timeout_secs: 2,
            ..Default::default()
        };
        let push = LinePush::new("tok", "U1", &config)
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/push");
        assert!(matches!(push.send("hi"), Err(NotifyError::Network(_))));
        assert!(!deliver(&push, "hi"));
    }

    #[test]
    fn delivering_sink_reports_success() {
        struct Recorder(std::sync::Mutex<Vec<String>>);
        impl Notifier for Recorder {
            fn name(&self) -> &str {
                "recorder"
            }
            fn send(&self, text: &str) -> Result<(), NotifyError> {
                self.0.lock().unwrap().push(text.to_string());
                Ok(())
            }
        }
        let sink = Recorder(Default::default());
        assert!(deliver(&sink, "report"));
        assert_eq!(*sink.0.lock().unwrap(), vec!["report".to_string()]);
    }

    #[test]
    fn null_sink_drops_without_reporting_success() {
        assert!(NullNotifier.send("anything").is_ok());
        assert!(!NullNotifier.delivers());
        assert!(!deliver(&NullNotifier, "anything"));
    }
}

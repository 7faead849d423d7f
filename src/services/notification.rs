//! Notification service implementation
//!
//! Approval decisions are announced to the participant through an external
//! notifier. Delivery is best-effort: failures and timeouts are logged and
//! never reach the caller of the approval operation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::NotifierConfig;
use crate::models::{AttendanceEntry, Event};
use crate::utils::errors::{CharismError, Result};
use crate::utils::logging::log_notification_failure;

/// Template kind understood by the notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RegistrationApproved,
    RegistrationDisapproved,
}

impl NotificationKind {
    pub fn template_key(&self) -> &'static str {
        match self {
            NotificationKind::RegistrationApproved => "registration_approved",
            NotificationKind::RegistrationDisapproved => "registration_disapproved",
        }
    }
}

/// Notification request structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: Uuid,
    pub recipient: i64,
    pub kind: NotificationKind,
    pub event_id: i64,
    pub event_title: String,
    pub reason: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationRequest {
    /// Build the announcement for a decided entry
    pub fn for_decision(event: &Event, entry: &AttendanceEntry, kind: NotificationKind) -> Self {
        let message = match kind {
            NotificationKind::RegistrationApproved => {
                format!("Your registration for \"{}\" has been approved.", event.title)
            }
            NotificationKind::RegistrationDisapproved => match &entry.rejection_reason {
                Some(reason) => format!(
                    "Your registration for \"{}\" was not approved: {}",
                    event.title, reason
                ),
                None => format!("Your registration for \"{}\" was not approved.", event.title),
            },
        };

        Self {
            id: Uuid::new_v4(),
            recipient: entry.participant_id,
            kind,
            event_id: event.id,
            event_title: event.title.clone(),
            reason: entry.rejection_reason.clone(),
            message,
            created_at: Utc::now(),
        }
    }
}

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> Result<()>;
}

/// Writes notifications to the log only
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        info!(
            notification_id = %request.id,
            recipient = request.recipient,
            kind = request.kind.template_key(),
            event_id = request.event_id,
            "Notification logged"
        );
        Ok(())
    }
}

/// Posts notifications as JSON to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("charism/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        debug!(url = %self.url, notification_id = %request.id, "Posting notification");

        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CharismError::Notification(format!(
                "webhook answered {} for notification {}",
                status, request.id
            )));
        }
        Ok(())
    }
}

/// Fire-and-forget front for a notifier
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    /// Pick the notifier described by the configuration
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let notifier: Arc<dyn Notifier> = match &config.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone(), timeout)?),
            None => Arc::new(LogNotifier),
        };
        Ok(Self::new(notifier, timeout))
    }

    /// Send a notification, logging and discarding any failure.
    ///
    /// Returns whether delivery succeeded, for callers that want to record it.
    pub async fn dispatch(&self, request: NotificationRequest) -> bool {
        let kind = request.kind.template_key();
        match tokio::time::timeout(self.timeout, self.notifier.send(&request)).await {
            Ok(Ok(())) => {
                debug!(notification_id = %request.id, recipient = request.recipient, "Notification delivered");
                true
            }
            Ok(Err(e)) => {
                log_notification_failure(request.recipient, kind, &e.to_string());
                false
            }
            Err(_) => {
                log_notification_failure(request.recipient, kind, "timed out");
                false
            }
        }
    }
}

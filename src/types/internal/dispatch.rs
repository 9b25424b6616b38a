use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::InternalError;

/// Newsletter send state
///
/// `Draft -> Queued|Sent`, and back to `Draft` only when a send fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Draft,
    Queued,
    Sent,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Draft => "Draft",
            DispatchState::Queued => "Queued",
            DispatchState::Sent => "Sent",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchState {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(DispatchState::Draft),
            "Queued" => Ok(DispatchState::Queued),
            "Sent" => Ok(DispatchState::Sent),
            other => Err(InternalError::parse("dispatch_state", format!("unknown state {:?}", other))),
        }
    }
}

/// Unsubscribe link parameters; the dispatcher adds the recipient per message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeParams {
    pub method: String,
    pub params: BTreeMap<String, String>,
}

/// One outbound message handed to the mail dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMail {
    pub recipients: Vec<String>,
    pub sender: Option<String>,
    pub subject: String,
    pub html_body: String,
    pub unsubscribe: Option<UnsubscribeParams>,
    /// Lower is less urgent; bulk mail goes out at 0
    pub priority: u8,
    pub reference_doctype: Option<String>,
    pub reference_name: Option<String>,
}

impl OutboundMail {
    pub fn new(recipients: Vec<String>, subject: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self {
            recipients,
            sender: None,
            subject: subject.into(),
            html_body: html_body.into(),
            unsubscribe: None,
            priority: 1,
            reference_doctype: None,
            reference_name: None,
        }
    }

    pub fn with_sender(mut self, sender: Option<String>) -> Self {
        self.sender = sender;
        self
    }
}

/// Reference to a background job; carries only identity keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobRef {
    SendNewsletter { subject: String, enqueued_by: String },
}

impl JobRef {
    pub fn event_name(&self) -> &'static str {
        match self {
            JobRef::SendNewsletter { .. } => "send_newsletter",
        }
    }

    /// JSON payload as an external queue would store it
    pub fn to_payload(&self) -> Result<String, InternalError> {
        serde_json::to_string(self).map_err(|e| InternalError::parse("job_payload", e.to_string()))
    }

    pub fn from_payload(payload: &str) -> Result<Self, InternalError> {
        serde_json::from_str(payload).map_err(|e| InternalError::parse("job_payload", e.to_string()))
    }
}

/// A job as it sits in a queue
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job: JobRef,
    pub queue: String,
    pub timeout: Duration,
}

/// A newsletter as loaded for sending
#[derive(Debug, Clone, PartialEq)]
pub struct Newsletter {
    /// Identity key
    pub subject: String,
    pub email_group: String,
    pub message: String,
    pub send_from: Option<String>,
    pub state: DispatchState,
    pub owner: String,
}

impl Newsletter {
    pub fn from_model(model: crate::types::db::newsletter::Model) -> Result<Self, InternalError> {
        Ok(Self {
            state: model.status.parse()?,
            subject: model.subject,
            email_group: model.email_group,
            message: model.message,
            send_from: model.send_from,
            owner: model.owner,
        })
    }
}

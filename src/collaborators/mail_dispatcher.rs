use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::collaborators::MailDispatcher;
use crate::errors::internal::DispatchError;
use crate::errors::InternalError;
use crate::providers::LinkSigner;
use crate::types::internal::OutboundMail;

/// Writes each message to the log instead of a mail server
///
/// Unsubscribe links are signed per recipient so the logged output is
/// what a real transport would put in the footer.
pub struct TracingMailDispatcher {
    site_url: String,
    link_signer: Arc<LinkSigner>,
}

impl TracingMailDispatcher {
    pub fn new(site_url: impl Into<String>, link_signer: Arc<LinkSigner>) -> Self {
        Self {
            site_url: site_url.into(),
            link_signer,
        }
    }
}

#[async_trait]
impl MailDispatcher for TracingMailDispatcher {
    async fn send(&self, mail: OutboundMail) -> Result<(), InternalError> {
        for recipient in &mail.recipients {
            let unsubscribe_url = match &mail.unsubscribe {
                Some(unsubscribe) => {
                    let mut params: Vec<(String, String)> = unsubscribe.params.clone().into_iter().collect();
                    params.push(("email".to_string(), recipient.clone()));
                    let query = self.link_signer.sign(&params)?;
                    Some(format!("{}{}?{}", self.site_url, unsubscribe.method, query))
                }
                None => None,
            };

            tracing::info!(
                recipient = %recipient,
                sender = mail.sender.as_deref().unwrap_or("(default)"),
                subject = %mail.subject,
                priority = mail.priority,
                unsubscribe = unsubscribe_url.as_deref().unwrap_or(""),
                "Outbound mail"
            );
        }
        Ok(())
    }
}

/// Keeps sent mail in memory; can be told to fail or stall
#[derive(Default)]
pub struct MemoryMailDispatcher {
    outbox: Mutex<Vec<OutboundMail>>,
    failure: Mutex<Option<String>>,
    delay: Option<Duration>,
}

impl MemoryMailDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send sleeps for `delay` before recording
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make subsequent sends fail with `message` until cleared with `None`
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().await = message.map(str::to_string);
    }

    pub async fn sent(&self) -> Vec<OutboundMail> {
        self.outbox.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.outbox.lock().await.len()
    }

    /// Messages whose subject matches
    pub async fn sent_with_subject(&self, subject: &str) -> Vec<OutboundMail> {
        self.outbox
            .lock()
            .await
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MailDispatcher for MemoryMailDispatcher {
    async fn send(&self, mail: OutboundMail) -> Result<(), InternalError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.failure.lock().await.clone() {
            return Err(DispatchError::Mail(message).into());
        }
        self.outbox.lock().await.push(mail);
        Ok(())
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection};

use crate::app_data::AppData;
use crate::collaborators::{MailDispatcher, QuotaOracle, TaskQueue};
use crate::config::{begin_transaction, commit_transaction, rollback_transaction, IdentitySettings};
use crate::errors::internal::DispatchError;
use crate::errors::InternalError;
use crate::providers::link_signer::param;
use crate::providers::{identity_rules, LinkSigner};
use crate::stores::{AccountStore, EmailGroupStore, NewsletterStore};
use crate::types::internal::account::ADMINISTRATOR;
use crate::types::internal::{
    DispatchState, JobRef, Newsletter, OutboundMail, RequestContext, UnsubscribeParams,
};

const NEWSLETTER_DOCTYPE: &str = "Newsletter";
const UNSUBSCRIBE_METHOD: &str = "/newsletter/unsubscribe";
const CONFIRM_SUBSCRIPTION_PATH: &str = "/newsletter/confirm-subscription";
const BULK_PRIORITY: u8 = 0;

/// Newsletter dispatch coordinator
///
/// Owns the `Draft -> Queued|Sent` state machine. A send marks the
/// newsletter `Sent` inside a transaction and only commits once the mail
/// dispatcher accepted the batch; any failure leaves it in `Draft`.
pub struct DispatchCoordinator {
    db: DatabaseConnection,
    settings: Arc<IdentitySettings>,
    account_store: Arc<AccountStore>,
    newsletter_store: Arc<NewsletterStore>,
    email_group_store: Arc<EmailGroupStore>,
    link_signer: Arc<LinkSigner>,
    mail: Arc<dyn MailDispatcher>,
    quota: Arc<dyn QuotaOracle>,
    task_queue: Arc<dyn TaskQueue>,
}

impl DispatchCoordinator {
    pub fn new(app_data: Arc<AppData>) -> Self {
        Self {
            db: app_data.db.clone(),
            settings: app_data.settings.clone(),
            account_store: app_data.account_store.clone(),
            newsletter_store: app_data.newsletter_store.clone(),
            email_group_store: app_data.email_group_store.clone(),
            link_signer: app_data.link_signer.clone(),
            mail: app_data.collaborators.mail.clone(),
            quota: app_data.collaborators.quota.clone(),
            task_queue: app_data.collaborators.task_queue.clone(),
        }
    }

    /// Create a draft newsletter addressed to an existing email group
    pub async fn create_newsletter(
        &self,
        ctx: &RequestContext,
        subject: &str,
        email_group: &str,
        message: &str,
        send_from: Option<&str>,
    ) -> Result<Newsletter, InternalError> {
        if !self.email_group_store.group_exists(&self.db, email_group).await? {
            return Err(DispatchError::not_found("Email Group", email_group).into());
        }
        let send_from = send_from.map(str::trim).filter(|s| !s.is_empty());
        if let Some(sender) = send_from {
            identity_rules::validate_email(sender)?;
        }

        let newsletter = self
            .newsletter_store
            .insert(&self.db, subject, email_group, message, send_from, &ctx.actor)
            .await?;

        tracing::info!(subject = %subject, group = %email_group, "Newsletter created");
        Ok(newsletter)
    }

    pub async fn get(&self, subject: &str) -> Result<Newsletter, InternalError> {
        self.newsletter_store.get(&self.db, subject).await
    }

    /// Create an email group; fails if the title is taken
    pub async fn create_group(&self, ctx: &RequestContext, title: &str) -> Result<(), InternalError> {
        if !self.email_group_store.ensure_group(&self.db, title, &ctx.actor).await? {
            return Err(DispatchError::AlreadyExists(title.to_string()).into());
        }
        tracing::info!(group = %title, "Email group created");
        Ok(())
    }

    /// Subscribe addresses to a group
    ///
    /// Previously unsubscribed members are subscribed again; invalid
    /// addresses are skipped. Returns how many addresses were (re)subscribed.
    pub async fn add_subscribers(&self, group: &str, emails: &[&str]) -> Result<u64, InternalError> {
        if !self.email_group_store.group_exists(&self.db, group).await? {
            return Err(DispatchError::not_found("Email Group", group).into());
        }

        let mut added = 0;
        for email in emails.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
            if !identity_rules::is_valid_email(email) {
                tracing::warn!(email = %email, group = %group, "Skipping invalid subscriber address");
                continue;
            }
            match self.email_group_store.find_member(&self.db, group, email).await? {
                Some(member) if member.unsubscribed => {
                    self.email_group_store
                        .set_unsubscribed(&self.db, group, email, false)
                        .await?;
                    added += 1;
                }
                Some(_) => {}
                None => {
                    self.email_group_store.insert_member(&self.db, group, email).await?;
                    added += 1;
                }
            }
        }

        tracing::info!(group = %group, added, "Subscribers added");
        Ok(added)
    }

    /// Members of the newsletter's group that have not unsubscribed
    pub async fn resolve_recipients(&self, subject: &str) -> Result<Vec<String>, InternalError> {
        let newsletter = self.get(subject).await?;
        self.email_group_store
            .subscribed_emails(&self.db, &newsletter.email_group)
            .await
    }

    /// Send a newsletter to its group
    ///
    /// With `synchronous` the batch is handed to the mail dispatcher now and
    /// the newsletter ends `Sent`. Otherwise it moves to `Queued` and a
    /// background job is enqueued; [`Self::handle_job`] finishes the send.
    ///
    /// # Errors
    /// * `AlreadySent` / `AlreadyQueued` - The newsletter left `Draft`
    /// * `NoRecipients` - Everybody in the group unsubscribed
    /// * `QuotaExceeded` - The tenant's recipient cap would be breached
    /// * Any mail dispatcher error; the newsletter is back in `Draft`
    pub async fn send(
        &self,
        ctx: &RequestContext,
        subject: &str,
        synchronous: bool,
    ) -> Result<DispatchState, InternalError> {
        let newsletter = self.get(subject).await?;
        ensure_draft(&newsletter)?;

        let recipients = self.checked_recipients(&newsletter).await?;

        if !synchronous {
            return self.enqueue(ctx, &newsletter).await;
        }

        self.deliver(ctx, &newsletter, recipients, &[DispatchState::Draft]).await?;
        Ok(DispatchState::Sent)
    }

    /// Send to an ad hoc comma separated list without touching the send state
    pub async fn test_send(
        &self,
        ctx: &RequestContext,
        subject: &str,
        test_recipients: &str,
    ) -> Result<Vec<String>, InternalError> {
        let newsletter = self.get(subject).await?;

        let recipients: Vec<String> = test_recipients
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        if recipients.is_empty() {
            return Err(DispatchError::NoRecipients(subject.to_string()).into());
        }
        for recipient in &recipients {
            identity_rules::validate_email(recipient)?;
        }

        let mail = self.compose(&newsletter, recipients.clone()).await?;
        self.mail.send(mail).await?;

        tracing::info!(subject = %subject, actor = %ctx.actor, count = recipients.len(), "Test newsletter sent");
        Ok(recipients)
    }

    /// Run a job taken off the task queue
    ///
    /// Any failure resets the newsletter to `Draft` (committed) before the
    /// error is returned for the worker to log.
    pub async fn handle_job(&self, job: &JobRef) -> Result<(), InternalError> {
        match job {
            JobRef::SendNewsletter { subject, enqueued_by } => {
                let ctx = RequestContext::for_worker(enqueued_by.clone());
                let result = self.send_queued(&ctx, subject).await;
                if let Err(e) = &result {
                    if !matches!(e, InternalError::Dispatch(DispatchError::AlreadySent(_))) {
                        self.reset_to_draft(subject).await?;
                    }
                    tracing::error!(subject = %subject, error = %e, "Newsletter job failed");
                }
                result
            }
        }
    }

    async fn send_queued(&self, ctx: &RequestContext, subject: &str) -> Result<(), InternalError> {
        let newsletter = self.get(subject).await?;
        if newsletter.state == DispatchState::Sent {
            return Err(DispatchError::AlreadySent(subject.to_string()).into());
        }
        let recipients = self.checked_recipients(&newsletter).await?;
        self.deliver(ctx, &newsletter, recipients, &[DispatchState::Queued, DispatchState::Draft])
            .await
    }

    /// Enqueue a job for every newsletter left in `Queued`
    ///
    /// Jobs live in process memory, so newsletters queued by a process
    /// that exited are picked up again here.
    pub async fn requeue_pending(&self, ctx: &RequestContext) -> Result<Vec<String>, InternalError> {
        let subjects = self
            .newsletter_store
            .subjects_in_state(&self.db, DispatchState::Queued)
            .await?;

        for subject in &subjects {
            let job = JobRef::SendNewsletter {
                subject: subject.clone(),
                enqueued_by: ctx.actor.clone(),
            };
            self.task_queue
                .enqueue(job, &self.settings.newsletter_queue, self.settings.newsletter_job_timeout)
                .await?;
        }

        if !subjects.is_empty() {
            tracing::info!(count = subjects.len(), "Requeued pending newsletters");
        }
        Ok(subjects)
    }

    /// Put a queued newsletter back into `Draft`
    pub async fn reset_to_draft(&self, subject: &str) -> Result<(), InternalError> {
        let reset = self
            .newsletter_store
            .transition(&self.db, subject, &[DispatchState::Queued], DispatchState::Draft, ADMINISTRATOR)
            .await?;
        if reset {
            tracing::warn!(subject = %subject, "Newsletter reset to Draft");
        }
        Ok(())
    }

    async fn checked_recipients(&self, newsletter: &Newsletter) -> Result<Vec<String>, InternalError> {
        let recipients = self
            .email_group_store
            .subscribed_emails(&self.db, &newsletter.email_group)
            .await?;
        if recipients.is_empty() {
            return Err(DispatchError::NoRecipients(newsletter.subject.clone()).into());
        }

        if let Some(limit) = self.quota.max_email_recipients(&self.settings.tenant).await? {
            let requested = recipients.len() as u64;
            if requested > limit {
                tracing::warn!(subject = %newsletter.subject, requested, limit, "Recipient quota exceeded");
                return Err(DispatchError::QuotaExceeded { requested, limit }.into());
            }
        }
        Ok(recipients)
    }

    async fn enqueue(&self, ctx: &RequestContext, newsletter: &Newsletter) -> Result<DispatchState, InternalError> {
        let subject = &newsletter.subject;
        let queued = self
            .newsletter_store
            .transition(&self.db, subject, &[DispatchState::Draft], DispatchState::Queued, &ctx.actor)
            .await?;
        if !queued {
            return Err(self.not_draft_error(&self.db, subject).await);
        }

        let job = JobRef::SendNewsletter {
            subject: subject.clone(),
            enqueued_by: ctx.actor.clone(),
        };
        if let Err(e) = self
            .task_queue
            .enqueue(job, &self.settings.newsletter_queue, self.settings.newsletter_job_timeout)
            .await
        {
            self.reset_to_draft(subject).await?;
            return Err(e);
        }

        tracing::info!(subject = %subject, queue = %self.settings.newsletter_queue, "Newsletter queued");
        Ok(DispatchState::Queued)
    }

    /// Mark `Sent` and hand the batch over in one transaction
    async fn deliver(
        &self,
        ctx: &RequestContext,
        newsletter: &Newsletter,
        recipients: Vec<String>,
        from: &[DispatchState],
    ) -> Result<(), InternalError> {
        let subject = &newsletter.subject;
        let count = recipients.len();
        let mail = self.compose(newsletter, recipients).await?;

        let txn = begin_transaction(&self.db).await?;
        let marked = self
            .newsletter_store
            .transition(&txn, subject, from, DispatchState::Sent, &ctx.actor)
            .await?;
        if !marked {
            let error = self.not_draft_error(&txn, subject).await;
            drop(txn);
            return Err(error);
        }

        if let Err(e) = self.mail.send(mail).await {
            rollback_transaction(txn).await?;
            self.reset_to_draft(subject).await?;
            tracing::error!(subject = %subject, error = %e, "Newsletter send failed, left in Draft");
            return Err(e);
        }

        commit_transaction(txn).await?;
        tracing::info!(subject = %subject, recipients = count, "Newsletter sent");
        Ok(())
    }

    async fn compose(&self, newsletter: &Newsletter, recipients: Vec<String>) -> Result<OutboundMail, InternalError> {
        let sender = match &newsletter.send_from {
            Some(sender) => Some(sender.clone()),
            None => self
                .account_store
                .find(&self.db, &newsletter.owner)
                .await?
                .map(|owner| owner.formatted_email()),
        };

        let mut mail = OutboundMail::new(recipients, newsletter.subject.clone(), newsletter.message.clone())
            .with_sender(sender);
        mail.unsubscribe = Some(UnsubscribeParams {
            method: UNSUBSCRIBE_METHOD.to_string(),
            params: BTreeMap::from([("group".to_string(), newsletter.email_group.clone())]),
        });
        mail.priority = BULK_PRIORITY;
        mail.reference_doctype = Some(NEWSLETTER_DOCTYPE.to_string());
        mail.reference_name = Some(newsletter.subject.clone());
        Ok(mail)
    }

    async fn not_draft_error(&self, conn: &impl ConnectionTrait, subject: &str) -> InternalError {
        match self.newsletter_store.get(conn, subject).await {
            Ok(current) => match ensure_draft(&current) {
                Err(e) => e,
                Ok(()) => DispatchError::AlreadyQueued(subject.to_string()).into(),
            },
            Err(e) => e,
        }
    }

    /// Mark the membership unsubscribed; unknown memberships succeed silently
    pub async fn unsubscribe(&self, email: &str, group: &str) -> Result<(), InternalError> {
        let touched = self
            .email_group_store
            .set_unsubscribed(&self.db, group, email.trim(), true)
            .await?;
        tracing::info!(group = %group, touched, "Unsubscribe processed");
        Ok(())
    }

    /// Unsubscribe through a signed link's query string
    pub async fn unsubscribe_signed(&self, query: &str) -> Result<(), InternalError> {
        let params = self.link_signer.verify(query)?;
        let (email, group) = match (param(&params, "email"), param(&params, "group")) {
            (Some(email), Some(group)) => (email, group),
            _ => return Err(DispatchError::InvalidSignature.into()),
        };
        self.unsubscribe(email, group).await
    }

    /// Mail a signed confirmation link; nothing is stored until it is confirmed
    pub async fn subscribe(&self, email: &str) -> Result<(), InternalError> {
        let email = email.trim();
        identity_rules::validate_email(email)?;

        let query = self
            .link_signer
            .sign(&[("email".to_string(), email.to_string())])?;
        let url = format!("{}{}?{}", self.settings.site_url, CONFIRM_SUBSCRIPTION_PATH, query);
        let body = format!(
            "<p>Thank you for your interest in subscribing to our updates</p>\
             <p>Please verify your email address:</p>\
             <p><a href=\"{}\">Confirm</a></p>",
            url
        );

        self.mail
            .send(OutboundMail::new(vec![email.to_string()], "Confirm Your Email", body))
            .await?;
        tracing::info!("Subscription confirmation sent");
        Ok(())
    }

    /// Redeem a confirmation link, adding the address to the subscription group
    pub async fn confirm_subscription(&self, query: &str) -> Result<String, InternalError> {
        let params = self.link_signer.verify(query)?;
        let email = param(&params, "email")
            .ok_or(DispatchError::InvalidSignature)?
            .to_string();

        let group = &self.settings.subscription_group;
        if self.email_group_store.ensure_group(&self.db, group, ADMINISTRATOR).await? {
            tracing::info!(group = %group, "Subscription group created");
        }
        self.add_subscribers(group, &[email.as_str()]).await?;
        Ok(email)
    }
}

fn ensure_draft(newsletter: &Newsletter) -> Result<(), InternalError> {
    match newsletter.state {
        DispatchState::Draft => Ok(()),
        DispatchState::Queued => Err(DispatchError::AlreadyQueued(newsletter.subject.clone()).into()),
        DispatchState::Sent => Err(DispatchError::AlreadySent(newsletter.subject.clone()).into()),
    }
}

#[cfg(test)]
#[path = "dispatch_coordinator_tests.rs"]
mod tests;

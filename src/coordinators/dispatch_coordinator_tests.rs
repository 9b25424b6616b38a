use super::*;
use crate::coordinators::AccountCoordinator;
use crate::errors::internal::AccountError;
use crate::test::utils::{setup_test_app, setup_test_app_with, TestApp};
use crate::types::internal::Account;

const OWNER: &str = "owner@x.com";
const SUBJECT: &str = "Spring update";

async fn seeded(app: TestApp) -> (TestApp, DispatchCoordinator) {
    let accounts = AccountCoordinator::new(app.app_data.clone());
    let system = RequestContext::for_system("test");
    accounts.bootstrap_standard_accounts(&system).await.unwrap();
    accounts
        .insert(&system, Account::new(OWNER).with_first_name("Olive").with_password("owner secret"))
        .await
        .unwrap();

    let dispatch = DispatchCoordinator::new(app.app_data.clone());
    let ctx = RequestContext::for_account(OWNER);
    dispatch.create_group(&ctx, "News").await.unwrap();
    dispatch
        .add_subscribers("News", &["a@x.com", "b@x.com", "c@x.com"])
        .await
        .unwrap();
    dispatch
        .create_newsletter(&ctx, SUBJECT, "News", "<p>Hello</p>", None)
        .await
        .unwrap();
    (app, dispatch)
}

async fn setup() -> (TestApp, DispatchCoordinator) {
    seeded(setup_test_app().await).await
}

fn owner() -> RequestContext {
    RequestContext::for_account(OWNER)
}

fn confirmation_query(body: &str) -> String {
    let marker = "confirm-subscription?";
    let start = body.find(marker).expect("confirmation link") + marker.len();
    let end = start + body[start..].find('"').expect("end of link");
    body[start..end].to_string()
}

#[tokio::test]
async fn test_resolve_recipients_skips_unsubscribed_members() {
    let (_app, dispatch) = setup().await;

    dispatch.unsubscribe("b@x.com", "News").await.unwrap();

    let recipients = dispatch.resolve_recipients(SUBJECT).await.unwrap();
    assert_eq!(recipients, vec!["a@x.com".to_string(), "c@x.com".to_string()]);
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent_and_silent_for_strangers() {
    let (app, dispatch) = setup().await;

    dispatch.unsubscribe("b@x.com", "News").await.unwrap();
    dispatch.unsubscribe("b@x.com", "News").await.unwrap();
    dispatch.unsubscribe("stranger@x.com", "News").await.unwrap();
    dispatch.unsubscribe("b@x.com", "No Such Group").await.unwrap();

    let member = app
        .app_data
        .email_group_store
        .find_member(&app.app_data.db, "News", "b@x.com")
        .await
        .unwrap()
        .unwrap();
    assert!(member.unsubscribed);
    assert_eq!(dispatch.resolve_recipients(SUBJECT).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_synchronous_send_marks_sent_once() {
    let (app, dispatch) = setup().await;

    let state = dispatch.send(&owner(), SUBJECT, true).await.unwrap();
    assert_eq!(state, DispatchState::Sent);

    let again = dispatch.send(&owner(), SUBJECT, true).await;
    assert!(matches!(again, Err(InternalError::Dispatch(DispatchError::AlreadySent(_)))));

    let sent = app.mail.sent_with_subject(SUBJECT).await;
    assert_eq!(sent.len(), 1);
    let mail = &sent[0];
    assert_eq!(mail.recipients.len(), 3);
    assert_eq!(mail.priority, 0);
    assert_eq!(mail.sender.as_deref(), Some("Olive <owner@x.com>"));
    let unsubscribe = mail.unsubscribe.as_ref().unwrap();
    assert_eq!(unsubscribe.method, "/newsletter/unsubscribe");
    assert_eq!(unsubscribe.params.get("group").map(String::as_str), Some("News"));
    assert_eq!(dispatch.get(SUBJECT).await.unwrap().state, DispatchState::Sent);
}

#[tokio::test]
async fn test_concurrent_sends_dispatch_exactly_once() {
    let (app, dispatch) = setup().await;
    let ctx = owner();

    let (first, second) = tokio::join!(
        dispatch.send(&ctx, SUBJECT, true),
        dispatch.send(&ctx, SUBJECT, true)
    );

    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    assert_eq!(app.mail.sent_with_subject(SUBJECT).await.len(), 1);
    assert_eq!(dispatch.get(SUBJECT).await.unwrap().state, DispatchState::Sent);
}

#[tokio::test]
async fn test_failed_send_leaves_newsletter_in_draft() {
    let (app, dispatch) = setup().await;
    app.mail.set_failure(Some("smtp down")).await;

    let result = dispatch.send(&owner(), SUBJECT, true).await;

    assert!(matches!(result, Err(InternalError::Dispatch(DispatchError::Mail(_)))));
    assert_eq!(dispatch.get(SUBJECT).await.unwrap().state, DispatchState::Draft);

    app.mail.set_failure(None).await;
    dispatch.send(&owner(), SUBJECT, true).await.unwrap();
    assert_eq!(app.mail.sent_with_subject(SUBJECT).await.len(), 1);
}

#[tokio::test]
async fn test_asynchronous_send_queues_and_job_completes() {
    let (mut app, dispatch) = setup().await;

    let state = dispatch.send(&owner(), SUBJECT, false).await.unwrap();
    assert_eq!(state, DispatchState::Queued);
    assert_eq!(app.mail.sent_count().await, 0);

    let again = dispatch.send(&owner(), SUBJECT, false).await;
    assert!(matches!(again, Err(InternalError::Dispatch(DispatchError::AlreadyQueued(_)))));

    let queued = app.jobs.recv().await.unwrap();
    assert_eq!(queued.queue, "default");
    assert_eq!(queued.timeout, std::time::Duration::from_secs(3000));
    assert_eq!(
        queued.job,
        JobRef::SendNewsletter {
            subject: SUBJECT.to_string(),
            enqueued_by: OWNER.to_string()
        }
    );

    dispatch.handle_job(&queued.job).await.unwrap();
    assert_eq!(dispatch.get(SUBJECT).await.unwrap().state, DispatchState::Sent);
    assert_eq!(app.mail.sent_with_subject(SUBJECT).await.len(), 1);

    // A duplicate job does not send twice
    let duplicate = dispatch.handle_job(&queued.job).await;
    assert!(matches!(duplicate, Err(InternalError::Dispatch(DispatchError::AlreadySent(_)))));
    assert_eq!(app.mail.sent_with_subject(SUBJECT).await.len(), 1);
}

#[tokio::test]
async fn test_failed_job_resets_queued_newsletter_to_draft() {
    let (mut app, dispatch) = setup().await;
    dispatch.send(&owner(), SUBJECT, false).await.unwrap();
    let queued = app.jobs.recv().await.unwrap();
    app.mail.set_failure(Some("smtp down")).await;

    let result = dispatch.handle_job(&queued.job).await;

    assert!(result.is_err());
    assert_eq!(dispatch.get(SUBJECT).await.unwrap().state, DispatchState::Draft);
}

#[tokio::test]
async fn test_recipient_quota_is_enforced_before_any_state_change() {
    let mut settings = IdentitySettings::for_tests();
    settings.max_email_recipients = Some(2);
    let (app, dispatch) = seeded(setup_test_app_with(settings).await).await;

    let result = dispatch.send(&owner(), SUBJECT, true).await;
    assert!(matches!(
        result,
        Err(InternalError::Dispatch(DispatchError::QuotaExceeded { requested: 3, limit: 2 }))
    ));
    assert_eq!(dispatch.get(SUBJECT).await.unwrap().state, DispatchState::Draft);

    dispatch.unsubscribe("c@x.com", "News").await.unwrap();
    dispatch.send(&owner(), SUBJECT, true).await.unwrap();
    assert_eq!(app.mail.sent_with_subject(SUBJECT).await[0].recipients.len(), 2);
}

#[tokio::test]
async fn test_send_without_subscribers_fails() {
    let (_app, dispatch) = setup().await;
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        dispatch.unsubscribe(email, "News").await.unwrap();
    }

    let result = dispatch.send(&owner(), SUBJECT, true).await;
    assert!(matches!(result, Err(InternalError::Dispatch(DispatchError::NoRecipients(_)))));
}

#[tokio::test]
async fn test_test_send_leaves_state_untouched() {
    let (app, dispatch) = setup().await;

    let recipients = dispatch
        .test_send(&owner(), SUBJECT, "me@x.com, you@x.com")
        .await
        .unwrap();
    assert_eq!(recipients, vec!["me@x.com".to_string(), "you@x.com".to_string()]);
    assert_eq!(dispatch.get(SUBJECT).await.unwrap().state, DispatchState::Draft);
    assert_eq!(app.mail.sent_with_subject(SUBJECT).await[0].recipients, recipients);

    let invalid = dispatch.test_send(&owner(), SUBJECT, "me@x.com, nope").await;
    assert!(matches!(invalid, Err(InternalError::Account(AccountError::InvalidEmail(_)))));
}

#[tokio::test]
async fn test_explicit_sender_wins_over_owner() {
    let (app, dispatch) = setup().await;
    dispatch
        .create_newsletter(&owner(), "From the desk", "News", "<p>Hi</p>", Some("desk@x.com"))
        .await
        .unwrap();

    dispatch.send(&owner(), "From the desk", true).await.unwrap();

    let sent = app.mail.sent_with_subject("From the desk").await;
    assert_eq!(sent[0].sender.as_deref(), Some("desk@x.com"));
}

#[tokio::test]
async fn test_newsletter_requires_existing_group() {
    let (_app, dispatch) = setup().await;

    let result = dispatch
        .create_newsletter(&owner(), "Orphan", "Missing", "<p>Hi</p>", None)
        .await;
    assert!(matches!(result, Err(InternalError::Dispatch(DispatchError::NotFound { .. }))));

    let duplicate = dispatch.create_group(&owner(), "News").await;
    assert!(matches!(duplicate, Err(InternalError::Dispatch(DispatchError::AlreadyExists(_)))));
}

#[tokio::test]
async fn test_add_subscribers_resubscribes_and_skips_invalid() {
    let (_app, dispatch) = setup().await;
    dispatch.unsubscribe("b@x.com", "News").await.unwrap();

    let added = dispatch
        .add_subscribers("News", &["b@x.com", "a@x.com", "not-an-email", " d@x.com "])
        .await
        .unwrap();

    assert_eq!(added, 2);
    assert_eq!(
        dispatch.resolve_recipients(SUBJECT).await.unwrap(),
        vec![
            "a@x.com".to_string(),
            "b@x.com".to_string(),
            "c@x.com".to_string(),
            "d@x.com".to_string()
        ]
    );
}

#[tokio::test]
async fn test_subscribe_requires_confirmation() {
    let (app, dispatch) = setup().await;

    dispatch.subscribe("fan@x.com").await.unwrap();

    let store = &app.app_data.email_group_store;
    assert!(!store.group_exists(&app.app_data.db, "Website").await.unwrap());

    let mails = app.mail.sent_with_subject("Confirm Your Email").await;
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].recipients, vec!["fan@x.com".to_string()]);
    assert!(mails[0]
        .html_body
        .contains("http://localhost:8000/newsletter/confirm-subscription?"));
    let query = confirmation_query(&mails[0].html_body);

    let tampered = query.replace("fan%40x.com", "foe%40x.com");
    let result = dispatch.confirm_subscription(&tampered).await;
    assert!(matches!(result, Err(InternalError::Dispatch(DispatchError::InvalidSignature))));

    let email = dispatch.confirm_subscription(&query).await.unwrap();
    assert_eq!(email, "fan@x.com");
    assert_eq!(
        store.subscribed_emails(&app.app_data.db, "Website").await.unwrap(),
        vec!["fan@x.com".to_string()]
    );
}

#[tokio::test]
async fn test_signed_unsubscribe_link() {
    let (app, dispatch) = setup().await;
    let query = app
        .app_data
        .link_signer
        .sign(&[
            ("group".to_string(), "News".to_string()),
            ("email".to_string(), "a@x.com".to_string()),
        ])
        .unwrap();

    dispatch.unsubscribe_signed(&query).await.unwrap();
    assert_eq!(dispatch.resolve_recipients(SUBJECT).await.unwrap().len(), 2);

    let forged = query.replace("a%40x.com", "c%40x.com");
    assert!(dispatch.unsubscribe_signed(&forged).await.is_err());
}

#[tokio::test]
async fn test_requeue_pending_enqueues_queued_newsletters() {
    let (mut app, dispatch) = setup().await;
    dispatch.send(&owner(), SUBJECT, false).await.unwrap();
    let _original = app.jobs.recv().await.unwrap();

    let requeued = dispatch
        .requeue_pending(&RequestContext::for_system("worker"))
        .await
        .unwrap();

    assert_eq!(requeued, vec![SUBJECT.to_string()]);
    let queued = app.jobs.recv().await.unwrap();
    dispatch.handle_job(&queued.job).await.unwrap();
    assert_eq!(dispatch.get(SUBJECT).await.unwrap().state, DispatchState::Sent);
}

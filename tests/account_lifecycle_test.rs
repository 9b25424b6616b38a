mod common;

use tenant_identity::config::IdentitySettings;
use tenant_identity::coordinators::{AccountCoordinator, PasswordResetCoordinator, SignUpOutcome};
use tenant_identity::errors::{AccountError, InternalError, ResetError};
use tenant_identity::types::internal::{Account, Advisory, RequestContext, UserType};

async fn setup(settings: IdentitySettings) -> (common::TestApp, AccountCoordinator, PasswordResetCoordinator) {
    let app = common::setup_app(settings).await;
    let accounts = AccountCoordinator::new(app.app_data.clone());
    accounts
        .bootstrap_standard_accounts(&RequestContext::for_cli("bootstrap"))
        .await
        .unwrap();
    let resets = PasswordResetCoordinator::new(app.app_data.clone());
    (app, accounts, resets)
}

fn reset_key_from(body: &str) -> String {
    let marker = "key=";
    let start = body.find(marker).expect("reset link") + marker.len();
    let end = start
        + body[start..]
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(body.len() - start);
    body[start..end].to_string()
}

#[tokio::test]
async fn test_sign_up_then_verify_then_sign_in() {
    let (app, accounts, resets) = setup(IdentitySettings::for_tests()).await;

    let outcome = accounts
        .sign_up("reader@x.com", "Rita Reader", Some("/articles"))
        .await
        .unwrap();
    assert_eq!(outcome, SignUpOutcome::VerificationSent);

    let account = accounts.get("reader@x.com").await.unwrap();
    assert_eq!(account.user_type, UserType::WebsiteUser);
    assert_eq!(account.full_name, "Rita Reader");

    let welcome = app.mail.sent_with_subject("Verify Your Account").await;
    assert_eq!(welcome.len(), 1);
    let key = reset_key_from(&welcome[0].html_body);

    let redemption = resets
        .redeem(&RequestContext::guest(), Some(&key), None, "a fresh password")
        .await
        .unwrap();
    assert_eq!(redemption.account, "reader@x.com");
    assert_eq!(redemption.redirect_to, "/articles");
    assert!(app.sessions.is_active("reader@x.com").await);

    let reused = resets
        .redeem(&RequestContext::guest(), Some(&key), None, "someone else's password")
        .await;
    assert!(matches!(reused, Err(InternalError::Reset(ResetError::ExpiredOrInvalidLink))));
    assert_eq!(app.sessions.active_sessions("reader@x.com").await, 1);

    let again = accounts.sign_up("reader@x.com", "Rita Reader", None).await.unwrap();
    assert_eq!(again, SignUpOutcome::AlreadyRegistered);
}

#[tokio::test]
async fn test_reset_with_unknown_token_establishes_no_session() {
    let (app, _accounts, resets) = setup(IdentitySettings::for_tests()).await;

    let result = resets
        .redeem(&RequestContext::guest(), Some("not-a-real-key"), None, "whatever")
        .await;

    assert!(matches!(result, Err(InternalError::Reset(ResetError::ExpiredOrInvalidLink))));
    assert!(!app.sessions.is_active("Guest").await);
}

#[tokio::test]
async fn test_last_human_manager_cannot_be_disabled_or_deleted() {
    let (app, accounts, _resets) = setup(IdentitySettings::for_tests()).await;
    let ctx = RequestContext::for_cli("test");

    let created = accounts
        .insert(
            &ctx,
            Account::new("boss@x.com")
                .with_first_name("Bea")
                .with_roles(["System Manager"])
                .with_password("boss password"),
        )
        .await
        .unwrap();
    assert_eq!(created.value.user_type, UserType::SystemUser);

    let disable = accounts.set_enabled(&ctx, "boss@x.com", false).await;
    assert!(matches!(disable, Err(InternalError::Account(AccountError::LastManager))));
    let delete = accounts.delete(&ctx, "boss@x.com").await;
    assert!(matches!(delete, Err(InternalError::Account(AccountError::LastManager))));
    assert!(accounts.get("boss@x.com").await.unwrap().enabled);

    accounts
        .insert(
            &ctx,
            Account::new("deputy@x.com")
                .with_roles(["System Manager"])
                .with_password("deputy password"),
        )
        .await
        .unwrap();

    accounts.set_enabled(&ctx, "boss@x.com", false).await.unwrap();
    assert!(!app.sessions.is_active("boss@x.com").await);

    let remove = accounts.remove_roles(&ctx, "deputy@x.com", &["System Manager"]).await;
    assert!(matches!(remove, Err(InternalError::Account(AccountError::LastManager))));
}

#[tokio::test]
async fn test_system_user_quota() {
    let mut settings = IdentitySettings::for_tests();
    settings.max_system_users = Some(2);
    let (_app, accounts, _resets) = setup(settings).await;
    let ctx = RequestContext::for_cli("test");
    accounts.define_role("Sales User", true).await.unwrap();

    for email in ["one@x.com", "two@x.com"] {
        accounts
            .insert(&ctx, Account::new(email).with_roles(["Sales User"]).with_password("pw"))
            .await
            .unwrap();
    }

    let third = accounts
        .insert(&ctx, Account::new("three@x.com").with_roles(["Sales User"]).with_password("pw"))
        .await;
    assert!(matches!(
        third,
        Err(InternalError::Account(AccountError::MaxUsersReached { limit: 2 }))
    ));
    assert!(accounts.find("three@x.com").await.unwrap().is_none());

    // Website users are not counted
    accounts
        .insert(&ctx, Account::new("web@x.com").with_password("pw"))
        .await
        .unwrap();
    assert_eq!(accounts.total_system_users().await.unwrap(), 2);
}

#[tokio::test]
async fn test_username_collision_reports_suggestion() {
    let (_app, accounts, _resets) = setup(IdentitySettings::for_tests()).await;
    let ctx = RequestContext::for_cli("test");
    accounts.define_role("Sales User", true).await.unwrap();

    accounts
        .insert(
            &ctx,
            Account::new("jane@x.com")
                .with_first_name("Jane")
                .with_username("jane")
                .with_roles(["Sales User"]),
        )
        .await
        .unwrap();
    let second = accounts
        .insert(
            &ctx,
            Account::new("jane@y.com")
                .with_first_name("Jane")
                .with_username("jane")
                .with_roles(["Sales User"]),
        )
        .await
        .unwrap();

    assert!(second.value.username.is_none());
    assert!(second
        .advisories
        .iter()
        .any(|a| matches!(a, Advisory::SuggestedUsername { .. })));
    assert_eq!(
        accounts.get("jane@x.com").await.unwrap().username.as_deref(),
        Some("jane")
    );
}

#[tokio::test]
async fn test_standard_accounts_are_protected() {
    let (_app, accounts, resets) = setup(IdentitySettings::for_tests()).await;
    let ctx = RequestContext::for_cli("test");

    for name in ["Administrator", "Guest"] {
        let delete = accounts.delete(&ctx, name).await;
        assert!(matches!(
            delete,
            Err(InternalError::Account(AccountError::ProtectedAccount { .. }))
        ));
        let rename = accounts.rename(&ctx, name, "someone@x.com").await;
        assert!(matches!(
            rename,
            Err(InternalError::Account(AccountError::ProtectedAccount { .. }))
        ));
    }

    let reset = resets.request_password_reset("Administrator").await;
    assert!(matches!(reset, Err(InternalError::Reset(ResetError::ResetNotAllowed(_)))));
}

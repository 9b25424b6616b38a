use super::*;
use crate::collaborators::{NoAvatarLookup, StaticQuotaOracle};
use crate::errors::internal::AccountError;
use crate::providers::{CacheProvider, EmailDomainRule};
use crate::stores::RoleStore;
use crate::test::utils::setup_test_db;
use crate::types::internal::account::ADMINISTRATOR;
use sea_orm::DatabaseConnection;

struct Fixture {
    db: DatabaseConnection,
    store: Arc<AccountStore>,
    validator: AccountValidator,
}

async fn fixture_with(settings: IdentitySettings, quota: StaticQuotaOracle, default_roles: DefaultRoles) -> Fixture {
    let db = setup_test_db().await;
    let store = Arc::new(AccountStore::new());
    let registry = Arc::new(RoleRegistry::new(Arc::new(RoleStore::new()), Arc::new(CacheProvider::new())));
    for (role, desk) in [
        (SYSTEM_MANAGER, true),
        (ADMINISTRATOR_ROLE, true),
        (GUEST_ROLE, false),
        ("Sales User", true),
        ("Blogger", false),
        ("Retired Role", true),
    ] {
        registry.ensure_role(&db, role, desk).await.unwrap();
    }
    registry.set_disabled(&db, "Retired Role", true).await.unwrap();

    let validator = AccountValidator::new(
        Arc::new(settings),
        store.clone(),
        registry,
        Arc::new(ManagerInvariant::new(store.clone())),
        default_roles,
        Arc::new(quota),
        Arc::new(NoAvatarLookup),
    );
    Fixture { db, store, validator }
}

async fn fixture() -> Fixture {
    fixture_with(IdentitySettings::for_tests(), StaticQuotaOracle::unlimited(), DefaultRoles::default()).await
}

impl Fixture {
    async fn validate_new(&self, account: &mut Account) -> Result<ValidationReport, InternalError> {
        self.validator
            .validate(&self.db, account, None, &RequestContext::for_system("test"), ValidateOptions::default())
            .await
    }

    /// Validate and persist, the way the insert path does
    async fn create(&self, mut account: Account) -> Account {
        self.validate_new(&mut account).await.unwrap();
        self.store.insert(&self.db, &account).await.unwrap();
        account
    }
}

#[tokio::test]
async fn test_rejects_malformed_email() {
    let f = fixture().await;
    let mut account = Account::new("not-an-email");

    let result = f.validate_new(&mut account).await;

    assert!(matches!(result, Err(InternalError::Account(AccountError::InvalidEmail(_)))));
}

#[tokio::test]
async fn test_first_system_user_receives_system_manager() {
    let f = fixture().await;
    let mut account = Account::new("ops@x.com").with_roles(["Sales User"]);

    let report = f.validate_new(&mut account).await.unwrap();

    assert!(account.holds(SYSTEM_MANAGER));
    assert_eq!(account.user_type, UserType::SystemUser);
    assert!(report.advisories.contains(&Advisory::SystemManagerAdded));
}

#[tokio::test]
async fn test_system_manager_not_added_when_another_exists() {
    let f = fixture().await;
    f.create(Account::new("boss@x.com").with_roles([SYSTEM_MANAGER])).await;

    let mut account = Account::new("ops@x.com").with_roles(["Sales User"]);
    let report = f.validate_new(&mut account).await.unwrap();

    assert!(!account.holds(SYSTEM_MANAGER));
    assert!(report.advisories.is_empty());
}

#[tokio::test]
async fn test_portal_roles_make_website_user() {
    let f = fixture().await;
    let mut account = Account::new("reader@x.com").with_roles(["Blogger"]);

    f.validate_new(&mut account).await.unwrap();

    assert_eq!(account.user_type, UserType::WebsiteUser);
    assert!(!account.holds(SYSTEM_MANAGER));
}

#[tokio::test]
async fn test_disabled_roles_are_dropped_and_do_not_grant_desk() {
    let f = fixture().await;
    f.create(Account::new("boss@x.com").with_roles([SYSTEM_MANAGER])).await;
    let mut account = Account::new("old@x.com").with_roles(["Retired Role", "Blogger", "Blogger", " "]);

    f.validate_new(&mut account).await.unwrap();

    assert_eq!(account.user_type, UserType::WebsiteUser);
    assert_eq!(account.roles, vec!["Blogger".to_string()]);
}

#[tokio::test]
async fn test_administrator_always_holds_manager_roles() {
    let f = fixture().await;
    let mut account = Account::standard(ADMINISTRATOR);

    f.validate_new(&mut account).await.unwrap();

    assert!(account.holds(SYSTEM_MANAGER));
    assert!(account.holds(ADMINISTRATOR_ROLE));
    assert_eq!(account.user_type, UserType::SystemUser);
    assert!(account.external_id.is_none());
}

#[tokio::test]
async fn test_guest_keeps_only_guest_role() {
    let f = fixture().await;
    let mut account = Account::standard(GUEST).with_roles([GUEST_ROLE, "Blogger"]);

    f.validate_new(&mut account).await.unwrap();

    assert_eq!(account.roles, vec![GUEST_ROLE.to_string()]);
}

#[tokio::test]
async fn test_standard_account_cannot_be_disabled() {
    let f = fixture().await;
    let mut account = Account::standard(ADMINISTRATOR).disabled();

    let result = f.validate_new(&mut account).await;

    assert!(matches!(
        result,
        Err(InternalError::Account(AccountError::ProtectedAccount { .. }))
    ));
}

#[tokio::test]
async fn test_disabling_last_manager_is_refused() {
    let f = fixture().await;
    let previous = f.create(Account::new("boss@x.com").with_roles([SYSTEM_MANAGER])).await;

    let mut account = previous.clone();
    account.enabled = false;
    let result = f
        .validator
        .validate(&f.db, &mut account, Some(&previous), &RequestContext::for_system("test"), ValidateOptions::default())
        .await;

    assert!(matches!(result, Err(InternalError::Account(AccountError::LastManager))));
}

#[tokio::test]
async fn test_removing_last_manager_role_is_refused() {
    let f = fixture().await;
    let previous = f.create(Account::new("boss@x.com").with_roles([SYSTEM_MANAGER, "Sales User"])).await;

    let mut account = previous.clone();
    account.roles = vec!["Blogger".to_string()];
    let result = f
        .validator
        .validate(&f.db, &mut account, Some(&previous), &RequestContext::for_system("test"), ValidateOptions::default())
        .await;

    assert!(matches!(result, Err(InternalError::Account(AccountError::LastManager))));
}

#[tokio::test]
async fn test_disabling_with_another_manager_reports_transition() {
    let f = fixture().await;
    f.create(Account::new("boss@x.com").with_roles([SYSTEM_MANAGER])).await;
    let previous = f.create(Account::new("deputy@x.com").with_roles([SYSTEM_MANAGER])).await;

    let mut account = previous.clone();
    account.enabled = false;
    let report = f
        .validator
        .validate(&f.db, &mut account, Some(&previous), &RequestContext::for_system("test"), ValidateOptions::default())
        .await
        .unwrap();

    assert!(report.disabling);
}

#[tokio::test]
async fn test_username_defaults_from_first_name() {
    let f = fixture().await;
    let mut account = Account::new("ann@x.com").with_first_name("Ann Marie");

    f.validate_new(&mut account).await.unwrap();

    assert_eq!(account.username.as_deref(), Some("ann_marie"));
    assert_eq!(account.full_name, "Ann Marie");
}

#[tokio::test]
async fn test_taken_username_is_cleared_with_suggestion() {
    let f = fixture().await;
    f.create(Account::new("boss@x.com").with_roles([SYSTEM_MANAGER]).with_username("jdoe")).await;

    let mut account = Account::new("john@x.com")
        .with_first_name("John")
        .with_last_name("Doe")
        .with_roles(["Sales User"])
        .with_username("@jdoe ");
    let report = f.validate_new(&mut account).await.unwrap();

    assert!(account.username.is_none());
    assert!(report.advisories.contains(&Advisory::UsernameTaken {
        username: "jdoe".to_string()
    }));
    assert!(report
        .advisories
        .iter()
        .any(|a| matches!(a, Advisory::SuggestedUsername { username } if username != "jdoe")));
}

#[tokio::test]
async fn test_invalid_username_is_cleared() {
    let f = fixture().await;
    let mut account = Account::new("amy@x.com").with_username("amy-smith!");

    let report = f.validate_new(&mut account).await.unwrap();

    assert!(account.username.is_none());
    assert!(report.advisories.contains(&Advisory::UsernameInvalid {
        username: "amy-smith!".to_string()
    }));
}

#[tokio::test]
async fn test_password_is_taken_off_the_record() {
    let f = fixture().await;
    let mut account = Account::new("amy@x.com").with_password("hunter2hunter2");

    let report = f.validate_new(&mut account).await.unwrap();

    assert!(account.new_password.is_none());
    assert_eq!(report.new_password.map(|p| p.expose().to_string()), Some("hunter2hunter2".to_string()));
}

#[tokio::test]
async fn test_language_placeholder_and_external_id() {
    let f = fixture().await;
    let mut account = Account::new("amy@x.com");
    account.language = Some(LANGUAGE_PLACEHOLDER.to_string());

    f.validate_new(&mut account).await.unwrap();

    assert!(account.language.is_none());
    let external_id = account.external_id.expect("external id assigned");
    assert_eq!(external_id.len(), EXTERNAL_ID_LENGTH);
}

#[tokio::test]
async fn test_quota_blocks_extra_system_user() {
    let f = fixture_with(
        IdentitySettings::for_tests(),
        StaticQuotaOracle::new(Some(1), None),
        DefaultRoles::default(),
    )
    .await;
    f.create(Account::new("boss@x.com").with_roles([SYSTEM_MANAGER])).await;

    let mut account = Account::new("ops@x.com").with_roles(["Sales User"]);
    let result = f.validate_new(&mut account).await;
    assert!(matches!(
        result,
        Err(InternalError::Account(AccountError::MaxUsersReached { limit: 1 }))
    ));

    // Website users and disabled accounts are not counted
    let mut reader = Account::new("reader@x.com").with_roles(["Blogger"]);
    f.validate_new(&mut reader).await.unwrap();
    let mut dormant = Account::new("dormant@x.com").with_roles(["Sales User"]).disabled();
    f.validate_new(&mut dormant).await.unwrap();
}

#[tokio::test]
async fn test_demo_account_cannot_change_anything() {
    let mut settings = IdentitySettings::for_tests();
    settings.demo_account = Some("demo@x.com".to_string());
    let f = fixture_with(settings, StaticQuotaOracle::unlimited(), DefaultRoles::default()).await;

    let mut account = Account::new("amy@x.com");
    let result = f
        .validator
        .validate(&f.db, &mut account, None, &RequestContext::for_account("demo@x.com"), ValidateOptions::default())
        .await;

    assert!(matches!(result, Err(InternalError::Account(AccountError::DemoRestricted))));
}

#[tokio::test]
async fn test_default_roles_applied_only_when_requested() {
    let rules = DefaultRoles::new(
        vec![Arc::new(EmailDomainRule::new("corp.com", "Sales User"))],
        Some("Blogger".to_string()),
    );
    let f = fixture_with(IdentitySettings::for_tests(), StaticQuotaOracle::unlimited(), rules).await;
    f.create(Account::new("boss@x.com").with_roles([SYSTEM_MANAGER])).await;

    let options = ValidateOptions { apply_default_roles: true };
    let ctx = RequestContext::for_system("test");

    let mut staff = Account::new("kim@corp.com");
    f.validator.validate(&f.db, &mut staff, None, &ctx, options).await.unwrap();
    assert_eq!(staff.roles, vec!["Sales User".to_string()]);
    assert_eq!(staff.user_type, UserType::SystemUser);

    let mut visitor = Account::new("lee@gmail.com");
    f.validator.validate(&f.db, &mut visitor, None, &ctx, options).await.unwrap();
    assert_eq!(visitor.roles, vec!["Blogger".to_string()]);

    let mut plain = Account::new("max@corp.com");
    f.validate_new(&mut plain).await.unwrap();
    assert!(plain.roles.is_empty());
}

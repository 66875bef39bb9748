use dealshub_core::auth::{hash_token, SessionSigner};
use dealshub_core::db::open_db_in_memory;
use dealshub_core::model::user::{GoogleProfile, Plan, ProfileUpdate, UserStatus, UserType};
use dealshub_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use dealshub_core::service::auth_service::{AuthService, AuthServiceError};
use dealshub_core::service::user_service::UserService;
use dealshub_core::ServiceError;
use rusqlite::Connection;

fn auth(conn: &Connection) -> AuthService<SqliteUserRepository<'_>> {
    AuthService::new(
        SqliteUserRepository::new(conn),
        SessionSigner::new("test-secret").unwrap(),
    )
}

#[test]
fn magic_link_creates_account_and_is_single_use() {
    let conn = open_db_in_memory().unwrap();
    let auth = auth(&conn);

    let issued = auth.request_magic_link(" Ada@Example.com ").unwrap();
    assert_eq!(issued.user.email, "ada@example.com");
    assert_eq!(issued.token.len(), 64);

    let stored: String = conn
        .query_row(
            "SELECT magic_token_hash FROM users WHERE id = ?1;",
            [issued.user.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, hash_token(&issued.token));
    assert_ne!(stored, issued.token);

    let session = auth.verify_magic_link(&issued.token).unwrap();
    assert_eq!(session.user.id, issued.user.id);
    assert_eq!(auth.authenticate(&session.token).unwrap().sub, issued.user.id);

    assert!(matches!(
        auth.verify_magic_link(&issued.token),
        Err(AuthServiceError::InvalidMagicToken)
    ));
}

#[test]
fn magic_link_reuses_existing_account_and_rejects_expired_tokens() {
    let conn = open_db_in_memory().unwrap();
    let auth = auth(&conn);
    let first = auth.request_magic_link("bob@example.com").unwrap();
    let second = auth.request_magic_link("BOB@example.com").unwrap();
    assert_eq!(first.user.id, second.user.id);

    assert!(matches!(
        auth.verify_magic_link(&first.token),
        Err(AuthServiceError::InvalidMagicToken)
    ));

    conn.execute(
        "UPDATE users SET magic_token_expires_at = 0 WHERE id = ?1;",
        [second.user.id.to_string()],
    )
    .unwrap();
    assert!(matches!(
        auth.verify_magic_link(&second.token),
        Err(AuthServiceError::InvalidMagicToken)
    ));
    assert!(matches!(
        auth.request_magic_link("not-an-email"),
        Err(AuthServiceError::Validation(_))
    ));
}

#[test]
fn google_login_links_existing_email_and_refreshes_profile() {
    let conn = open_db_in_memory().unwrap();
    let auth = auth(&conn);
    let issued = auth.request_magic_link("cy@example.com").unwrap();

    let profile = GoogleProfile {
        google_id: "google-123".into(),
        email: "cy@example.com".into(),
        display_name: Some("Cy Twombly".into()),
        first_name: Some("Cy".into()),
        last_name: Some("Twombly".into()),
        photo: Some("https://img.example.com/cy.png".into()),
    };
    let session = auth.login_with_google(profile.clone()).unwrap();
    assert_eq!(session.user.id, issued.user.id);
    assert_eq!(session.user.google_id.as_deref(), Some("google-123"));

    let again = auth
        .login_with_google(GoogleProfile {
            photo: None,
            ..profile
        })
        .unwrap();
    assert_eq!(again.user.id, issued.user.id);
    assert_eq!(
        again.user.photo.as_deref(),
        Some("https://img.example.com/cy.png")
    );

    let fresh = auth
        .login_with_google(GoogleProfile {
            google_id: "google-999".into(),
            email: "dee@example.com".into(),
            ..GoogleProfile::default()
        })
        .unwrap();
    assert_eq!(fresh.user.display_name.as_deref(), Some("dee"));
    assert_eq!(SqliteUserRepository::new(&conn).list_users().unwrap().len(), 2);
}

#[test]
fn tampered_session_tokens_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let auth = auth(&conn);
    let issued = auth.request_magic_link("eve@example.com").unwrap();
    let session = auth.verify_magic_link(&issued.token).unwrap();

    let mut tampered = session.token.clone();
    tampered.push('0');
    assert!(matches!(
        auth.authenticate(&tampered),
        Err(AuthServiceError::Session(_))
    ));
}

#[test]
fn user_profile_lifecycle() {
    let conn = open_db_in_memory().unwrap();
    let user = auth(&conn).request_magic_link("fay@example.com").unwrap().user;
    let other = auth(&conn).request_magic_link("gus@example.com").unwrap().user;
    let users = UserService::new(SqliteUserRepository::new(&conn));

    assert!(matches!(
        users.update_profile(user.id, ProfileUpdate::default()),
        Err(ServiceError::Validation(_))
    ));
    let updated = users
        .update_profile(
            user.id,
            ProfileUpdate {
                first_name: Some("Fay".into()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.first_name.as_deref(), Some("Fay"));
    assert!(matches!(
        users.update_profile(
            user.id,
            ProfileUpdate {
                email: Some("GUS@example.com".into()),
                ..ProfileUpdate::default()
            }
        ),
        Err(ServiceError::Conflict(_))
    ));
    assert_eq!(users.get_user(other.id).unwrap().email, "gus@example.com");

    users
        .set_preferences(user.id, vec!["tech".into(), " ".into(), "tech".into(), "food".into()])
        .unwrap();
    assert_eq!(users.preferences(user.id).unwrap(), vec!["tech", "food"]);

    assert_eq!(
        users.set_status(user.id, "suspended").unwrap().status,
        UserStatus::Suspended
    );
    assert!(users.set_status(user.id, "banned").is_err());

    for expected in [2, 1, 0] {
        assert_eq!(users.decrement_deals_count(user.id).unwrap().deals_count, expected);
    }
    assert!(matches!(
        users.decrement_deals_count(user.id),
        Err(ServiceError::Conflict(_))
    ));
    assert_eq!(users.increment_deals_posted(user.id).unwrap().deals_posted, 1);

    assert!(users.upgrade_to_vendor(user.id, " ", None).is_err());
    assert!(users.upgrade_to_vendor(user.id, "Acme", Some("gold")).is_err());
    let vendor = users.upgrade_to_vendor(user.id, "Acme", Some("pro")).unwrap();
    assert_eq!(vendor.user_type, UserType::Vendor);
    assert_eq!(vendor.plan, Plan::Pro);
    assert_eq!(vendor.brand.as_deref(), Some("Acme"));
}

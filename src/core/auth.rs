//! Users and sessions.
//!
//! Passwords are stored as Argon2 PHC strings. A login opens a server-side
//! session row whose id is the opaque token kept in the session cookie. Every
//! request re-reads the user behind the token, so role changes and deletions
//! take effect immediately.

use crate::{
    config::settings::BootstrapAdmin,
    entities::{Role, Session, User, session, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "zakat_session";

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid phone number or password";

/// The logged-in user, as seen by request handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    /// User id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login phone number
    pub phone: String,
    /// Access level
    pub role: Role,
}

impl AuthUser {
    /// Whether the user may perform admin-only actions
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<user::Model> for AuthUser {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            phone: user.phone,
            role: user.role,
        }
    }
}

/// Fields needed to create a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login phone number
    pub phone: String,
    /// Plain-text password
    pub password: String,
    /// Access level, `panitia` when omitted
    #[serde(default = "default_role")]
    pub role: Role,
}

const fn default_role() -> Role {
    Role::Panitia
}

/// A freshly opened session
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Token to store in the session cookie
    pub token: String,
    /// The user that logged in
    pub user: AuthUser,
    /// When the session stops being valid
    pub expires_at: DateTimeUtc,
}

/// Hashes a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Checks a password against a stored PHC string.
///
/// Returns `Ok(false)` on a mismatch; a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| Error::PasswordHash {
        message: format!("Stored hash is invalid: {e}"),
    })?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(other) => Err(Error::PasswordHash {
            message: other.to_string(),
        }),
    }
}

/// Verifies credentials and opens a session valid for `ttl`.
///
/// # Errors
/// [`Error::Validation`] when a field is empty, [`Error::Unauthorized`] for
/// an unknown phone number or a wrong password.
pub async fn login(
    db: &DatabaseConnection,
    phone: &str,
    password: &str,
    ttl: chrono::Duration,
) -> Result<LoginOutcome> {
    let phone = phone.trim();
    if phone.is_empty() || password.is_empty() {
        return Err(Error::validation("Phone number and password are required"));
    }

    let Some(user) = User::find()
        .filter(user::Column::Phone.eq(phone))
        .one(db)
        .await?
    else {
        warn!("Login attempt for unknown phone number");
        return Err(Error::Unauthorized);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "Login attempt with wrong password");
        return Err(Error::Unauthorized);
    }

    let now = chrono::Utc::now();
    let session = session::ActiveModel {
        id: Set(uuid::Uuid::new_v4().simple().to_string()),
        user_id: Set(user.id),
        created_at: Set(now),
        expires_at: Set(now + ttl),
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, "User logged in");
    Ok(LoginOutcome {
        token: session.id,
        user: user.into(),
        expires_at: session.expires_at,
    })
}

/// Ends the session behind `token`. Unknown tokens are ignored.
pub async fn logout(db: &DatabaseConnection, token: &str) -> Result<()> {
    let result = Session::delete_by_id(token.to_string()).exec(db).await?;
    debug!(removed = result.rows_affected, "Logged out");
    Ok(())
}

/// Resolves a session token to the current user.
///
/// Expired sessions are deleted when found.
///
/// # Errors
/// [`Error::Unauthorized`] for an unknown or expired token, or when the user
/// was deleted.
pub async fn validate_session(db: &DatabaseConnection, token: &str) -> Result<AuthUser> {
    let Some(session) = Session::find_by_id(token.to_string()).one(db).await? else {
        return Err(Error::Unauthorized);
    };

    if session.expires_at <= chrono::Utc::now() {
        debug!(user_id = session.user_id, "Removing expired session");
        session.delete(db).await?;
        return Err(Error::Unauthorized);
    }

    User::find_by_id(session.user_id)
        .one(db)
        .await?
        .map(AuthUser::from)
        .ok_or(Error::Unauthorized)
}

/// Deletes every expired session and returns how many were removed.
pub async fn purge_expired_sessions(db: &DatabaseConnection) -> Result<u64> {
    let result = Session::delete_many()
        .filter(session::Column::ExpiresAt.lte(chrono::Utc::now()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Creates a committee member account.
///
/// # Errors
/// [`Error::Validation`] for missing fields or a short password,
/// [`Error::Conflict`] when the phone number is already registered.
pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    let name = new_user.name.trim();
    let phone = new_user.phone.trim();
    if name.is_empty() || phone.is_empty() {
        return Err(Error::validation("Name and phone number are required"));
    }
    if new_user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let taken = User::find()
        .filter(user::Column::Phone.eq(phone))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(Error::conflict("Phone number is already registered"));
    }

    let user = user::ActiveModel {
        name: Set(name.to_string()),
        phone: Set(phone.to_string()),
        password_hash: Set(hash_password(&new_user.password)?),
        role: Set(new_user.role),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, role = ?user.role, "Created user");
    Ok(user)
}

/// Lists users newest first.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a user and their sessions.
///
/// # Errors
/// [`Error::Conflict`] when `acting` tries to delete their own account.
pub async fn delete_user(db: &DatabaseConnection, acting: &AuthUser, user_id: i64) -> Result<()> {
    if acting.id == user_id {
        return Err(Error::conflict("You cannot delete your own account"));
    }

    let txn = db.begin().await?;
    let user = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;

    Session::delete_many()
        .filter(session::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    user.delete(&txn).await?;
    txn.commit().await?;

    info!(user_id, deleted_by = acting.id, "Deleted user");
    Ok(())
}

/// Creates the configured administrator when no user exists yet.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    admin: &BootstrapAdmin,
) -> Result<Option<user::Model>> {
    if User::find().count(db).await? > 0 {
        return Ok(None);
    }

    let user = create_user(
        db,
        NewUser {
            name: admin.name.clone(),
            phone: admin.phone.clone(),
            password: admin.password.clone(),
            role: Role::Admin,
        },
    )
    .await?;
    info!(user_id = user.id, "Bootstrapped administrator account");
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia123", &hash).unwrap());
        assert!(!verify_password("salah", &hash).unwrap());
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(Error::PasswordHash { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let short = NewUser {
            name: "Budi".to_string(),
            phone: "0812".to_string(),
            password: "12345".to_string(),
            role: Role::Panitia,
        };
        assert!(matches!(
            create_user(&db, short).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_phone_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "0812", Role::Panitia).await?;
        assert!(matches!(
            create_test_user(&db, " 0812 ", Role::Admin).await,
            Err(Error::Conflict { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_login_session_roundtrip() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "0812", Role::Admin).await?;

        assert!(matches!(
            login(&db, "0812", "wrong-password", chrono::Duration::hours(1)).await,
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            login(&db, "0899", TEST_PASSWORD, chrono::Duration::hours(1)).await,
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            login(&db, "", TEST_PASSWORD, chrono::Duration::hours(1)).await,
            Err(Error::Validation { .. })
        ));

        let outcome = login(&db, "0812", TEST_PASSWORD, chrono::Duration::hours(1)).await?;
        assert_eq!(outcome.user.id, user.id);
        assert!(outcome.user.is_admin());

        let current = validate_session(&db, &outcome.token).await?;
        assert_eq!(current.phone, "0812");

        logout(&db, &outcome.token).await?;
        assert!(matches!(
            validate_session(&db, &outcome.token).await,
            Err(Error::Unauthorized)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "0812", Role::Panitia).await?;

        let outcome = login(&db, "0812", TEST_PASSWORD, chrono::Duration::seconds(-1)).await?;
        assert!(matches!(
            validate_session(&db, &outcome.token).await,
            Err(Error::Unauthorized)
        ));
        assert!(Session::find_by_id(outcome.token).one(&db).await?.is_none());

        login(&db, "0812", TEST_PASSWORD, chrono::Duration::seconds(-1)).await?;
        login(&db, "0812", TEST_PASSWORD, chrono::Duration::hours(1)).await?;
        assert_eq!(purge_expired_sessions(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_user_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let admin: AuthUser = create_test_user(&db, "0811", Role::Admin).await?.into();
        let member = create_test_user(&db, "0812", Role::Panitia).await?;
        let session = login(&db, "0812", TEST_PASSWORD, chrono::Duration::hours(1)).await?;

        assert!(matches!(
            delete_user(&db, &admin, admin.id).await,
            Err(Error::Conflict { .. })
        ));

        delete_user(&db, &admin, member.id).await?;
        assert!(matches!(
            validate_session(&db, &session.token).await,
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            delete_user(&db, &admin, member.id).await,
            Err(Error::NotFound { .. })
        ));
        assert_eq!(list_users(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_on_empty_table() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = BootstrapAdmin {
            name: "Admin".to_string(),
            phone: "0800".to_string(),
            password: "admin123".to_string(),
        };

        let created = bootstrap_admin(&db, &admin).await?.unwrap();
        assert_eq!(created.role, Role::Admin);
        assert!(bootstrap_admin(&db, &admin).await?.is_none());
        Ok(())
    }
}

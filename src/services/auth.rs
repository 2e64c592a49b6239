use std::sync::{Arc, OnceLock};

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{AdminBootstrap, MAX_SESSION_TTL_HOURS};
use crate::models::{NewUser, Session, User, UserProfile, UserRole};
use crate::store::TicketStore;
use crate::utils::error::AppError;

const TOKEN_BYTES: usize = 32;
const BAD_CREDENTIALS: &str = "Invalid username or password";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))
}

/// A malformed stored hash verifies as false rather than erroring.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Hash checked when the username is unknown, so a miss costs the same
/// Argon2 work as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("portal-dummy-password").unwrap_or_default())
        .as_str()
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Only the digest of a bearer token is ever stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated caller, handed explicitly to every handler that needs it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user: UserProfile,
}

impl SessionContext {
    pub fn is_admin(&self) -> bool {
        self.user.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only administrators can perform this action".to_string(),
            ))
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn TicketStore>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn TicketStore>, session_ttl_hours: i64) -> Self {
        Self {
            store,
            session_ttl: Duration::hours(session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS)),
        }
    }

    #[instrument(name = "auth.login", skip(self, request), fields(username = %request.username))]
    pub async fn login(
        &self,
        request: LoginRequest,
        now: DateTime<Utc>,
    ) -> Result<LoginResponse, AppError> {
        let user = match self
            .store
            .find_user_by_username(request.username.trim())
            .await?
        {
            Some(user) if verify_password(&request.password, &user.password_hash) => user,
            Some(_) => return Err(AppError::AuthError(BAD_CREDENTIALS.to_string())),
            None => {
                verify_password(&request.password, dummy_hash());
                return Err(AppError::AuthError(BAD_CREDENTIALS.to_string()));
            }
        };

        let purged = self.store.purge_expired_sessions(now).await?;
        if purged > 0 {
            debug!(purged, "Expired sessions purged");
        }

        let token = generate_token();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash: hash_token(&token),
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        let expires_at = session.expires_at;
        self.store.insert_session(session).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse {
            token,
            user: UserProfile::from(&user),
            expires_at,
        })
    }

    /// Resolves a bearer token. Expired sessions are removed on sight.
    pub async fn authenticate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionContext, AppError> {
        let session = self
            .store
            .find_session(&hash_token(token))
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid session".to_string()))?;

        if session.is_expired(now) {
            debug!(session_id = %session.id, "Session expired");
            self.store.delete_session(session.id).await?;
            return Err(AppError::AuthError("Session expired".to_string()));
        }

        let user = self
            .store
            .find_user(session.user_id)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid session".to_string()))?;

        Ok(SessionContext {
            session_id: session.id,
            user: UserProfile::from(&user),
        })
    }

    pub async fn logout(&self, context: &SessionContext) -> Result<(), AppError> {
        self.store.delete_session(context.session_id).await?;
        info!(user_id = %context.user.id, "User logged out");
        Ok(())
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        let user = NewUser {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            full_name: full_name.trim().to_string(),
            role,
        };
        self.store.insert_user(user, now).await
    }

    /// Creates the configured admin account unless it already exists.
    pub async fn ensure_admin(
        &self,
        admin: &AdminBootstrap,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if self
            .store
            .find_user_by_username(&admin.username)
            .await?
            .is_some()
        {
            debug!(username = %admin.username, "Admin account already present");
            return Ok(());
        }

        self.register(
            &admin.username,
            &admin.password,
            &admin.full_name,
            UserRole::Admin,
            now,
        )
        .await?;
        info!(username = %admin.username, "Admin account created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()), 1)
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("S3cret", &hash));
        assert!(!verify_password("s3cret", "plaintext"));
    }

    #[test]
    fn test_token_hash_is_stable() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
        assert_ne!(generate_token(), generate_token());
    }

    #[tokio::test]
    async fn test_login_and_session_expiry() {
        let auth = service();
        let now = Utc::now();
        auth.register("ana", "pw", "Ana Lima", UserRole::Staff, now)
            .await
            .unwrap();

        let wrong = auth
            .login(
                LoginRequest {
                    username: "ana".into(),
                    password: "nope".into(),
                },
                now,
            )
            .await;
        assert!(matches!(wrong, Err(AppError::AuthError(_))));

        let login = auth
            .login(
                LoginRequest {
                    username: "ana".into(),
                    password: "pw".into(),
                },
                now,
            )
            .await
            .unwrap();
        let context = auth.authenticate(&login.token, now).await.unwrap();
        assert_eq!(context.user.username, "ana");
        assert!(context.require_admin().is_err());

        let later = now + Duration::hours(2);
        assert!(matches!(
            auth.authenticate(&login.token, later).await,
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_dummy_hash_never_matches() {
        assert!(dummy_hash().starts_with("$argon2"));
        assert!(!verify_password("", dummy_hash()));
        assert!(!verify_password("pw", dummy_hash()));
    }

    #[tokio::test]
    async fn test_unknown_user_gets_the_same_error() {
        let auth = service();
        let now = Utc::now();
        auth.register("ana", "pw", "Ana Lima", UserRole::Staff, now)
            .await
            .unwrap();

        let unknown = auth
            .login(
                LoginRequest {
                    username: "ghost".into(),
                    password: "pw".into(),
                },
                now,
            )
            .await;
        match unknown {
            Err(AppError::AuthError(message)) => assert_eq!(message, BAD_CREDENTIALS),
            other => panic!("expected AuthError, got {:?}", other.map(|r| r.token)),
        }
    }

    #[tokio::test]
    async fn test_login_purges_expired_sessions() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store.clone(), 1);
        let now = Utc::now();
        auth.register("ana", "pw", "Ana Lima", UserRole::Staff, now)
            .await
            .unwrap();

        let request = || LoginRequest {
            username: "ana".into(),
            password: "pw".into(),
        };
        let abandoned = auth.login(request(), now).await.unwrap();

        let later = now + Duration::hours(3);
        let fresh = auth.login(request(), later).await.unwrap();

        assert!(store
            .find_session(&hash_token(&abandoned.token))
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_session(&hash_token(&fresh.token))
            .await
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_huge_session_ttl_is_clamped() {
        let auth = AuthService::new(Arc::new(MemoryStore::new()), i64::MAX);
        assert_eq!(auth.session_ttl, Duration::hours(MAX_SESSION_TTL_HOURS));
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let auth = service();
        let now = Utc::now();
        auth.register("root", "pw", "Root", UserRole::Admin, now)
            .await
            .unwrap();
        let login = auth
            .login(
                LoginRequest {
                    username: "root".into(),
                    password: "pw".into(),
                },
                now,
            )
            .await
            .unwrap();
        let context = auth.authenticate(&login.token, now).await.unwrap();
        assert!(context.require_admin().is_ok());

        auth.logout(&context).await.unwrap();
        assert!(auth.authenticate(&login.token, now).await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let auth = service();
        let admin = AdminBootstrap {
            username: "root".into(),
            password: "pw".into(),
            full_name: "Root".into(),
        };
        auth.ensure_admin(&admin, Utc::now()).await.unwrap();
        auth.ensure_admin(&admin, Utc::now()).await.unwrap();
    }
}

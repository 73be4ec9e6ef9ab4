use crate::errors::{AuthError, StoreError};
use crate::models::{Session, UserProfile};
use crate::store::UserStore;
use crate::validation::normalize_email;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

/// How long a session stays valid after sign-in. The session cookie uses the
/// same lifetime.
pub const SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Sessions created before this instant have expired.
pub fn session_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::seconds(SESSION_TTL_SECS)
}

/// Identity collaborator: who is signed in, and how they get there.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Creates an account without signing it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserProfile, AuthError>;

    /// Returns a fresh session token for valid credentials.
    async fn sign_in(&self, email: &str, password: &str) -> Result<(String, UserProfile), AuthError>;

    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;

    async fn current_user(&self, token: &str) -> Result<Option<UserProfile>, AuthError>;
}

/// Accounts and sessions kept in the app's own store.
pub struct LocalSessionProvider {
    users: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl LocalSessionProvider {
    pub fn new(users: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }
}

#[async_trait]
impl SessionProvider for LocalSessionProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::InvalidInput("email is required".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let hash = bcrypt::hash(password, self.bcrypt_cost)?;
        let user = match self.users.insert_user(&email, &hash).await {
            Ok(user) => user,
            Err(StoreError::Conflict { .. }) => return Err(AuthError::EmailTaken),
            Err(err) => return Err(err.into()),
        };
        info!(user_id = %user.id, "account created");
        Ok(UserProfile::from(&user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(String, UserProfile), AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            warn!("sign-in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
            warn!(user_id = %user.id, "sign-in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let expired = self.users.delete_sessions_before(session_cutoff(now)).await?;
        if expired > 0 {
            info!(expired, "pruned expired sessions");
        }

        let token = Uuid::new_v4().simple().to_string();
        self.users
            .insert_session(Session {
                token: token.clone(),
                user_id: user.id,
                created_at: now,
            })
            .await?;
        info!(user_id = %user.id, "signed in");
        Ok((token, UserProfile::from(&user)))
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        if self.users.delete_session(token).await? {
            info!("signed out");
        }
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<Option<UserProfile>, AuthError> {
        let Some(session) = self.users.find_session(token).await? else {
            return Ok(None);
        };
        if session.created_at < session_cutoff(Utc::now()) {
            self.users.delete_session(token).await?;
            info!(user_id = %session.user_id, "session expired");
            return Ok(None);
        }
        Ok(self
            .users
            .find_user(session.user_id)
            .await?
            .map(|user| UserProfile::from(&user)))
    }
}

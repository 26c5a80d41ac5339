//! Sessions and account management
//!
//! Email/password accounts with opaque bearer tokens. Passwords are stored
//! as hex-encoded salted blake3 digests. Sign-up leaves the profile pending;
//! the first successful sign-in confirms it. Session lifecycle events are
//! broadcast so other components (and the request log) can react to sign-in
//! and sign-out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::entities::{prelude::*, profiles};
use crate::models::auth::{SessionResponse, SignUpResponse};
use crate::services::clock::Clock;
use crate::services::local_store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("email must not be empty")]
    InvalidEmail,
    #[error("password must be at least 6 characters")]
    WeakPassword,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    pub password_salt: String,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn { user_id: Uuid, email: String },
    SignedOut { user_id: Uuid },
}

#[derive(Debug, Clone)]
struct Session {
    user_id: Uuid,
    email: String,
    full_name: Option<String>,
    signed_in_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn create(&self, profile: &Profile) -> Result<(), StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;
    /// Records the sign-in instant and confirms a pending profile.
    async fn mark_signed_in(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// SeaORM-backed store against the `profiles` table.
#[derive(Clone)]
pub struct SeaOrmProfileStore {
    db: DatabaseConnection,
}

impl SeaOrmProfileStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn from_row(row: profiles::Model) -> Profile {
    Profile {
        id: row.id,
        email: row.email,
        full_name: row.full_name,
        password_hash: row.password_hash,
        password_salt: row.password_salt,
        confirmed: row.confirmed,
        created_at: row.created_at.with_timezone(&Utc),
        last_sign_in_at: row.last_sign_in_at.map(|t| t.with_timezone(&Utc)),
    }
}

#[async_trait]
impl ProfileStore for SeaOrmProfileStore {
    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        let row = profiles::ActiveModel {
            id: Set(profile.id),
            email: Set(profile.email.clone()),
            full_name: Set(profile.full_name.clone()),
            password_hash: Set(profile.password_hash.clone()),
            password_salt: Set(profile.password_salt.clone()),
            confirmed: Set(profile.confirmed),
            created_at: Set(profile.created_at.into()),
            last_sign_in_at: Set(profile.last_sign_in_at.map(Into::into)),
        };
        row.insert(&self.db).await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let row = Profiles::find()
            .filter(profiles::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(row.map(from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let row = Profiles::find_by_id(id).one(&self.db).await?;
        Ok(row.map(from_row))
    }

    async fn mark_signed_in(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let row = Profiles::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;

        let mut active = row.into_active_model();
        active.confirmed = Set(true);
        active.last_sign_in_at = Set(Some(at.into()));
        active.update(&self.db).await?;
        Ok(())
    }
}

/// In-memory store for tests and database-less development.
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<RwLock<HashMap<Uuid, Profile>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        self.profiles.write().insert(profile.id, profile.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .profiles
            .read()
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.read().get(&id).cloned())
    }

    async fn mark_signed_in(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write();
        let profile = profiles.get_mut(&id).ok_or(StoreError::NotFound)?;
        profile.confirmed = true;
        profile.last_sign_in_at = Some(at);
        Ok(())
    }
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize().as_bytes())
}

fn new_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct AuthService {
    profiles: Arc<dyn ProfileStore>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    events: broadcast::Sender<SessionEvent>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(profiles: Arc<dyn ProfileStore>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            profiles,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            events,
            clock,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> Result<SignUpResponse, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < 6 {
            return Err(AuthError::WeakPassword);
        }

        if self.profiles.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let salt = new_salt();
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.clone(),
            full_name,
            password_hash: hash_password(password, &salt),
            password_salt: salt,
            confirmed: false,
            created_at: self.clock.now(),
            last_sign_in_at: None,
        };
        self.profiles.create(&profile).await?;

        info!("New account registered: {}", email);
        Ok(SignUpResponse {
            user_id: profile.id,
            pending_confirmation: true,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionResponse, AuthError> {
        let email = email.trim().to_lowercase();
        let profile = self
            .profiles
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if hash_password(password, &profile.password_salt) != profile.password_hash {
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.clock.now();
        self.profiles.mark_signed_in(profile.id, now).await?;

        let token = Uuid::new_v4().to_string();
        let session = Session {
            user_id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            signed_in_at: now,
        };
        self.sessions.write().insert(token.clone(), session);

        let _ = self.events.send(SessionEvent::SignedIn {
            user_id: profile.id,
            email: profile.email.clone(),
        });

        Ok(SessionResponse {
            token,
            user_id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            signed_in_at: now,
        })
    }

    pub fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let session = self
            .sessions
            .write()
            .remove(token)
            .ok_or(AuthError::Unauthenticated)?;

        let _ = self.events.send(SessionEvent::SignedOut {
            user_id: session.user_id,
        });
        Ok(())
    }

    /// Resolves a bearer token to the signed-in user, if any.
    pub fn user_for_token(&self, token: Option<&str>) -> Option<Uuid> {
        let token = token?;
        self.sessions.read().get(token).map(|s| s.user_id)
    }

    pub fn current_session(&self, token: &str) -> Result<SessionResponse, AuthError> {
        let sessions = self.sessions.read();
        let session = sessions.get(token).ok_or(AuthError::Unauthenticated)?;
        Ok(SessionResponse {
            token: token.to_string(),
            user_id: session.user_id,
            email: session.email.clone(),
            full_name: session.full_name.clone(),
            signed_in_at: session.signed_in_at,
        })
    }

    /// Always acknowledges, whether or not the account exists; the response
    /// must not leak which emails are registered.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim().to_lowercase();
        match self.profiles.find_by_email(&email).await? {
            Some(profile) => info!("Password reset requested for {}", profile.email),
            None => info!("Password reset requested for unknown address"),
        }
        Ok(())
    }
}

//! Ports to the external backend: an identity service that owns credentials and
//! a document store that owns everything else.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use password_hash::rand_core::OsRng;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryDocumentStore, MemoryIdentityService};
pub use postgres::{PgDocumentStore, PgIdentityService};

/// Field map of a single document.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// What the identity service hands back for a created or verified account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("email is already in use")]
    EmailAlreadyInUse,

    #[error("invalid email or password")]
    InvalidCredential,

    #[error("account `{0}` not found")]
    AccountNotFound(String),

    #[error("identity backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("document store failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn create_account(&self, email: &str, password: &str)
    -> Result<Credential, IdentityError>;

    async fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Credential, IdentityError>;

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates or overwrites `collection/id`.
    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError>;

    /// Creates a document under a store-assigned id and returns that id.
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    async fn read_document(&self, collection: &str, id: &str) -> Result<Fields, StoreError>;

    /// All documents of a collection ordered by id.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError>;
}

/// Rules the identity backends apply before touching storage.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_len: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_len: 5 }
    }
}

impl PasswordPolicy {
    pub fn check(&self, password: &str) -> Result<(), IdentityError> {
        if password.chars().count() < self.min_len {
            return Err(IdentityError::WeakPassword { min: self.min_len });
        }
        Ok(())
    }
}

pub const MAX_EMAIL_LEN: usize = 254;

/// Trims and lowercases an email, rejecting anything without a local part and
/// a domain around a single `@`.
pub fn normalize_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.contains(char::is_whitespace) {
        return Err(IdentityError::InvalidEmail);
    }
    let (local, domain) = email.split_once('@').ok_or(IdentityError::InvalidEmail)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(IdentityError::InvalidEmail);
    }
    Ok(email)
}

pub(crate) fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Backend(e.to_string()))
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> Result<(), IdentityError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|_| IdentityError::Backend("invalid password hash".into()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| IdentityError::InvalidCredential)
}

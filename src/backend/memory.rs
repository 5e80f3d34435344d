//! Process-local backend used for development and tests. Nothing survives a
//! restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Credential, Document, DocumentStore, Fields, IdentityError, IdentityService, PasswordPolicy,
    StoreError, hash_password, normalize_email, verify_password,
};

struct Account {
    uid: String,
    password_hash: String,
}

#[derive(Default)]
pub struct MemoryIdentityService {
    policy: PasswordPolicy,
    // keyed by normalized email
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryIdentityService {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self {
            policy,
            accounts: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl IdentityService for MemoryIdentityService {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Credential, IdentityError> {
        let email = normalize_email(email)?;
        self.policy.check(password)?;
        let password_hash = hash_password(password)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&email) {
            return Err(IdentityError::EmailAlreadyInUse);
        }
        let uid = Uuid::new_v4().simple().to_string();
        accounts.insert(
            email.clone(),
            Account {
                uid: uid.clone(),
                password_hash,
            },
        );
        Ok(Credential { uid, email })
    }

    async fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Credential, IdentityError> {
        let email = normalize_email(email).map_err(|_| IdentityError::InvalidCredential)?;
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&email)
            .ok_or(IdentityError::InvalidCredential)?;
        verify_password(password, &account.password_hash)?;
        Ok(Credential {
            uid: account.uid.clone(),
            email,
        })
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().await;
        let before = accounts.len();
        accounts.retain(|_, account| account.uid != uid);
        if accounts.len() == before {
            return Err(IdentityError::AccountNotFound(uid.to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.write_document(collection, &id, fields).await?;
        Ok(id)
    }

    async fn read_document(&self, collection: &str, id: &str) -> Result<Fields, StoreError> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }
}

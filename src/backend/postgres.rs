//! Postgres-backed identity service and document store built on SeaORM.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, sea_query::OnConflict,
};
use serde_json::Value;
use uuid::Uuid;

use super::{
    Credential, Document, DocumentStore, Fields, IdentityError, IdentityService, PasswordPolicy,
    StoreError, hash_password, normalize_email, verify_password,
};
use crate::entity::{
    documents::{self, Entity as Documents},
    identities::{self, Entity as Identities},
};

pub struct PgIdentityService {
    orm: DatabaseConnection,
    policy: PasswordPolicy,
}

impl PgIdentityService {
    pub fn new(orm: DatabaseConnection, policy: PasswordPolicy) -> Self {
        Self { orm, policy }
    }
}

fn identity_backend(err: DbErr) -> IdentityError {
    IdentityError::Backend(err.to_string())
}

#[async_trait]
impl IdentityService for PgIdentityService {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Credential, IdentityError> {
        let email = normalize_email(email)?;
        self.policy.check(password)?;

        let exist = Identities::find()
            .filter(identities::Column::Email.eq(email.as_str()))
            .one(&self.orm)
            .await
            .map_err(identity_backend)?;
        if exist.is_some() {
            return Err(IdentityError::EmailAlreadyInUse);
        }

        let uid = Uuid::new_v4().simple().to_string();
        let active = identities::ActiveModel {
            uid: Set(uid.clone()),
            email: Set(email.clone()),
            password_hash: Set(hash_password(password)?),
            created_at: Set(Utc::now().fixed_offset()),
        };
        // a concurrent signup can still win the race between the lookup and the insert
        active.insert(&self.orm).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => IdentityError::EmailAlreadyInUse,
            _ => identity_backend(err),
        })?;

        Ok(Credential { uid, email })
    }

    async fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Credential, IdentityError> {
        let email = normalize_email(email).map_err(|_| IdentityError::InvalidCredential)?;
        let account = Identities::find()
            .filter(identities::Column::Email.eq(email.as_str()))
            .one(&self.orm)
            .await
            .map_err(identity_backend)?
            .ok_or(IdentityError::InvalidCredential)?;

        verify_password(password, &account.password_hash)?;
        Ok(Credential {
            uid: account.uid,
            email: account.email,
        })
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let result = Identities::delete_by_id(uid.to_string())
            .exec(&self.orm)
            .await
            .map_err(identity_backend)?;
        if result.rows_affected == 0 {
            return Err(IdentityError::AccountNotFound(uid.to_string()));
        }
        Ok(())
    }
}

pub struct PgDocumentStore {
    orm: DatabaseConnection,
}

impl PgDocumentStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

fn store_backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn fields_of(collection: &str, id: &str, value: Value) -> Result<Fields, StoreError> {
    match value {
        Value::Object(fields) => Ok(fields),
        _ => Err(StoreError::Backend(format!(
            "document {collection}/{id} is not an object"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let now = Utc::now().fixed_offset();
        let active = documents::ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.to_string()),
            fields: Set(Value::Object(fields)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Documents::insert(active)
            .on_conflict(
                OnConflict::columns([documents::Column::Collection, documents::Column::Id])
                    .update_columns([documents::Column::Fields, documents::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.orm)
            .await
            .map_err(store_backend)?;
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let now = Utc::now().fixed_offset();
        documents::ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.clone()),
            fields: Set(Value::Object(fields)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.orm)
        .await
        .map_err(store_backend)?;
        Ok(id)
    }

    async fn read_document(&self, collection: &str, id: &str) -> Result<Fields, StoreError> {
        let model = Documents::find_by_id((collection.to_string(), id.to_string()))
            .one(&self.orm)
            .await
            .map_err(store_backend)?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        fields_of(collection, id, model.fields)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let models = Documents::find()
            .filter(documents::Column::Collection.eq(collection))
            .order_by_asc(documents::Column::Id)
            .all(&self.orm)
            .await
            .map_err(store_backend)?;

        models
            .into_iter()
            .map(|model| {
                let fields = fields_of(collection, &model.id, model.fields)?;
                Ok(Document {
                    id: model.id,
                    fields,
                })
            })
            .collect()
    }
}

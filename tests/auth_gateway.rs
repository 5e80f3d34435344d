use std::sync::Arc;

use async_trait::async_trait;
use bizkart_api::{
    backend::{
        Document, DocumentStore, Fields, IdentityError, IdentityService, MemoryDocumentStore,
        MemoryIdentityService, PasswordPolicy, StoreError,
    },
    models::{Destination, Role, route_for_role},
    services::auth_service::{AuthError, AuthGateway, USERS_COLLECTION},
};
use serde_json::json;

fn gateway() -> (AuthGateway, Arc<MemoryIdentityService>, Arc<MemoryDocumentStore>) {
    let identity = Arc::new(MemoryIdentityService::new(PasswordPolicy::default()));
    let store = Arc::new(MemoryDocumentStore::new());
    let gateway = AuthGateway::new(identity.clone(), store.clone());
    (gateway, identity, store)
}

/// Delegates to an in-memory store but refuses writes to one collection.
struct FailingWrites {
    inner: MemoryDocumentStore,
    collection: &'static str,
}

#[async_trait]
impl DocumentStore for FailingWrites {
    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        if collection == self.collection {
            return Err(StoreError::Backend("write refused".into()));
        }
        self.inner.write_document(collection, id, fields).await
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.inner.add_document(collection, fields).await
    }

    async fn read_document(&self, collection: &str, id: &str) -> Result<Fields, StoreError> {
        self.inner.read_document(collection, id).await
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.list_documents(collection).await
    }
}

#[tokio::test]
async fn signup_then_login_returns_signup_role() {
    let (gateway, _, _) = gateway();

    let created = gateway
        .sign_up("a@x.com", "pw123", Role::Wholesaler)
        .await
        .expect("signup");
    assert_eq!(created.role, Role::Wholesaler);
    assert_eq!(created.email, "a@x.com");

    let account = gateway.login("a@x.com", "pw123").await.expect("login");
    assert_eq!(account.id, created.id);
    assert_eq!(account.role, Role::Wholesaler);
    assert_eq!(account.role.destination(), Destination::WholesalerDashboard);
}

#[tokio::test]
async fn every_role_survives_signup_and_login() {
    let (gateway, _, _) = gateway();
    for (email, role) in [
        ("r@shop.in", Role::Retailer),
        ("w@shop.in", Role::Wholesaler),
        ("admin@shop.in", Role::Admin),
    ] {
        gateway.sign_up(email, "secret1", role).await.expect("signup");
        let account = gateway.login(email, "secret1").await.expect("login");
        assert_eq!(account.role, role);
    }
}

#[tokio::test]
async fn signup_writes_role_document() {
    let (gateway, _, store) = gateway();
    let account = gateway
        .sign_up("Shop@Example.com ", "pw123", Role::Retailer)
        .await
        .expect("signup");

    let fields = store
        .read_document(USERS_COLLECTION, &account.id)
        .await
        .expect("role document");
    assert_eq!(fields.get("email"), Some(&json!("shop@example.com")));
    assert_eq!(fields.get("role"), Some(&json!("retailer")));
}

#[tokio::test]
async fn wrong_password_fails_without_partial_account() {
    let (gateway, _, _) = gateway();
    gateway
        .sign_up("a@x.com", "pw123", Role::Retailer)
        .await
        .expect("signup");

    let err = gateway.login("a@x.com", "nope!").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Credential(IdentityError::InvalidCredential)
    ));

    let err = gateway.login("nobody@x.com", "pw123").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Credential(IdentityError::InvalidCredential)
    ));
}

#[tokio::test]
async fn signup_rejections_are_distinguishable() {
    let (gateway, _, _) = gateway();
    gateway
        .sign_up("a@x.com", "pw123", Role::Retailer)
        .await
        .expect("signup");

    let duplicate = gateway
        .sign_up("A@X.com", "other1", Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(
        duplicate,
        AuthError::Credential(IdentityError::EmailAlreadyInUse)
    ));

    let malformed = gateway
        .sign_up("not-an-email", "pw123", Role::Retailer)
        .await
        .unwrap_err();
    assert!(matches!(
        malformed,
        AuthError::Credential(IdentityError::InvalidEmail)
    ));

    let weak = gateway
        .sign_up("b@x.com", "pw", Role::Retailer)
        .await
        .unwrap_err();
    assert!(matches!(
        weak,
        AuthError::Credential(IdentityError::WeakPassword { min: 5 })
    ));
}

#[tokio::test]
async fn login_without_role_document_is_role_lookup_error() {
    let identity = Arc::new(MemoryIdentityService::default());
    let store = Arc::new(MemoryDocumentStore::new());
    identity
        .create_account("orphan@x.com", "pw123")
        .await
        .expect("account");

    let gateway = AuthGateway::new(identity, store);
    let err = gateway.login("orphan@x.com", "pw123").await.unwrap_err();
    assert!(matches!(err, AuthError::RoleLookup { .. }));
}

#[tokio::test]
async fn stored_role_outside_enumeration_is_rejected() {
    let (gateway, identity, store) = gateway();
    let credential = identity
        .create_account("odd@x.com", "pw123")
        .await
        .expect("account");
    let mut fields = Fields::new();
    fields.insert("email".into(), json!("odd@x.com"));
    fields.insert("role".into(), json!("superuser"));
    store
        .write_document(USERS_COLLECTION, &credential.uid, fields)
        .await
        .expect("write");

    let err = gateway.login("odd@x.com", "pw123").await.unwrap_err();
    match err {
        AuthError::UnknownRole(unknown) => assert_eq!(unknown.0, "superuser"),
        other => panic!("expected unknown role, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_role_write_removes_credential() {
    let identity = Arc::new(MemoryIdentityService::default());
    let store = Arc::new(FailingWrites {
        inner: MemoryDocumentStore::new(),
        collection: USERS_COLLECTION,
    });
    let gateway = AuthGateway::new(identity.clone(), store);

    let err = gateway
        .sign_up("a@x.com", "pw123", Role::Retailer)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Storage(StoreError::Backend(_))));

    // the email is free again because the credential was rolled back
    identity
        .create_account("a@x.com", "pw123")
        .await
        .expect("email reusable");
}

#[test]
fn routing_covers_every_role_and_rejects_others() {
    assert_eq!(
        route_for_role("retailer").unwrap(),
        Destination::RetailerDashboard
    );
    assert_eq!(
        route_for_role("wholesaler").unwrap(),
        Destination::WholesalerDashboard
    );
    assert_eq!(route_for_role("admin").unwrap().path(), "/dashboard/admin");

    let err = route_for_role("Retailer").unwrap_err();
    assert_eq!(err.0, "Retailer");
    assert!(route_for_role("").is_err());
}

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    backend::{
        DocumentStore, IdentityService, MemoryDocumentStore, MemoryIdentityService,
        PgDocumentStore, PgIdentityService,
    },
    config::AppConfig,
    middleware::auth::JwtKeys,
    services::{auth_service::AuthGateway, cart_service::CartSessions},
};

#[derive(Clone)]
pub struct AppState {
    pub gateway: AuthGateway,
    pub store: Arc<dyn DocumentStore>,
    pub carts: CartSessions,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn DocumentStore>,
        jwt: JwtKeys,
    ) -> Self {
        Self {
            gateway: AuthGateway::new(identity, Arc::clone(&store)),
            store,
            carts: CartSessions::default(),
            jwt,
        }
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(MemoryIdentityService::new(config.password_policy())),
            Arc::new(MemoryDocumentStore::new()),
            JwtKeys::from_config(config),
        )
    }

    pub fn postgres(config: &AppConfig, orm: DatabaseConnection) -> Self {
        Self::new(
            Arc::new(PgIdentityService::new(orm.clone(), config.password_policy())),
            Arc::new(PgDocumentStore::new(orm)),
            JwtKeys::from_config(config),
        )
    }
}

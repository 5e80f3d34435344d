use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::{
    audit::log_audit,
    backend::{DocumentStore, Fields, IdentityError, IdentityService, StoreError},
    dto::auth::{LoginRequest, LoginResponse, SignUpRequest},
    error::{AppError, AppResult},
    models::{Role, UnknownRoleError, UserAccount},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Collection holding one `{email, role}` document per account, keyed by uid.
pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential rejected: {0}")]
    Credential(#[from] IdentityError),

    #[error("no role document for user {uid}")]
    RoleLookup { uid: String },

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    UnknownRole(#[from] UnknownRoleError),
}

/// Signup and login against the injected identity service, with the role kept
/// as a document next to the credential.
#[derive(Clone)]
pub struct AuthGateway {
    identity: Arc<dyn IdentityService>,
    store: Arc<dyn DocumentStore>,
}

impl AuthGateway {
    pub fn new(identity: Arc<dyn IdentityService>, store: Arc<dyn DocumentStore>) -> Self {
        Self { identity, store }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserAccount, AuthError> {
        let credential = self
            .identity
            .create_account(email, password)
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "signup rejected by identity service"))?;

        let mut fields = Fields::new();
        fields.insert("email".into(), Value::String(credential.email.clone()));
        fields.insert("role".into(), Value::String(role.as_str().into()));

        if let Err(err) = self
            .store
            .write_document(USERS_COLLECTION, &credential.uid, fields)
            .await
        {
            tracing::error!(error = %err, uid = %credential.uid, "role document write failed");
            // an account without a role document can never log in, so undo it
            if let Err(cleanup) = self.identity.delete_account(&credential.uid).await {
                tracing::error!(
                    error = %cleanup,
                    uid = %credential.uid,
                    "failed to remove credential after role write failure"
                );
            }
            return Err(AuthError::Storage(err));
        }

        tracing::info!(uid = %credential.uid, role = %role, "account created");
        Ok(UserAccount {
            id: credential.uid,
            email: credential.email,
            role,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserAccount, AuthError> {
        let credential = self
            .identity
            .verify_credential(email, password)
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "login rejected by identity service"))?;

        let fields = match self
            .store
            .read_document(USERS_COLLECTION, &credential.uid)
            .await
        {
            Ok(fields) => fields,
            Err(StoreError::NotFound { .. }) => {
                tracing::error!(uid = %credential.uid, "no role found for user");
                return Err(AuthError::RoleLookup {
                    uid: credential.uid,
                });
            }
            Err(err) => {
                tracing::error!(error = %err, uid = %credential.uid, "role document read failed");
                return Err(AuthError::Storage(err));
            }
        };

        let Some(raw_role) = fields.get("role").and_then(Value::as_str) else {
            tracing::error!(uid = %credential.uid, "role document has no role");
            return Err(AuthError::RoleLookup {
                uid: credential.uid,
            });
        };
        let role = raw_role
            .parse::<Role>()
            .inspect_err(|err| tracing::error!(error = %err, uid = %credential.uid, "stored role is not recognised"))?;

        Ok(UserAccount {
            id: credential.uid,
            email: credential.email,
            role,
        })
    }
}

pub async fn sign_up_user(
    state: &AppState,
    payload: SignUpRequest,
) -> AppResult<ApiResponse<UserAccount>> {
    let SignUpRequest {
        email,
        password,
        role,
    } = payload;
    let role = role
        .parse::<Role>()
        .map_err(|err| AppError::sign_up_failed(err.into()))?;

    let account = state
        .gateway
        .sign_up(&email, &password, role)
        .await
        .map_err(AppError::sign_up_failed)?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(account.id.as_str()),
        "user_signup",
        Some(USERS_COLLECTION),
        Some(serde_json::json!({ "user_id": account.id, "role": account.role })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        format!("Signed up as {}", account.role),
        account,
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let account = state
        .gateway
        .login(&email, &password)
        .await
        .map_err(AppError::login_failed)?;

    let token = state.jwt.issue(&account)?;
    let destination = account.role.destination();

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(account.id.as_str()),
        "user_login",
        Some(USERS_COLLECTION),
        Some(serde_json::json!({ "user_id": account.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let resp = LoginResponse {
        token: format!("Bearer {}", token),
        redirect_to: destination.path().to_string(),
        destination,
        user: account,
    };

    Ok(ApiResponse::success(
        format!("Welcome {} ({})", resp.user.email, resp.user.role),
        resp,
        Some(Meta::empty()),
    ))
}

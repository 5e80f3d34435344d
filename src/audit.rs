use chrono::Utc;
use serde_json::Value;

use crate::backend::{DocumentStore, Fields, StoreError};

pub const AUDIT_COLLECTION: &str = "audit_logs";

/// Appends an audit entry to the document store. Callers treat failure as a
/// warning, never as a reason to fail the request.
pub async fn log_audit(
    store: &dyn DocumentStore,
    user_id: Option<&str>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> Result<String, StoreError> {
    let mut fields = Fields::new();
    fields.insert(
        "userId".into(),
        user_id.map_or(Value::Null, |id| Value::String(id.to_string())),
    );
    fields.insert("action".into(), Value::String(action.to_string()));
    fields.insert(
        "resource".into(),
        resource.map_or(Value::Null, |r| Value::String(r.to_string())),
    );
    fields.insert("metadata".into(), metadata.unwrap_or(Value::Null));
    fields.insert("createdAt".into(), Value::String(Utc::now().to_rfc3339()));

    store.add_document(AUDIT_COLLECTION, fields).await
}

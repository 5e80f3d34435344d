use serde_json::Value;
use thiserror::Error;

use crate::{
    audit::log_audit,
    backend::{Document, DocumentStore, Fields, StoreError},
    dto::products::{CreateProductRequest, ProductList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_wholesaler},
    models::{Price, PriceError, Product},
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

pub const PRODUCTS_COLLECTION: &str = "products";

#[derive(Debug, Error)]
pub enum ProductDocError {
    #[error("field `{0}` is missing or not text")]
    MissingField(&'static str),

    #[error("field `name` is empty")]
    EmptyName,

    #[error(transparent)]
    Price(#[from] PriceError),
}

fn text_field<'a>(fields: &'a Fields, key: &'static str) -> Result<&'a str, ProductDocError> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .ok_or(ProductDocError::MissingField(key))
}

/// Rebuilds a product from its stored document. Prices written as JSON numbers
/// by other clients are accepted and parsed like text.
pub fn product_from_document(doc: Document) -> Result<Product, ProductDocError> {
    let Document { id, fields } = doc;
    let name = text_field(&fields, "name")?.trim();
    if name.is_empty() {
        return Err(ProductDocError::EmptyName);
    }
    let price = match fields.get("price") {
        Some(Value::String(raw)) => Price::parse(raw)?,
        Some(Value::Number(n)) => Price::parse(&n.to_string())?,
        _ => return Err(ProductDocError::MissingField("price")),
    };
    Ok(Product {
        name: name.to_string(),
        price,
        image: text_field(&fields, "image")?.to_string(),
        wholesaler_id: text_field(&fields, "wholesalerId")?.to_string(),
        id,
    })
}

fn product_fields(name: &str, price: &Price, image: &str, wholesaler_id: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".into(), Value::String(name.to_string()));
    fields.insert("price".into(), Value::String(price.to_string()));
    fields.insert("image".into(), Value::String(image.to_string()));
    fields.insert("wholesalerId".into(), Value::String(wholesaler_id.to_string()));
    fields
}

/// Looks up one product; a missing or unreadable document is `NotFound`.
pub async fn find_product(store: &dyn DocumentStore, id: &str) -> AppResult<Product> {
    let fields = match store.read_document(PRODUCTS_COLLECTION, id).await {
        Ok(fields) => fields,
        Err(StoreError::NotFound { .. }) => return Err(AppError::NotFound),
        Err(err) => return Err(err.into()),
    };
    product_from_document(Document {
        id: id.to_string(),
        fields,
    })
    .map_err(|err| {
        tracing::warn!(error = %err, product_id = %id, "unreadable product document");
        AppError::NotFound
    })
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, per_page, offset) = query.pagination().normalize();
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let docs = state.store.list_documents(PRODUCTS_COLLECTION).await?;
    let matching: Vec<Product> = docs
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            product_from_document(doc)
                .inspect_err(|err| tracing::warn!(error = %err, product_id = %id, "skipping product"))
                .ok()
        })
        .filter(|p| {
            query
                .wholesaler_id
                .as_deref()
                .is_none_or(|owner| p.wholesaler_id == owner)
        })
        .filter(|p| {
            needle
                .as_deref()
                .is_none_or(|n| p.name.to_lowercase().contains(n))
        })
        .collect();

    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(offset as usize)
        .take(per_page as usize)
        .collect();

    let meta = Meta::new(page, per_page, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: &str) -> AppResult<ApiResponse<Product>> {
    let product = find_product(state.store.as_ref(), id).await?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_wholesaler(user)?;

    let name = payload.name.trim();
    let image = payload.image.trim();
    if name.is_empty() || payload.price.trim().is_empty() || image.is_empty() {
        return Err(AppError::BadRequest("Please fill all fields".to_string()));
    }
    let price = Price::parse(&payload.price).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let id = state
        .store
        .add_document(
            PRODUCTS_COLLECTION,
            product_fields(name, &price, image, &user.user_id),
        )
        .await?;
    tracing::info!(product_id = %id, wholesaler_id = %user.user_id, "product added");

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id.as_str()),
        "product_create",
        Some(PRODUCTS_COLLECTION),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let product = Product {
        id,
        name: name.to_string(),
        price,
        image: image.to_string(),
        wholesaler_id: user.user_id.clone(),
    };
    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartView, CheckoutTransfer, ReceiveCartRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(open_cart))
        .route("/receive", post(receive_cart))
        .route("/{session_id}", get(get_cart))
        .route("/{session_id}/items", post(add_to_cart))
        .route("/{session_id}/items/{position}", delete(remove_from_cart))
        .route("/{session_id}/entries/{entry_id}", delete(remove_entry))
        .route("/{session_id}/transfer", post(transfer_cart))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    responses(
        (status = 201, description = "Empty cart session opened", body = ApiResponse<CartView>),
        (status = 403, description = "Caller is not a retailer")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn open_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<(StatusCode, Json<ApiResponse<CartView>>)> {
    let resp = cart_service::open_cart(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/cart/{session_id}",
    params(
        ("session_id" = Uuid, Path, description = "Cart session ID")
    ),
    responses(
        (status = 200, description = "Items and total", body = ApiResponse<CartView>),
        (status = 404, description = "Cart session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::get_cart(&state, &user, session_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/{session_id}/items",
    params(
        ("session_id" = Uuid, Path, description = "Cart session ID")
    ),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Product appended", body = ApiResponse<CartView>),
        (status = 400, description = "Product not found"),
        (status = 404, description = "Cart session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::add_to_cart(&state, &user, session_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{session_id}/items/{position}",
    params(
        ("session_id" = Uuid, Path, description = "Cart session ID"),
        ("position" = usize, Path, description = "Zero-based position")
    ),
    responses(
        (status = 200, description = "Entry removed, or nothing at that position", body = ApiResponse<CartView>),
        (status = 404, description = "Cart session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, position)): Path<(Uuid, usize)>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::remove_from_cart(&state, &user, session_id, position).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{session_id}/entries/{entry_id}",
    params(
        ("session_id" = Uuid, Path, description = "Cart session ID"),
        ("entry_id" = u64, Path, description = "Entry ID assigned when the item was added")
    ),
    responses(
        (status = 200, description = "Entry removed, or no such entry", body = ApiResponse<CartView>),
        (status = 404, description = "Cart session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, entry_id)): Path<(Uuid, u64)>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::remove_entry(&state, &user, session_id, entry_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/{session_id}/transfer",
    params(
        ("session_id" = Uuid, Path, description = "Cart session ID")
    ),
    responses(
        (status = 200, description = "Serialized cart; the session is closed", body = ApiResponse<CheckoutTransfer>),
        (status = 400, description = "Cart is empty"),
        (status = 404, description = "Cart session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn transfer_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CheckoutTransfer>>> {
    let resp = cart_service::transfer_cart(&state, &user, session_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/receive",
    request_body = ReceiveCartRequest,
    responses(
        (status = 201, description = "New session holding the transferred items", body = ApiResponse<CartView>),
        (status = 400, description = "Malformed payload")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn receive_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ReceiveCartRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CartView>>)> {
    let resp = cart_service::receive_cart(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

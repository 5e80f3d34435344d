use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartLine, CartView, CheckoutTransfer, ReceiveCartRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_retailer},
    models::{Product, format_amount},
    response::{ApiResponse, Meta},
    services::product_service::find_product,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("malformed cart payload: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("cart could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("cart is empty")]
    Empty,

    #[error("cart total is too large")]
    Overflow,
}

/// Identifier handed out when an entry is added. Unlike a position it does not
/// shift when earlier entries are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct CartEntry {
    pub id: EntryId,
    pub product: Product,
}

/// Ordered products picked during one session. Duplicates are kept as separate
/// entries and there is no size limit.
#[derive(Debug, Clone, Default)]
pub struct CartLedger {
    entries: Vec<CartEntry>,
    next_id: u64,
}

impl CartLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, product: Product) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(CartEntry { id, product });
        id
    }

    /// Removes the entry at `position`, shifting later entries down. An
    /// out-of-range position leaves the ledger untouched and returns `None`.
    pub fn remove_item(&mut self, position: usize) -> Option<Product> {
        if position >= self.entries.len() {
            return None;
        }
        Some(self.entries.remove(position).product)
    }

    pub fn remove_entry(&mut self, id: EntryId) -> Option<Product> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        self.remove_item(position)
    }

    /// Exact sum of the entry prices. Fails instead of clamping when the sum
    /// leaves the decimal range.
    pub fn compute_total(&self) -> Result<Decimal, CartError> {
        self.entries.iter().try_fold(Decimal::ZERO, |total, entry| {
            total
                .checked_add(entry.product.price.amount())
                .ok_or(CartError::Overflow)
        })
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.entries.iter().map(|entry| &entry.product)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the products, in order, as a JSON array.
    pub fn transfer_to_checkout(&self) -> Result<String, CartError> {
        let products: Vec<&Product> = self.products().collect();
        serde_json::to_string(&products).map_err(CartError::Encode)
    }

    /// Builds an independent ledger from a transfer payload. Entry ids start
    /// over; prices are validated again on the way in.
    pub fn from_transfer(payload: &str) -> Result<Self, CartError> {
        let products: Vec<Product> = serde_json::from_str(payload).map_err(CartError::Payload)?;
        Ok(products.into_iter().collect())
    }
}

impl FromIterator<Product> for CartLedger {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        let mut ledger = CartLedger::new();
        for product in iter {
            ledger.add_item(product);
        }
        ledger
    }
}

struct CartSession {
    owner: String,
    ledger: CartLedger,
}

/// Open carts keyed by session id. A session is only visible to the user that
/// opened it; all access goes through the table lock.
#[derive(Clone, Default)]
pub struct CartSessions {
    inner: Arc<Mutex<HashMap<Uuid, CartSession>>>,
}

impl CartSessions {
    /// Opens a session for `owner`, closing any session they already had. An
    /// owner holds at most one live cart.
    pub async fn open(&self, owner: &str, ledger: CartLedger) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.inner.lock().await;
        sessions.retain(|_, session| session.owner != owner);
        sessions.insert(
            id,
            CartSession {
                owner: owner.to_string(),
                ledger,
            },
        );
        id
    }

    pub async fn with_ledger<R>(
        &self,
        id: Uuid,
        owner: &str,
        f: impl FnOnce(&mut CartLedger) -> R,
    ) -> AppResult<R> {
        let mut sessions = self.inner.lock().await;
        match sessions.get_mut(&id) {
            Some(session) if session.owner == owner => Ok(f(&mut session.ledger)),
            _ => Err(AppError::NotFound),
        }
    }

    /// Runs `f` and closes the session only if it succeeds.
    pub async fn take_with<R>(
        &self,
        id: Uuid,
        owner: &str,
        f: impl FnOnce(&CartLedger) -> Result<R, CartError>,
    ) -> AppResult<R> {
        let mut sessions = self.inner.lock().await;
        let session = sessions
            .get(&id)
            .filter(|session| session.owner == owner)
            .ok_or(AppError::NotFound)?;
        let out = f(&session.ledger)?;
        sessions.remove(&id);
        Ok(out)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

fn cart_view(session_id: Uuid, ledger: &CartLedger) -> Result<CartView, CartError> {
    Ok(CartView {
        session_id,
        items: ledger
            .entries()
            .iter()
            .enumerate()
            .map(|(position, entry)| CartLine {
                position,
                entry_id: entry.id.0,
                product: entry.product.clone(),
            })
            .collect(),
        total: format_amount(ledger.compute_total()?),
    })
}

pub async fn open_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    ensure_retailer(user)?;
    let ledger = CartLedger::new();
    let view = cart_view(Uuid::nil(), &ledger)?;
    let session_id = state.carts.open(&user.user_id, ledger).await;
    tracing::debug!(%session_id, user_id = %user.user_id, "cart opened");
    Ok(ApiResponse::success(
        "Cart opened",
        CartView { session_id, ..view },
        Some(Meta::count(0)),
    ))
}

pub async fn get_cart(
    state: &AppState,
    user: &AuthUser,
    session_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    ensure_retailer(user)?;
    let view = state
        .carts
        .with_ledger(session_id, &user.user_id, |ledger| {
            cart_view(session_id, ledger)
        })
        .await??;
    let meta = Meta::count(view.items.len());
    let message = if view.items.is_empty() {
        "Your cart is empty"
    } else {
        "OK"
    };
    Ok(ApiResponse::success(message, view, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    session_id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_retailer(user)?;
    let product = match find_product(state.store.as_ref(), &payload.product_id).await {
        Ok(product) => product,
        Err(AppError::NotFound) => {
            return Err(AppError::BadRequest("product not found".to_string()));
        }
        Err(err) => return Err(err),
    };

    let view = state
        .carts
        .with_ledger(session_id, &user.user_id, |ledger| {
            let entry_id = ledger.add_item(product);
            let view = cart_view(session_id, ledger);
            if view.is_err() {
                ledger.remove_entry(entry_id);
            } else {
                tracing::debug!(%session_id, entry_id = entry_id.0, "added to cart");
            }
            view
        })
        .await??;
    let meta = Meta::count(view.items.len());
    Ok(ApiResponse::success("Added to cart", view, Some(meta)))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    session_id: Uuid,
    position: usize,
) -> AppResult<ApiResponse<CartView>> {
    ensure_retailer(user)?;
    let (removed, view) = state
        .carts
        .with_ledger(session_id, &user.user_id, |ledger| {
            let removed = ledger.remove_item(position);
            cart_view(session_id, ledger).map(|view| (removed, view))
        })
        .await??;
    Ok(removal_response(removed, view))
}

pub async fn remove_entry(
    state: &AppState,
    user: &AuthUser,
    session_id: Uuid,
    entry_id: u64,
) -> AppResult<ApiResponse<CartView>> {
    ensure_retailer(user)?;
    let (removed, view) = state
        .carts
        .with_ledger(session_id, &user.user_id, |ledger| {
            let removed = ledger.remove_entry(EntryId(entry_id));
            cart_view(session_id, ledger).map(|view| (removed, view))
        })
        .await??;
    Ok(removal_response(removed, view))
}

fn removal_response(removed: Option<Product>, view: CartView) -> ApiResponse<CartView> {
    let message = match removed {
        Some(product) => format!("Removed {} from cart", product.name),
        None => "Nothing to remove".to_string(),
    };
    let meta = Meta::count(view.items.len());
    ApiResponse::success(message, view, Some(meta))
}

pub async fn transfer_cart(
    state: &AppState,
    user: &AuthUser,
    session_id: Uuid,
) -> AppResult<ApiResponse<CheckoutTransfer>> {
    ensure_retailer(user)?;
    let transfer = state
        .carts
        .take_with(session_id, &user.user_id, |ledger| {
            if ledger.is_empty() {
                return Err(CartError::Empty);
            }
            Ok(CheckoutTransfer {
                payload: ledger.transfer_to_checkout()?,
                item_count: ledger.len(),
                total: format_amount(ledger.compute_total()?),
            })
        })
        .await?;
    tracing::info!(%session_id, items = transfer.item_count, "cart handed to checkout");
    Ok(ApiResponse::success(
        "Proceed to payment",
        transfer,
        Some(Meta::empty()),
    ))
}

pub async fn receive_cart(
    state: &AppState,
    user: &AuthUser,
    payload: ReceiveCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_retailer(user)?;
    let ledger = CartLedger::from_transfer(&payload.payload)
        .inspect_err(|err| tracing::warn!(error = %err, "rejected cart payload"))?;
    let view = cart_view(Uuid::nil(), &ledger)
        .inspect_err(|err| tracing::warn!(error = %err, "rejected cart payload"))?;
    let session_id = state.carts.open(&user.user_id, ledger).await;
    let meta = Meta::count(view.items.len());
    Ok(ApiResponse::success(
        "Cart received",
        CartView { session_id, ..view },
        Some(meta),
    ))
}

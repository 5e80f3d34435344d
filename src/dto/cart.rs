use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub position: usize,
    pub entry_id: u64,
    pub product: Product,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub session_id: Uuid,
    pub items: Vec<CartLine>,
    /// Exact sum of item prices, two decimals.
    #[schema(example = "150.50")]
    pub total: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutTransfer {
    /// Serialized cart, to be handed to `POST /api/cart/receive`.
    pub payload: String,
    pub item_count: usize,
    pub total: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReceiveCartRequest {
    pub payload: String,
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    /// Decimal amount as text, e.g. `"50.5"`.
    #[schema(example = "50.5")]
    pub price: String,
    /// Image reference returned by the client's media picker.
    pub image: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

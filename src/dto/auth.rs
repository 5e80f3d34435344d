use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Destination, Role, UserAccount};

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// One of `retailer`, `wholesaler`, `admin`.
    #[schema(example = "retailer")]
    pub role: String,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserAccount,
    pub destination: Destination,
    /// Client route for `destination`.
    pub redirect_to: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, SignUpRequest},
        cart::{AddToCartRequest, CartLine, CartView, CheckoutTransfer, ReceiveCartRequest},
        products::{CreateProductRequest, ProductList},
    },
    models::{Destination, Product, Role, UserAccount},
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::sign_up,
        auth::login,
        products::list_products,
        products::get_product,
        products::create_product,
        cart::open_cart,
        cart::get_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::remove_entry,
        cart::transfer_cart,
        cart::receive_cart
    ),
    components(
        schemas(
            Role,
            Destination,
            UserAccount,
            Product,
            SignUpRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            ProductList,
            AddToCartRequest,
            CartLine,
            CartView,
            CheckoutTransfer,
            ReceiveCartRequest,
            params::Pagination,
            Meta,
            ApiResponse<UserAccount>,
            ApiResponse<LoginResponse>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<CheckoutTransfer>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Signup and role-aware login"),
        (name = "Products", description = "Wholesaler listings"),
        (name = "Cart", description = "Retailer cart sessions and checkout hand-off"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

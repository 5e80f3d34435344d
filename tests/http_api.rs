use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use bizkart_api::{config::AppConfig, routes::create_api_router, state::AppState};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let config = AppConfig {
        database_url: None,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        jwt_ttl_hours: 1,
        min_password_len: 5,
    };
    Router::new()
        .nest("/api", create_api_router())
        .with_state(AppState::in_memory(&config))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn sign_up_and_login(app: &Router, email: &str, role: &str) -> (String, Value) {
    let (status, _) = call(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": email, "password": "pw123", "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].clone();
    let token = data["token"].as_str().expect("token").to_string();
    (token, data)
}

async fn create_product(app: &Router, token: &str, name: &str, price: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/products",
        Some(token),
        Some(json!({ "name": name, "price": price, "image": "file:///tmp/p.jpg" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().expect("product id").to_string()
}

#[tokio::test]
async fn login_reports_role_and_destination() {
    let app = app();
    let (_, data) = sign_up_and_login(&app, "a@x.com", "wholesaler").await;
    assert_eq!(data["user"]["role"], "wholesaler");
    assert_eq!(data["destination"], "wholesaler_dashboard");
    assert_eq!(data["redirect_to"], "/dashboard/wholesaler");
}

#[tokio::test]
async fn auth_failures_share_one_message() {
    let app = app();
    sign_up_and_login(&app, "a@x.com", "retailer").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Login failed");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ghost@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Login failed");

    for payload in [
        json!({ "email": "a@x.com", "password": "pw123", "role": "retailer" }),
        json!({ "email": "b@x.com", "password": "pw123", "role": "guest" }),
        json!({ "email": "broken", "password": "pw123", "role": "retailer" }),
    ] {
        let (status, body) = call(&app, Method::POST, "/api/auth/signup", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Sign up failed");
    }
}

#[tokio::test]
async fn only_wholesalers_create_products() {
    let app = app();
    let (retailer, _) = sign_up_and_login(&app, "r@x.com", "retailer").await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/products",
        Some(&retailer),
        Some(json!({ "name": "Rice", "price": "10", "image": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn product_fields_are_validated() {
    let app = app();
    let (wholesaler, _) = sign_up_and_login(&app, "w@x.com", "wholesaler").await;

    for payload in [
        json!({ "name": "", "price": "10", "image": "x" }),
        json!({ "name": "Rice", "price": "", "image": "x" }),
        json!({ "name": "Rice", "price": "10", "image": " " }),
        json!({ "name": "Rice", "price": "ten", "image": "x" }),
        json!({ "name": "Rice", "price": "-1", "image": "x" }),
    ] {
        let (status, _) =
            call(&app, Method::POST, "/api/products", Some(&wholesaler), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn products_list_filters_by_owner() {
    let app = app();
    let (w1, w1_data) = sign_up_and_login(&app, "w1@x.com", "wholesaler").await;
    let (w2, _) = sign_up_and_login(&app, "w2@x.com", "wholesaler").await;
    create_product(&app, &w1, "Rice", "100").await;
    create_product(&app, &w1, "Dal", "80").await;
    create_product(&app, &w2, "Oil", "50.5").await;

    let (status, body) = call(&app, Method::GET, "/api/products", Some(&w2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["meta"]["total"], 3);

    let owner = w1_data["user"]["id"].as_str().unwrap();
    let uri = format!("/api/products?wholesaler_id={owner}&per_page=1");
    let (_, body) = call(&app, Method::GET, &uri, Some(&w2), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["total"], 2);

    let (_, body) = call(&app, Method::GET, "/api/products?q=oil", Some(&w1), None).await;
    assert_eq!(body["data"][0]["name"], "Oil");
    assert_eq!(body["data"][0]["price"], "50.5");
}

#[tokio::test]
async fn pages_past_the_end_are_empty() {
    let app = app();
    let (wholesaler, _) = sign_up_and_login(&app, "w@x.com", "wholesaler").await;
    create_product(&app, &wholesaler, "Rice", "100").await;

    let uri = format!("/api/products?page={}&per_page=100", u64::MAX);
    let (status, body) = call(&app, Method::GET, &uri, Some(&wholesaler), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["meta"]["total"], 1);
}

#[tokio::test]
async fn retailer_cart_flow_through_checkout_hand_off() {
    let app = app();
    let (wholesaler, _) = sign_up_and_login(&app, "w@x.com", "wholesaler").await;
    let rice = create_product(&app, &wholesaler, "Rice", "100").await;
    let oil = create_product(&app, &wholesaler, "Oil", "50.5").await;

    let (retailer, _) = sign_up_and_login(&app, "r@x.com", "retailer").await;
    let (status, body) = call(&app, Method::POST, "/api/cart", Some(&retailer), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let session = body["data"]["session_id"].as_str().unwrap().to_string();

    for product_id in [&rice, &oil] {
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/cart/{session}/items"),
            Some(&retailer),
            Some(json!({ "product_id": product_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/api/cart/{session}"),
        Some(&retailer),
        None,
    )
    .await;
    assert_eq!(body["data"]["total"], "150.50");
    assert_eq!(body["meta"]["total"], 2);

    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("/api/cart/{session}/items/0"),
        Some(&retailer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], "50.50");

    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("/api/cart/{session}/items/7"),
        Some(&retailer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Nothing to remove");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/cart/{session}/transfer"),
        Some(&retailer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["item_count"], 1);
    let payload = body["data"]["payload"].as_str().unwrap().to_string();

    // the dashboard session is gone after the hand-off
    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/cart/{session}"),
        Some(&retailer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/cart/receive",
        Some(&retailer),
        Some(json!({ "payload": payload })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(body["data"]["session_id"], session.as_str());
    assert_eq!(body["data"]["items"][0]["product"]["id"], oil.as_str());
    assert_eq!(body["data"]["total"], "50.50");
}

#[tokio::test]
async fn cart_sessions_are_private_and_retailer_only() {
    let app = app();
    let (alice, _) = sign_up_and_login(&app, "alice@x.com", "retailer").await;
    let (bob, _) = sign_up_and_login(&app, "bob@x.com", "retailer").await;
    let (admin, _) = sign_up_and_login(&app, "admin@x.com", "admin").await;

    let (_, body) = call(&app, Method::POST, "/api/cart", Some(&alice), None).await;
    let session = body["data"]["session_id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/cart/{session}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, "/api/cart", Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/cart/{session}/transfer"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "empty carts cannot be transferred");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/cart/receive",
        Some(&alice),
        Some(json!({ "payload": "[{\"id\":\"p\",\"name\":\"x\",\"price\":\"NaN\",\"image\":\"i\",\"wholesalerId\":\"w\"}]" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn adding_unknown_product_is_rejected() {
    let app = app();
    let (retailer, _) = sign_up_and_login(&app, "r@x.com", "retailer").await;
    let (_, body) = call(&app, Method::POST, "/api/cart", Some(&retailer), None).await;
    let session = body["data"]["session_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/cart/{session}/items"),
        Some(&retailer),
        Some(json!({ "product_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bad Request product not found");
}

#[tokio::test]
async fn cart_totals_out_of_range_are_rejected() {
    let app = app();
    let (wholesaler, _) = sign_up_and_login(&app, "w@x.com", "wholesaler").await;
    let huge = create_product(&app, &wholesaler, "Gold", "79228162514264337593543950335").await;
    let one = create_product(&app, &wholesaler, "Salt", "1").await;

    let (retailer, _) = sign_up_and_login(&app, "r@x.com", "retailer").await;
    let (_, body) = call(&app, Method::POST, "/api/cart", Some(&retailer), None).await;
    let session = body["data"]["session_id"].as_str().unwrap().to_string();
    let items = format!("/api/cart/{session}/items");

    let (status, _) = call(
        &app,
        Method::POST,
        &items,
        Some(&retailer),
        Some(json!({ "product_id": huge })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        Method::POST,
        &items,
        Some(&retailer),
        Some(json!({ "product_id": one })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the rejected item was not kept
    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/api/cart/{session}"),
        Some(&retailer),
        None,
    )
    .await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let product = |id: &str, price: &str| {
        json!({ "id": id, "name": "x", "price": price, "image": "i", "wholesalerId": "w" })
    };
    let payload = json!([
        product("a", "79228162514264337593543950335"),
        product("b", "1"),
    ])
    .to_string();
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/cart/receive",
        Some(&retailer),
        Some(json!({ "payload": payload })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

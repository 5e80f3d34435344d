use anyhow::Context;
use bizkart_api::{
    backend::IdentityError,
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::products::CreateProductRequest,
    middleware::auth::AuthUser,
    models::{Role, UserAccount},
    services::{auth_service::AuthError, product_service},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set to seed; the in-memory backend does not persist")?;

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let state = AppState::postgres(&config, orm);

    ensure_account(&state, "admin@example.com", "admin123", Role::Admin).await?;
    ensure_account(&state, "retailer@example.com", "retailer123", Role::Retailer).await?;
    let wholesaler =
        ensure_account(&state, "wholesaler@example.com", "wholesaler123", Role::Wholesaler)
            .await?;
    seed_products(&state, &wholesaler).await?;

    println!("Seed completed. Wholesaler ID: {}", wholesaler.id);
    Ok(())
}

async fn ensure_account(
    state: &AppState,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<UserAccount> {
    let account = match state.gateway.sign_up(email, password, role).await {
        Ok(account) => account,
        Err(AuthError::Credential(IdentityError::EmailAlreadyInUse)) => {
            state.gateway.login(email, password).await?
        }
        Err(err) => return Err(err.into()),
    };
    println!("Ensured user {} (role={})", account.email, account.role);
    Ok(account)
}

async fn seed_products(state: &AppState, wholesaler: &UserAccount) -> anyhow::Result<()> {
    let existing = state
        .store
        .list_documents(product_service::PRODUCTS_COLLECTION)
        .await?;
    if !existing.is_empty() {
        println!("Products already present, skipping");
        return Ok(());
    }

    let user = AuthUser {
        user_id: wholesaler.id.clone(),
        email: wholesaler.email.clone(),
        role: wholesaler.role,
    };
    let products = [
        ("Basmati Rice 25kg", "1850", "https://picsum.photos/seed/rice/400/300"),
        ("Sunflower Oil 15L", "2100.50", "https://picsum.photos/seed/oil/400/300"),
        ("Toor Dal 10kg", "1320", "https://picsum.photos/seed/dal/400/300"),
        ("Sugar 50kg", "2250", "https://picsum.photos/seed/sugar/400/300"),
    ];

    for (name, price, image) in products {
        product_service::create_product(
            state,
            &user,
            CreateProductRequest {
                name: name.to_string(),
                price: price.to_string(),
                image: image.to_string(),
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!("seeding {name}: {e}"))?;
    }

    println!("Seeded products");
    Ok(())
}

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url).await?;

    let client_id = ensure_user(&pool, "client@example.com", "client123", "client").await?;
    let merchant_id = ensure_user(&pool, "merchant@example.com", "merchant123", "merchant").await?;
    let driver_id = ensure_user(&pool, "driver@example.com", "driver123", "driver").await?;

    let shop_id = ensure_shop(&pool, merchant_id).await?;
    let category_ids = seed_categories(&pool).await?;
    seed_products(&pool, shop_id, &category_ids).await?;
    seed_client_defaults(&pool, client_id).await?;

    println!(
        "Seed completed. Client: {client_id}, Merchant: {merchant_id}, Driver: {driver_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    user_type: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let full_name = match user_type {
        "merchant" => "Demo Merchant",
        "driver" => "Demo Driver",
        _ => "Demo Client",
    };

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO profiles (id, email, password_hash, full_name, user_type)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET user_type = EXCLUDED.user_type
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(user_type)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM profiles WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (type={user_type})");
    Ok(user_id)
}

async fn ensure_shop(pool: &sqlx::PgPool, owner_id: Uuid) -> anyhow::Result<Uuid> {
    sqlx::query(
        r#"
        INSERT INTO shops (id, owner_id, name, description, address, phone)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (owner_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind("Boutique du Grand Marché")
    .bind("Local goods, fair prices")
    .bind("Grand Marché, Lomé")
    .bind("+228 90 00 00 00")
    .execute(pool)
    .await?;

    let (shop_id,): (Uuid,) = sqlx::query_as("SELECT id FROM shops WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    println!("Ensured shop {shop_id}");
    Ok(shop_id)
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<Vec<Uuid>> {
    let names = ["Alimentation", "Artisanat", "Mode", "Électronique"];

    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .execute(pool)
        .await?;

        let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await?;
        ids.push(id);
    }

    println!("Seeded categories");
    Ok(ids)
}

async fn seed_products(
    pool: &sqlx::PgPool,
    shop_id: Uuid,
    category_ids: &[Uuid],
) -> anyhow::Result<()> {
    let products = [
        ("Sac de gari 5kg", "Gari frais du marché", 3500_i64, 40, 0),
        ("Panier tressé", "Panier artisanal en osier", 6000, 15, 1),
        ("Pagne wax 6 yards", "Tissu wax authentique", 12000, 25, 2),
        ("Lampe solaire", "Lampe rechargeable", 8500, 30, 3),
    ];

    for (name, desc, price, stock, cat) in products {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM products WHERE shop_id = $1 AND name = $2")
                .bind(shop_id)
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO products (id, shop_id, category_id, name, description, price, stock_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(shop_id)
        .bind(category_ids[cat])
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_client_defaults(pool: &sqlx::PgPool, client_id: Uuid) -> anyhow::Result<()> {
    let has_address: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM user_addresses WHERE user_id = $1 LIMIT 1")
            .bind(client_id)
            .fetch_optional(pool)
            .await?;
    if has_address.is_none() {
        sqlx::query(
            r#"
            INSERT INTO user_addresses (id, user_id, label, address, is_default)
            VALUES ($1, $2, 'Maison', 'Quartier Tokoin, Lomé', TRUE)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(client_id)
        .execute(pool)
        .await?;
    }

    let has_method: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM user_payment_methods WHERE user_id = $1 LIMIT 1")
            .bind(client_id)
            .fetch_optional(pool)
            .await?;
    if has_method.is_none() {
        sqlx::query(
            r#"
            INSERT INTO user_payment_methods (id, user_id, method_type, account_number, is_default)
            VALUES ($1, $2, 'tmoney', '+228 91 11 11 11', TRUE)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(client_id)
        .execute(pool)
        .await?;
    }

    println!("Seeded client defaults");
    Ok(())
}

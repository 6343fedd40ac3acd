use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use agrimarket_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    models::Role,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url).await?;

    let owner_id = ensure_user(&pool, "owner@example.com", "owner123", Role::Farmer).await?;
    let renter_id = ensure_user(&pool, "renter@example.com", "renter123", Role::Farmer).await?;
    let buyer_id = ensure_user(&pool, "buyer@example.com", "buyer123", Role::Buyer).await?;

    seed_equipment(&pool, owner_id).await?;
    seed_products(&pool, owner_id).await?;

    println!("Seed completed. Owner: {owner_id}, Renter: {renter_id}, Buyer: {buyer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(|(id,)| id)
        .ok_or_else(|| anyhow::anyhow!("failed to upsert user {email}"))
}

async fn seed_equipment(pool: &sqlx::PgPool, owner_id: Uuid) -> anyhow::Result<()> {
    let items = [
        ("Kubota M7060 tractor", "tractor", 18_000_i64, Some(50_000_i64), 1, Some(30)),
        ("John Deere S680 harvester", "harvester", 45_000, Some(120_000), 2, Some(14)),
        ("Hardi Commander sprayer", "sprayer", 9_500, None, 1, None),
    ];

    for (name, equipment_type, daily_rate, deposit, min_days, max_days) in items {
        sqlx::query(
            r#"
            INSERT INTO equipment
                (id, owner_id, name, equipment_type, daily_rate, security_deposit,
                 min_rental_days, max_rental_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .bind(equipment_type)
        .bind(daily_rate)
        .bind(deposit)
        .bind(min_days)
        .bind(max_days)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    let items = [
        ("Winter wheat", "grains", 2_500_i64, "quintal", 120),
        ("Gala apples", "fruits", 180, "kg", 800),
        ("Raw milk", "dairy", 95, "litre", 400),
    ];

    for (name, category, price, unit, quantity) in items {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, name, category, price, unit, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(name)
        .bind(category)
        .bind(price)
        .bind(unit)
        .bind(quantity)
        .execute(pool)
        .await?;
    }

    Ok(())
}

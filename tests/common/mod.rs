#![allow(dead_code)]

use agrimarket_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    entity::{equipment::ActiveModel as EquipmentActive, users::ActiveModel as UserActive},
    middleware::auth::AuthUser,
    models::Role,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// Connect and apply migrations. Returns None when no database is
/// configured, letting callers skip instead of fail.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    Ok(Some(AppState { pool, orm }))
}

/// Each test uses emails unique to it; deleting the email first clears any
/// leftovers from earlier runs (cascades take the user's equipment, products,
/// rentals and orders with it) without touching other tests' rows.
pub async fn create_user(state: &AppState, role: Role, email: &str) -> anyhow::Result<AuthUser> {
    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(&state.pool)
        .await?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.as_str().into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_equipment(
    state: &AppState,
    owner: &AuthUser,
    name: &str,
    daily_rate: i64,
) -> anyhow::Result<Uuid> {
    let equipment = EquipmentActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner.user_id),
        name: Set(name.to_string()),
        description: Set(None),
        equipment_type: Set("tractor".into()),
        daily_rate: Set(daily_rate),
        security_deposit: Set(None),
        status: Set("available".into()),
        min_rental_days: Set(1),
        max_rental_days: Set(Some(60)),
        delivery_available: Set(false),
        location: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(equipment.id)
}

mod common;

use agrimarket_api::{
    dto::orders::CreateOrderRequest,
    entity::{Products, products::ActiveModel as ProductActive},
    error::AppError,
    models::{OrderStatus, PaymentStatus, Role},
    services::order_service,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use common::{create_user, setup_state};
use agrimarket_api::middleware::auth::AuthUser;
use agrimarket_api::state::AppState;

async fn create_product(
    state: &AppState,
    seller: &AuthUser,
    name: &str,
    price: i64,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller.user_id),
        name: Set(name.to_string()),
        description: Set(None),
        category: Set("grains".into()),
        price: Set(price),
        unit: Set("kg".into()),
        quantity: Set(quantity),
        status: Set("available".into()),
        location: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

fn order_request(product_id: Uuid, quantity: i32) -> CreateOrderRequest {
    CreateOrderRequest {
        product_id,
        quantity,
        delivery_address: Some("Farm road 1".into()),
        special_instructions: None,
    }
}

// Place -> confirm -> ship -> deliver, with role checks at every step and
// terminal states rejecting further transitions.
#[tokio::test]
async fn order_lifecycle_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, Role::Farmer, "seller@example.com").await?;
    let buyer = create_user(&state, Role::Buyer, "buyer@example.com").await?;
    let product_id = create_product(&state, &seller, "Wheat", 5, 25).await?;

    // Total is computed from the catalog price, 10 * 5 = 50.
    let order = order_service::create_order(&state, &buyer, order_request(product_id, 10))
        .await?
        .data
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.seller_id, seller.user_id);
    assert_eq!(order.unit_price, 5);
    assert_eq!(order.total_amount, 50);

    // Ordered quantity leaves the catalog.
    let product = Products::find_by_id(product_id).one(&state.orm).await?.unwrap();
    assert_eq!(product.quantity, 15);

    // Buyer cannot confirm their own order.
    let err = order_service::confirm_order(&state, &buyer, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    let confirmed = order_service::confirm_order(&state, &seller, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert_eq!(confirmed.payment_status, PaymentStatus::Paid);

    // Shipping before confirmation or by the buyer is rejected.
    let err = order_service::mark_shipped(&state, &buyer, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    let shipped = order_service::mark_shipped(&state, &seller, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    // Only the buyer takes delivery.
    let err = order_service::mark_delivered(&state, &seller, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    let delivered = order_service::mark_delivered(&state, &buyer, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    // Delivered is terminal.
    let err = order_service::cancel_order(&state, &buyer, order.id)
        .await
        .unwrap_err();
    match err {
        AppError::InvalidState { op, current, .. } => {
            assert_eq!(op, "cancel");
            assert_eq!(current, "delivered");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn order_cancel_restores_catalog() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, Role::Farmer, "seller2@example.com").await?;
    let buyer = create_user(&state, Role::Buyer, "buyer2@example.com").await?;
    let product_id = create_product(&state, &seller, "Apples", 180, 10).await?;

    // Buying everything marks the product sold.
    let order = order_service::create_order(&state, &buyer, order_request(product_id, 10))
        .await?
        .data
        .unwrap();
    let product = Products::find_by_id(product_id).one(&state.orm).await?.unwrap();
    assert_eq!(product.quantity, 0);
    assert_eq!(product.status, "sold");

    // A second buyer cannot order a sold-out product.
    let rival = create_user(&state, Role::Buyer, "buyer2b@example.com").await?;
    let err = order_service::create_order(&state, &rival, order_request(product_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");

    // Seller-side cancel restores the quantity and availability.
    let cancelled = order_service::cancel_order(&state, &seller, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let product = Products::find_by_id(product_id).one(&state.orm).await?.unwrap();
    assert_eq!(product.quantity, 10);
    assert_eq!(product.status, "available");

    Ok(())
}

#[tokio::test]
async fn order_guards() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, Role::Farmer, "seller3@example.com").await?;
    let farmer = create_user(&state, Role::Farmer, "farmer3@example.com").await?;
    let product_id = create_product(&state, &seller, "Milk", 95, 40).await?;

    // Only buyers place orders.
    let err = order_service::create_order(&state, &farmer, order_request(product_id, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    // A seller cannot order their own product.
    let trader = create_user(&state, Role::Buyer, "trader3@example.com").await?;
    let own_product = create_product(&state, &trader, "Honey", 700, 5).await?;
    let err = order_service::create_order(&state, &trader, order_request(own_product, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    // Quantity must be positive and within stock.
    let buyer = create_user(&state, Role::Buyer, "buyer3b@example.com").await?;
    let err = order_service::create_order(&state, &buyer, order_request(product_id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    let err = order_service::create_order(&state, &buyer, order_request(product_id, 41))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    Ok(())
}

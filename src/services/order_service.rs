//! Order lifecycle engine for produce sales. Parallel in structure to the
//! rental engine; the product row plays the part the equipment row does
//! there, locked for the duration of every transition that touches it.

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CreateOrderRequest, OrderList},
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    entity::products::{
        ActiveModel as ProductActive, Entity as Products, Model as ProductModel,
    },
    error::{AppError, AppResult},
    lifecycle::order,
    middleware::auth::{AuthUser, ensure_buyer},
    models::{Order, OrderStatus, PaymentStatus, ProductStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_buyer(user, "place an order")?;

    if payload.quantity <= 0 {
        return Err(AppError::Validation("quantity must be positive".into()));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if product.seller_id == user.user_id {
        return Err(AppError::Forbidden(
            "cannot order your own product".into(),
        ));
    }

    let product_status = parse_product_status(&product)?;
    if product_status != ProductStatus::Available {
        return Err(AppError::Conflict(format!(
            "product is {product_status} and cannot be ordered"
        )));
    }
    if payload.quantity > product.quantity {
        return Err(AppError::Validation(format!(
            "only {} {} available",
            product.quantity, product.unit
        )));
    }

    // Seller and pricing come from the product row; client-submitted
    // amounts are ignored.
    let unit_price = product.price;
    let total_amount = unit_price * payload.quantity as i64;

    let inserted = OrderActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        buyer_id: Set(user.user_id),
        seller_id: Set(product.seller_id),
        quantity: Set(payload.quantity),
        unit_price: Set(unit_price),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending.as_str().into()),
        payment_status: Set(PaymentStatus::Pending.as_str().into()),
        delivery_address: Set(payload.delivery_address),
        special_instructions: Set(payload.special_instructions),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let remaining = product.quantity - payload.quantity;
    let mut product_active: ProductActive = product.into();
    product_active.quantity = Set(remaining);
    if remaining == 0 {
        product_active.status = Set(ProductStatus::Sold.as_str().into());
    }
    product_active.updated_at = Set(Utc::now().into());
    product_active.update(&txn).await?;

    txn.commit().await?;

    audit(
        state,
        user,
        "order_placed",
        serde_json::json!({ "order_id": inserted.id, "product_id": inserted.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        order_from_entity(inserted)?,
        Some(Meta::empty()),
    ))
}

pub async fn confirm_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order_row = lock_order(&txn, id).await?;

    if order_row.seller_id != user.user_id {
        return Err(AppError::Forbidden(
            "only the seller can confirm an order".into(),
        ));
    }

    let next = order::CONFIRM.apply(parse_order_status(&order_row)?)?;

    let mut active: OrderActive = order_row.into();
    active.status = Set(next.as_str().into());
    active.payment_status = Set(PaymentStatus::Paid.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order_row = active.update(&txn).await?;

    txn.commit().await?;

    audit(
        state,
        user,
        "order_confirmed",
        serde_json::json!({ "order_id": order_row.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order confirmed",
        order_from_entity(order_row)?,
        Some(Meta::empty()),
    ))
}

pub async fn mark_shipped(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order_row = lock_order(&txn, id).await?;

    if order_row.seller_id != user.user_id {
        return Err(AppError::Forbidden(
            "only the seller can mark an order shipped".into(),
        ));
    }

    let next = order::SHIP.apply(parse_order_status(&order_row)?)?;

    let mut active: OrderActive = order_row.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order_row = active.update(&txn).await?;

    txn.commit().await?;

    audit(
        state,
        user,
        "order_shipped",
        serde_json::json!({ "order_id": order_row.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order marked as shipped",
        order_from_entity(order_row)?,
        Some(Meta::empty()),
    ))
}

pub async fn mark_delivered(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order_row = lock_order(&txn, id).await?;

    if order_row.buyer_id != user.user_id {
        return Err(AppError::Forbidden(
            "only the buyer can mark an order delivered".into(),
        ));
    }

    let next = order::DELIVER.apply(parse_order_status(&order_row)?)?;

    let mut active: OrderActive = order_row.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order_row = active.update(&txn).await?;

    txn.commit().await?;

    audit(
        state,
        user,
        "order_delivered",
        serde_json::json!({ "order_id": order_row.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order marked as delivered",
        order_from_entity(order_row)?,
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order_row = lock_order(&txn, id).await?;

    if user.user_id != order_row.buyer_id && user.user_id != order_row.seller_id {
        return Err(AppError::Forbidden(
            "only the buyer or the seller can cancel an order".into(),
        ));
    }

    let next = order::CANCEL.apply(parse_order_status(&order_row)?)?;
    let payment = parse_order_payment(&order_row)?;

    // Return the ordered quantity to the catalog.
    let product = Products::find_by_id(order_row.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    if let Some(product) = product {
        let restored = product.quantity + order_row.quantity;
        let was_sold = parse_product_status(&product)? == ProductStatus::Sold;
        let mut product_active: ProductActive = product.into();
        product_active.quantity = Set(restored);
        if was_sold {
            product_active.status = Set(ProductStatus::Available.as_str().into());
        }
        product_active.updated_at = Set(Utc::now().into());
        product_active.update(&txn).await?;
    }

    let mut active: OrderActive = order_row.into();
    active.status = Set(next.as_str().into());
    if payment == PaymentStatus::Paid {
        active.payment_status = Set(PaymentStatus::Refunded.as_str().into());
    }
    active.updated_at = Set(Utc::now().into());
    let order_row = active.update(&txn).await?;

    txn.commit().await?;

    audit(
        state,
        user,
        "order_cancelled",
        serde_json::json!({ "order_id": order_row.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        order_from_entity(order_row)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::BuyerId.eq(user.user_id));
    list_orders(state, condition, query).await
}

pub async fn list_my_sales(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::SellerId.eq(user.user_id));
    list_orders(state, condition, query).await
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order_row = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if user.user_id != order_row.buyer_id && user.user_id != order_row.seller_id {
        return Err(AppError::Forbidden(
            "order is visible to its buyer and seller only".into(),
        ));
    }

    Ok(ApiResponse::success(
        "Order",
        order_from_entity(order_row)?,
        Some(Meta::empty()),
    ))
}

async fn list_orders(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

async fn lock_order(txn: &DatabaseTransaction, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn audit(state: &AppState, user: &AuthUser, action: &str, metadata: serde_json::Value) {
    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        action,
        Some("orders"),
        Some(metadata),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
}

fn parse_order_status(model: &OrderModel) -> AppResult<OrderStatus> {
    model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

fn parse_order_payment(model: &OrderModel) -> AppResult<PaymentStatus> {
    model
        .payment_status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

fn parse_product_status(model: &ProductModel) -> AppResult<ProductStatus> {
    model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

pub fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    let payment_status = model
        .payment_status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(Order {
        id: model.id,
        product_id: model.product_id,
        buyer_id: model.buyer_id,
        seller_id: model.seller_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_amount: model.total_amount,
        status,
        payment_status,
        delivery_address: model.delivery_address,
        special_instructions: model.special_instructions,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

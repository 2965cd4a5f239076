//! Order placement, lookup and lifecycle transition endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    Address, LineItem, Money, Order, OrderId, OrderItem, OrderService, PlaceOrder, PlacedOrder,
    ProductId, Transition, TransitionFields, UserId,
};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub order_service: OrderService<S>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: u32,
    pub currency: String,
    pub address: Address,
    pub email: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: u32,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub cost_cents: Option<i64>,
}

#[derive(Deserialize)]
pub struct PayRequest {
    pub payment_method: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub user_id: u32,
    pub status: String,
    pub currency: String,
    pub total_cents: i64,
    pub total: String,
    pub item_count: u32,
    pub email: String,
    pub address: Address,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItemResponse>>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub order_item_id: i64,
    pub product_id: u32,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub cost_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            user_id: order.user_id.get(),
            status: order.status.to_string(),
            currency: order.currency,
            total_cents: order.total_amount.cents(),
            total: order.total_amount.to_string(),
            item_count: order.item_count,
            email: order.email,
            address: order.address,
            payment_method: order.payment_method,
            created_at: order.created_at,
            updated_at: order.updated_at,
            paid_at: order.paid_at,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            items: None,
        }
    }
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            order_item_id: item.order_item_id,
            product_id: item.product_id.get(),
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            cost_cents: item.cost.cents(),
        }
    }
}

impl From<PlacedOrder> for OrderResponse {
    fn from(placed: PlacedOrder) -> Self {
        let mut response = OrderResponse::from(placed.order);
        response.items = Some(placed.items.into_iter().map(Into::into).collect());
        response
    }
}

// -- Handlers --

/// POST /orders: place a new order with its items.
#[tracing::instrument(skip(state, req), fields(user_id = req.user_id))]
pub async fn create<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let items = req
        .items
        .into_iter()
        .map(|item| {
            let line = LineItem::new(
                ProductId::new(item.product_id),
                item.product_name,
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            );
            match item.cost_cents {
                Some(cost) => line.with_cost(Money::from_cents(cost)),
                None => line,
            }
        })
        .collect();

    let placed = state
        .order_service
        .place_order(PlaceOrder {
            user_id: UserId::new(req.user_id),
            currency: req.currency,
            address: req.address,
            email: req.email,
            items,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(placed.into())))
}

/// GET /orders/{id}: load an order with its items.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let placed = state.order_service.get_order(&OrderId::new(id)).await?;
    Ok(Json(placed.into()))
}

/// POST /orders/{id}/pay: record payment of a pending order.
#[tracing::instrument(skip(state, req))]
pub async fn pay<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<PayRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    apply(
        &state,
        id,
        Transition::Pay,
        TransitionFields::paid_with(req.payment_method),
    )
    .await
}

/// POST /orders/{id}/ship
#[tracing::instrument(skip(state))]
pub async fn ship<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    apply(&state, id, Transition::Ship, TransitionFields::none()).await
}

/// POST /orders/{id}/deliver
#[tracing::instrument(skip(state))]
pub async fn deliver<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    apply(&state, id, Transition::Deliver, TransitionFields::none()).await
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    apply(&state, id, Transition::Cancel, TransitionFields::none()).await
}

/// POST /orders/{id}/refund
#[tracing::instrument(skip(state))]
pub async fn refund<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    apply(&state, id, Transition::Refund, TransitionFields::none()).await
}

/// Runs a transition and returns the order as it now stands.
async fn apply<S: OrderStore + Clone + 'static>(
    state: &AppState<S>,
    id: String,
    transition: Transition,
    fields: TransitionFields,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::new(id);
    state
        .order_service
        .transition(&order_id, transition.name(), fields)
        .await?;

    let placed = state.order_service.get_order(&order_id).await?;
    Ok(Json(placed.into()))
}

//! Per-user order listing.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::{OrderFilter, OrderStatus, UserId};
use order_store::OrderStore;
use serde::Deserialize;

use super::orders::{AppState, OrderResponse};
use crate::error::ApiError;

/// Largest page a client may request.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /users/{user_id}/orders: list a user's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_orders<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<u32>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let mut filter = OrderFilter::for_user(UserId::new(user_id))
        .limit(query.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE))
        .offset(query.offset.unwrap_or(0));

    if let Some(status) = query.status {
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        filter = filter.statuses(vec![status]);
    }

    let orders = state.order_service.list_orders(filter).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client, rejected before reaching the domain.
    BadRequest(String),
    /// Order lifecycle error.
    Order(OrderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::Order(err) => order_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        OrderError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        OrderError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        OrderError::InvalidStateTransition { current, .. } => {
            return (
                StatusCode::CONFLICT,
                serde_json::json!({ "error": err.to_string(), "current_status": current }),
            );
        }
        OrderError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        OrderError::InvalidTransition(_)
        | OrderError::CreationFailed(_)
        | OrderError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "order request failed");
    }

    (status, serde_json::json!({ "error": err.to_string() }))
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use domain::{OrderId, OrderStatus, Transition};
    use order_store::StoreError;

    fn status_of(err: OrderError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            status_of(OrderError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(OrderError::OrderNotFound(OrderId::new("o"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OrderError::InvalidStateTransition {
                order_id: OrderId::new("o"),
                current: OrderStatus::Shipped,
                transition: Transition::Cancel,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OrderError::InvalidTransition("reopen".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(OrderError::StoreUnavailable(StoreError::Unavailable(
                "down".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(OrderError::Timeout {
                operation: "list orders",
                after: std::time::Duration::from_secs(5),
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn bad_request_is_400() {
        let response = ApiError::BadRequest("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

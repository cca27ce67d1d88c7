//! Per-request correlation IDs.
//!
//! A task-local `RequestId` is scoped around every request by middleware and
//! picked up by error responses and log lines. Task-local (not process-wide)
//! so concurrent requests cannot observe each other's IDs.

use std::cell::RefCell;
use std::future::Future;

use axum::{http::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID tracking information
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        RequestId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<RequestId>>;
}

pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_ID
        .scope(RefCell::new(Some(request_id)), future)
        .await
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

/// Middleware: honor an inbound `x-request-id`, otherwise mint one, scope it
/// around the handler and echo it on the response.
pub async fn request_id_middleware(
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(RequestId::new)
        .unwrap_or_default();

    let header_value = request_id.as_str().to_string();
    let mut response = scope_request_id(request_id, next.run(request)).await;

    if let Ok(value) = header_value.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scoped_id_is_visible_inside_the_future() {
        let seen = scope_request_id(RequestId::new("req-1"), async {
            current_request_id().map(|rid| rid.as_str().to_string())
        })
        .await;
        assert_eq!(seen.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn no_id_outside_scope() {
        assert!(current_request_id().is_none());
    }
}

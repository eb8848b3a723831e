//! Axum route handlers for the Responses API

use axon_core::{HttpError, RequestContext};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing};
use futures_util::StreamExt;

use crate::error::ResponsesError;
use crate::gateway::{Gateway, ResponseEventStream};
use crate::protocol::ResponsesRequest;

/// Build the router for `/v1/responses`
pub fn responses_router(gateway: Gateway) -> Router {
    Router::new()
        .route("/v1/responses", routing::post(create_response))
        .route("/v1/responses/{id}", routing::get(get_response).delete(delete_response))
        .route("/v1/responses/{id}/input_items", routing::get(list_input_items))
        .with_state(gateway)
}

/// Handle `POST /v1/responses`
async fn create_response(
    State(gateway): State<Gateway>,
    Extension(context): Extension<RequestContext>,
    body: Result<Json<ResponsesRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected responses request body");
            return error_response(&ResponsesError::invalid(rejection.body_text()));
        }
    };

    if request.is_stream() {
        match gateway.respond_stream(request, context).await {
            Ok(events) => stream_response(events).into_response(),
            Err(e) => error_response(&e),
        }
    } else {
        match gateway.respond(request, &context).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => error_response(&e),
        }
    }
}

/// Handle `GET /v1/responses/{id}`
async fn get_response(State(gateway): State<Gateway>, Path(id): Path<String>) -> Response {
    let Some(store) = gateway.store() else {
        return error_response(&ResponsesError::StoreDisabled);
    };

    match store.get(&id).await {
        Some(response) => Json(response).into_response(),
        None => error_response(&ResponsesError::NotFound(id)),
    }
}

/// Handle `DELETE /v1/responses/{id}`
async fn delete_response(State(gateway): State<Gateway>, Path(id): Path<String>) -> Response {
    let Some(store) = gateway.store() else {
        return error_response(&ResponsesError::StoreDisabled);
    };

    if store.delete(&id).await {
        Json(serde_json::json!({
            "id": id,
            "object": "response.deleted",
            "deleted": true,
        }))
        .into_response()
    } else {
        error_response(&ResponsesError::NotFound(id))
    }
}

/// Handle `GET /v1/responses/{id}/input_items`
async fn list_input_items(State(gateway): State<Gateway>, Path(id): Path<String>) -> Response {
    let Some(store) = gateway.store() else {
        return error_response(&ResponsesError::StoreDisabled);
    };

    match store.input_items(&id).await {
        Some(items) => Json(serde_json::json!({
            "object": "list",
            "data": items,
        }))
        .into_response(),
        None => error_response(&ResponsesError::NotFound(id)),
    }
}

/// Frame gateway events as SSE, naming each event after its type
fn stream_response(
    events: ResponseEventStream,
) -> Sse<impl futures_util::Stream<Item = Result<Event, axum::Error>>> {
    let events = events.map(|event| Event::default().event(event.kind.name()).json_data(&event));

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Convert a gateway error to an `OpenAI`-style JSON error response
fn error_response(error: &ResponsesError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::warn!(error = %error, "response request failed");
    }

    let body = serde_json::json!({
        "error": {
            "message": error.client_message(),
            "type": error.error_type(),
            "code": error.error_code(),
        }
    });

    (status, Json(body)).into_response()
}

use axon_core::RequestContext;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Middleware that constructs a `RequestContext` from the incoming request
///
/// The context carries the request headers and any bearer key, which the
/// upstream provider may forward.
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let context = RequestContext::from_parts(parts.clone());

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);

    next.run(request).await
}

//! Request dispatch against the live mount table.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;

use crate::observability::metrics;
use crate::routing::table::{MountTable, RootHandler, RootRoute, Route, RouteTarget};

/// Fallback handler installed by [`crate::MountRouter::service`].
pub async fn dispatch(State(table): State<Arc<MountTable>>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let snapshot = table.load();
    let path = request.uri().path().to_owned();

    let (label, response) = match snapshot.route(&path) {
        Route::Mount(mount) => (mount.target.label(), serve(&mount.target, request).await),
        Route::Root(root) => ("root", serve_root(root, request).await),
    };

    tracing::debug!(path = %path, target = label, status = %response.status(), "Dispatched");
    metrics::record_request(label, response.status().as_u16(), start);
    response
}

async fn serve(target: &RouteTarget, request: Request<Body>) -> Response {
    match target {
        RouteTarget::Proxy(proxy) => proxy.forward(request).await,
        RouteTarget::Handler { handler, .. } => {
            let result: Result<Response, Infallible> = handler.clone().oneshot(request).await;
            result.unwrap_or_else(|never| match never {})
        }
        RouteTarget::NotFound => not_found(),
    }
}

async fn serve_root(root: &RootRoute, request: Request<Body>) -> Response {
    if let Some(redirect) = root.jail.redirect(request.headers(), request.uri()) {
        return redirect;
    }

    match &root.handler {
        RootHandler::Target(target) => serve(target, request).await,
        RootHandler::Listing(text) if request.uri().path() == "/" => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text.to_string(),
        )
            .into_response(),
        RootHandler::Listing(_) => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}

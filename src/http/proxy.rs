//! Reverse proxy to a mounted origin.
//!
//! # Responsibilities
//! - Rewrite the request URI from mount space into origin space
//! - Strip hop-by-hop headers in both directions
//! - Stream request and response bodies through
//!
//! # Design Decisions
//! - One shared hyper client per router, cloned into every proxy
//! - Upstream requests always go out as HTTP/1.1
//! - Upstream failures map to 502; timeouts belong to the host server

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, uri::InvalidUri, HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::routing::path::{merge_query, single_joining_slash, strip_mount};

/// HTTP client used for all proxied requests.
pub type ProxyClient = Client<HttpConnector, Body>;

pub fn new_client() -> ProxyClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Forwards requests under one mount point to one origin.
#[derive(Clone)]
pub struct ReverseProxy {
    origin: Url,
    authority: String,
    mount_point: String,
    client: ProxyClient,
}

impl ReverseProxy {
    pub fn new(origin: Url, mount_point: impl Into<String>, client: ProxyClient) -> Self {
        let host = origin.host_str().unwrap_or_default();
        let authority = match origin.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Self {
            origin,
            authority,
            mount_point: mount_point.into(),
            client,
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    /// Map a request URI under the mount point onto the origin.
    pub fn rewrite_uri(&self, uri: &Uri) -> Result<Uri, InvalidUri> {
        let remainder = strip_mount(uri.path(), &self.mount_point);
        let path = single_joining_slash(self.origin.path(), remainder);
        let query = merge_query(
            self.origin.query().unwrap_or_default(),
            uri.query().unwrap_or_default(),
        );

        let mut target = format!("{}://{}{}", self.origin.scheme(), self.authority, path);
        if !query.is_empty() {
            target.push('?');
            target.push_str(&query);
        }
        target.parse()
    }

    /// Forward `request` to the origin and relay its response.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();

        let uri = match self.rewrite_uri(&parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), error = %e, "Cannot map request onto origin");
                return (StatusCode::BAD_GATEWAY, "Bad gateway").into_response();
            }
        };

        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);
        if let Some(original_host) = parts.headers.get(header::HOST) {
            headers.insert(X_FORWARDED_HOST, original_host.clone());
        }
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            append_forwarded_for(&mut headers, addr);
        }
        if let Ok(host) = HeaderValue::from_str(&self.authority) {
            headers.insert(header::HOST, host);
        }

        let mut upstream = Request::builder()
            .method(parts.method.clone())
            .version(Version::HTTP_11)
            .uri(uri.clone());
        if let Some(h) = upstream.headers_mut() {
            *h = headers;
        }
        let upstream = match upstream.body(body) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build upstream request");
                return (StatusCode::BAD_GATEWAY, "Bad gateway").into_response();
            }
        };

        tracing::debug!(
            mount = %self.mount_point,
            method = %parts.method,
            upstream = %uri,
            "Proxying request"
        );

        match self.client.request(upstream).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(mount = %self.mount_point, upstream = %uri, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

impl std::fmt::Debug for ReverseProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseProxy")
            .field("origin", &self.origin.as_str())
            .field("mount_point", &self.mount_point)
            .finish()
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by Connection are hop-by-hop as well.
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in HOP_BY_HOP.iter().copied().chain(listed.iter().map(String::as_str)) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: &SocketAddr) {
    let client_ip = addr.ip().to_string();
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, client_ip),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

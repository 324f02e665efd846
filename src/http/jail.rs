//! Referer-based redirect back into a proxied mount.
//!
//! A proxied origin that emits absolute links (`/style.css`) makes the browser
//! ask for paths outside the origin's mount point. Those requests land on the
//! root route; when their `Referer` sits under a proxied mount, they are
//! redirected to the same path inside that mount.
//!
//! Nested mount points are not supported. Overlapping candidates are tried
//! longest mount first, then in lexicographic order.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::routing::path::single_joining_slash;

#[derive(Debug, Clone, Default)]
pub struct JailRedirect {
    mounts: Vec<String>,
}

impl JailRedirect {
    /// Build the jail over the given proxy mount points. The root mount is ignored.
    pub fn new<I, S>(proxy_mounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mounts: Vec<String> = proxy_mounts
            .into_iter()
            .map(Into::into)
            .filter(|m: &String| m != "/")
            .collect();
        mounts.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        mounts.dedup();
        Self { mounts }
    }

    pub fn mounts(&self) -> &[String] {
        &self.mounts
    }

    /// Location to redirect to, if the referer points into a proxied mount.
    pub fn redirect_for(&self, headers: &HeaderMap, uri: &Uri) -> Option<String> {
        let referer = headers.get(header::REFERER)?.to_str().ok()?;
        match Url::parse(referer) {
            Ok(mut target) => {
                let mount = self.mount_for(target.path())?;
                target.set_path(&single_joining_slash(mount, uri.path()));
                target.set_query(uri.query());
                target.set_fragment(None);
                Some(target.into())
            }
            // Partial referers get a path-only Location.
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let referer: Uri = referer.parse().ok()?;
                let mount = self.mount_for(referer.path())?;
                let mut location = single_joining_slash(mount, uri.path());
                if let Some(query) = uri.query() {
                    location.push('?');
                    location.push_str(query);
                }
                Some(location)
            }
            Err(_) => None,
        }
    }

    fn mount_for(&self, referer_path: &str) -> Option<&str> {
        self.mounts
            .iter()
            .map(String::as_str)
            .find(|mount| referer_path.contains(mount))
    }

    /// 302 response for [`JailRedirect::redirect_for`], if one applies.
    pub fn redirect(&self, headers: &HeaderMap, uri: &Uri) -> Option<Response> {
        let location = self.redirect_for(headers, uri)?;
        let value = HeaderValue::from_str(&location).ok()?;
        tracing::debug!(path = %uri.path(), location = %location, "Jail redirect");
        Some((StatusCode::FOUND, [(header::LOCATION, value)]).into_response())
    }
}

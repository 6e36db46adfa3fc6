use axum::{
    extract::{self},
    http::HeaderMap,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

/// Scheme, host and path prefix under which clients reach the service, as
/// reported by a reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    proto: String,
    host: String,
    prefix: String,
}

/// First entry of a header a chain of proxies may have appended to.
fn forwarded<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl BaseUrl {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let proto = forwarded(headers, "x-forwarded-proto").unwrap_or("http");
        let host = forwarded(headers, "x-forwarded-host")
            .or_else(|| forwarded(headers, "host"))
            .unwrap_or("localhost");
        let prefix = forwarded(headers, "x-forwarded-prefix")
            .unwrap_or("")
            .trim_end_matches('/');

        BaseUrl {
            proto: proto.to_owned(),
            host: host.to_owned(),
            prefix: prefix.to_owned(),
        }
    }

    pub fn full_url<S: Into<String>>(&self, path: S) -> String {
        format!("{}://{}{}{}", self.proto, self.host, self.prefix, path.into())
    }
}

pub async fn base_url_middleware(mut req: extract::Request, next: Next) -> impl IntoResponse {
    let base_url = BaseUrl::from_headers(req.headers());
    req.extensions_mut().insert(Arc::new(base_url));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, value.parse().unwrap());
        }
        headers
    }

    #[test]
    fn plain_host() {
        let base_url = BaseUrl::from_headers(&headers(&[("host", "localhost:8080")]));
        assert_eq!(
            base_url.full_url("/api/v1/users/1"),
            "http://localhost:8080/api/v1/users/1"
        );
    }

    #[test]
    fn forwarded_by_proxies() {
        let base_url = BaseUrl::from_headers(&headers(&[
            ("host", "backend:8080"),
            ("x-forwarded-proto", "https, http"),
            ("x-forwarded-host", "campus.example, proxy.internal"),
            ("x-forwarded-prefix", "/transport/"),
        ]));
        assert_eq!(
            base_url.full_url("/api/v1/buses"),
            "https://campus.example/transport/api/v1/buses"
        );
    }

    #[test]
    fn no_headers() {
        let base_url = BaseUrl::from_headers(&HeaderMap::new());
        assert_eq!(base_url.full_url("/api/ping"), "http://localhost/api/ping");
    }
}

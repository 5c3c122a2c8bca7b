//! Who is calling: connection address and device description.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};
use tollgate_core::session::ClientInfo;

/// Extractor yielding the [`ClientInfo`] of the current request.
#[derive(Debug, Clone)]
pub struct Client(pub ClientInfo);

impl<S: Send + Sync> FromRequestParts<S> for Client {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Client(client_info(&parts.headers, &parts.extensions)))
    }
}

/// Address of the TCP peer, if the server was started with connect info.
pub fn peer_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Device and origin recorded against a new session.
///
/// The origin prefers the first `X-Forwarded-For` hop, when it is a valid IP,
/// over the peer address.
/// It is informational only and never used for rate limiting.
pub fn client_info(headers: &HeaderMap, extensions: &Extensions) -> ClientInfo {
    let device = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_string());

    let origin = forwarded.or_else(|| peer_ip(extensions).map(|ip| ip.to_string()));

    ClientInfo { device, origin }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.7, 10.0.0.1"),
        );
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let info = client_info(&headers, &extensions);
        assert_eq!(info.device.as_deref(), Some("curl/8"));
        assert_eq!(info.origin.as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn falls_back_to_peer_address() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5555))));

        let info = client_info(&HeaderMap::new(), &extensions);
        assert_eq!(info.device, None);
        assert_eq!(info.origin.as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn ignores_forwarded_value_that_is_not_an_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-address"));
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5555))));

        let info = client_info(&headers, &extensions);
        assert_eq!(info.origin.as_deref(), Some("192.0.2.1"));
    }
}

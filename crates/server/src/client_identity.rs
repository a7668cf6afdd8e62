//! Who is making a request, as far as rate limiting is concerned.

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
};

use axum::extract::ConnectInfo;
use http::{HeaderMap, Request, header::AUTHORIZATION};

const API_KEY_HEADER: &str = "x-api-key";

/// The identity a request is rate limited under.
///
/// Requests presenting a credential are counted per credential, others per network origin, and
/// requests without either share one anonymous bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdentity {
    /// A presented API key.
    Token(String),
    /// The client's IP address.
    Address(IpAddr),
    /// Nothing identifies the client.
    Anonymous,
}

impl ClientIdentity {
    /// Identify the client of a request that carries no verified identity.
    pub(crate) fn from_request<B>(req: &Request<B>) -> Self {
        if let Some(token) = presented_token(req.headers()) {
            return Self::Token(token.to_string());
        }

        match client_address(req) {
            Some(ip) => Self::Address(ip),
            None => Self::Anonymous,
        }
    }

    /// Key of this client's rate limit window.
    pub(crate) fn rate_limit_key(&self) -> String {
        match self {
            Self::Token(token) => format!("token:{token}"),
            Self::Address(ip) => format!("ip:{ip}"),
            Self::Anonymous => "anonymous".to_string(),
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Only a prefix, the identity ends up in logs.
            Self::Token(token) => {
                let prefix: String = token.chars().take(4).collect();
                write!(f, "token:{prefix}...")
            }
            Self::Address(ip) => write!(f, "ip:{ip}"),
            Self::Anonymous => f.write_str("anonymous"),
        }
    }
}

/// The credential in `Authorization: Bearer <key>`, or else in `X-API-Key`.
pub(crate) fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
        })
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

/// Extract client IP address from request.
fn client_address<B>(req: &Request<B>) -> Option<IpAddr> {
    // First try to get from ConnectInfo (direct connection)
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    // Try X-Forwarded-For header (for proxied requests)
    if let Some(forwarded_for) = req.headers().get("x-forwarded-for") {
        let value = forwarded_for.to_str().ok()?;

        // Take the first IP in the chain
        let ip_str = value.split(',').next()?;

        return ip_str.trim().parse::<IpAddr>().ok();
    }

    // Try X-Real-IP header
    let ip_str = req.headers().get("x-real-ip")?.to_str().ok()?;

    ip_str.trim().parse::<IpAddr>().ok()
}

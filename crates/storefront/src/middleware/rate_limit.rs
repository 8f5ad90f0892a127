//! Per-IP rate limits for the storefront API, one quota per route group.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Client IP headers in order of trust. Cloudflare sets `cf-connecting-ip`
/// at the edge; Fly.io sets `fly-client-ip` behind it.
const CLIENT_IP_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Keys requests by the shopper's IP as reported by the edge proxies.
///
/// For `x-forwarded-for` only the first hop counts.
#[derive(Clone, Copy)]
pub struct CloudflareIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for CloudflareIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        CLIENT_IP_HEADERS
            .iter()
            .find_map(|name| {
                req.headers()
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.split(',').next())
                    .and_then(|s| s.trim().parse::<IpAddr>().ok())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<CloudflareIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// One token every `replenish_secs`, up to `burst` at once.
#[derive(Debug, Clone, Copy)]
struct Quota {
    replenish_secs: u64,
    burst: u32,
}

/// Sign-in, registration and guest sign-in: about 10 a minute.
const AUTH_QUOTA: Quota = Quota {
    replenish_secs: 6,
    burst: 5,
};

/// Payment submission and Razorpay verification: about 30 a minute. Each
/// submission can create a provider order upstream.
const CHECKOUT_QUOTA: Quota = Quota {
    replenish_secs: 2,
    burst: 10,
};

/// Catalog, cart, wishlist, orders and GST lookup.
const API_QUOTA: Quota = Quota {
    replenish_secs: 1,
    burst: 50,
};

fn limiter(quota: Quota) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(CloudflareIpKeyExtractor)
        .per_second(quota.replenish_secs)
        .burst_size(quota.burst)
        .finish()
        .expect("rate limiter quotas are non-zero");
    GovernorLayer::new(Arc::new(config))
}

/// Limiter for the auth endpoints.
///
/// # Panics
///
/// Never in practice: every quota above is non-zero.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(AUTH_QUOTA)
}

/// Limiter for the general API.
///
/// # Panics
///
/// Never in practice: every quota above is non-zero.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(API_QUOTA)
}

/// Limiter for checkout submissions.
///
/// # Panics
///
/// Never in practice: every quota above is non-zero.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    limiter(CHECKOUT_QUOTA)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/api/auth/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let req = request(&[
            ("x-forwarded-for", "10.0.0.1, 10.0.0.2"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        let ip = CloudflareIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_forwarded_for_uses_first_hop() {
        let req = request(&[("x-forwarded-for", " 198.51.100.4 , 10.0.0.2")]);
        let ip = CloudflareIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_fly_header_fallback() {
        let req = request(&[("fly-client-ip", "2001:db8::1")]);
        let ip = CloudflareIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_quotas_build() {
        let _ = auth_rate_limiter();
        let _ = api_rate_limiter();
        let _ = checkout_rate_limiter();
    }

    #[test]
    fn test_missing_headers_is_an_error() {
        let req = request(&[("x-real-ip", "not-an-ip")]);
        assert!(CloudflareIpKeyExtractor.extract(&req).is_err());
    }
}

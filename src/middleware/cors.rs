//! CORS policy for browser clients.
//!
//! Pages and `/api/auth/*` are same-origin, so this only matters for separately hosted
//! front-ends calling the API with the session cookie.
//!
//! Policy:
//! - Development: mirror any origin, no credentials.
//! - Production: exact-match allow-list from `CORS_ALLOWED_ORIGINS`, credentials allowed
//!   (cookie sessions). An empty list allows nobody.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;
use crate::middleware::http::REQUEST_ID_HEADER;

pub fn layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .max_age(Duration::from_secs(60 * 10));

    if config.app_env.is_production() {
        let allowed: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        // Wildcards are incompatible with credentials; list headers explicitly.
        base.allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                HeaderName::from_static(REQUEST_ID_HEADER),
            ])
    } else {
        base.allow_origin(Any).allow_headers(Any)
    }
}

pub fn apply(router: Router, config: &Config) -> Router {
    router.layer(layer(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    use crate::config::tests::{base_pairs, lookup_from};

    fn production_config() -> Config {
        let mut pairs = base_pairs();
        pairs.extend([
            ("APP_ENV", "production"),
            ("CORS_ALLOWED_ORIGINS", "https://app.example"),
        ]);
        Config::from_lookup(lookup_from(&pairs)).unwrap()
    }

    async fn preflight(router: Router, origin: &str) -> axum::response::Response {
        router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header(header::ORIGIN, origin)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn production_only_allows_listed_origins() {
        let config = production_config();
        let router = || apply(Router::new().route("/", get(|| async { "ok" })), &config);

        let res = preflight(router(), "https://app.example").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://app.example"
        );

        let res = preflight(router(), "https://evil.example").await;
        assert!(res
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}

//! Application state and router assembly.

use std::sync::Arc;

use axum::{
    handler::Handler,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use service_core::middleware::{
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id, request_id_middleware},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AutoshopConfig;
use crate::handlers;
use crate::middleware::{auth_middleware, metrics_middleware, owner_only_middleware};
use crate::services::{AuthService, BillingService, CatalogService, JwtService, ShopStore};

#[derive(Clone)]
pub struct AppState {
    pub config: AutoshopConfig,
    pub store: Arc<dyn ShopStore>,
    pub jwt: JwtService,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub billing_service: BillingService,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(config: AutoshopConfig, store: Arc<dyn ShopStore>) -> Self {
        let jwt = JwtService::new(&config.jwt);

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let register_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.register_attempts,
            config.rate_limit.register_window_seconds,
        );

        Self {
            auth_service: AuthService::new(store.clone(), jwt.clone()),
            catalog_service: CatalogService::new(store.clone()),
            billing_service: BillingService::new(store.clone()),
            config,
            store,
            jwt,
            login_rate_limiter,
            register_rate_limiter,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let owner_routes = Router::new()
        .route(
            "/employees",
            post(handlers::employees::create_employee).get(handlers::employees::list_employees),
        )
        .route(
            "/employees/:id",
            delete(handlers::employees::delete_employee),
        )
        .route("/reports/income", get(handlers::reports::income_report))
        .route_layer(from_fn(owner_only_middleware));

    let protected_routes = Router::new()
        .route(
            "/clients",
            post(handlers::clients::create_client).get(handlers::clients::list_clients),
        )
        .route(
            "/clients/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/cars",
            post(handlers::cars::create_car).get(handlers::cars::list_cars),
        )
        .route(
            "/cars/:id",
            get(handlers::cars::get_car)
                .put(handlers::cars::update_car)
                .delete(handlers::cars::delete_car),
        )
        .route(
            "/services",
            post(handlers::services::create_service).get(handlers::services::list_services),
        )
        .route(
            "/services/:id",
            get(handlers::services::get_service)
                .put(handlers::services::update_service)
                .delete(handlers::services::delete_service),
        )
        .route(
            "/bills",
            post(handlers::bills::create_bill).get(handlers::bills::list_bills),
        )
        .route(
            "/bills/:id",
            get(handlers::bills::get_bill)
                .put(handlers::bills::update_bill)
                .delete(handlers::bills::delete_bill),
        )
        .route(
            "/organisation",
            get(handlers::organisation::get_organisation).put(
                handlers::organisation::update_organisation.layer(from_fn(owner_only_middleware)),
            ),
        )
        .merge(owner_routes)
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .merge(login_route)
        .merge(register_route)
        .merge(protected_routes);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api/v1", api)
        .with_state(state.clone())
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id(request),
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}

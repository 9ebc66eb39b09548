pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{enforce, Access, Gate, PasswordHasher, TokenService};
use crate::config::AppConfig;
use crate::routes::{applications, auth as auth_routes, companies, health, jobs, stats, users};
use crate::service::JobBoard;
use crate::store::JobBoardStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub board: JobBoard,
    pub tokens: TokenService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobBoardStore>, hasher: PasswordHasher, config: AppConfig) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_hours);
        Self {
            board: JobBoard::new(store, hasher, tokens.clone()),
            tokens,
            config: Arc::new(config),
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "JobBoard API",
        version = "0.1.0",
        description = "Companies, job postings, accounts and job applications."
    ),
    paths(
        auth_routes::register,
        auth_routes::login,
        auth_routes::me,
        jobs::list_jobs,
        jobs::get_job,
        jobs::create_job,
        jobs::update_job,
        jobs::delete_job,
        jobs::job_applications,
        companies::list_companies,
        companies::get_company,
        companies::create_company,
        applications::my_applications,
        applications::create_application,
        applications::update_application_status,
        users::assign_role,
        stats::stats,
        health::health_check
    ),
    components(schemas(
        models::Role,
        models::JobType,
        models::ApplicationStatus,
        models::PublicUser,
        models::Applicant,
        models::Company,
        models::CompanySummary,
        models::CompanyDetail,
        models::Job,
        models::JobPage,
        models::Application,
        models::Stats,
        models::RegisterRequest,
        models::LoginRequest,
        models::AuthResponse,
        models::CreateJobRequest,
        models::UpdateJobRequest,
        models::CreateCompanyRequest,
        models::CreateApplicationRequest,
        models::UpdateApplicationStatusRequest,
        models::AssignRoleRequest,
        health::HealthResponse
    )),
    tags(
        (name = "auth", description = "Registration, login and the current user"),
        (name = "jobs", description = "Job postings"),
        (name = "companies", description = "Hiring companies"),
        (name = "applications", description = "Job applications and their review"),
        (name = "users", description = "Account administration"),
        (name = "stats", description = "Headline counts"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Builds the full application: `/api` routes grouped by access level,
/// Swagger UI at `/docs`, CORS and request tracing.
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth_routes::register))
        .route("/auth/login", post(auth_routes::login))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/companies", get(companies::list_companies))
        .route("/companies/{id}", get(companies::get_company))
        .route("/stats", get(stats::stats))
        .route("/health", get(health::health_check));

    let authenticated = gated(
        Router::new()
            .route("/auth/me", get(auth_routes::me))
            .route(
                "/applications",
                get(applications::my_applications).post(applications::create_application),
            ),
        &state.tokens,
        Access::Authenticated,
    );

    let staff = gated(
        Router::new()
            .route("/jobs", post(jobs::create_job))
            .route("/jobs/{id}", put(jobs::update_job).delete(jobs::delete_job))
            .route("/jobs/{id}/applications", get(jobs::job_applications))
            .route("/applications/{id}", put(applications::update_application_status)),
        &state.tokens,
        Access::STAFF,
    );

    let admin = gated(
        Router::new()
            .route("/companies", post(companies::create_company))
            .route("/users/{id}/role", put(users::assign_role)),
        &state.tokens,
        Access::ADMIN,
    );

    let mut api_routes = Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(staff)
        .merge(admin);

    // Rate limiting only covers the API, not the docs.
    let per_minute = state.config.rate_limit_per_minute;
    if per_minute > 0 {
        let governor_conf = GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .period(Duration::from_millis((60_000 / u64::from(per_minute)).max(1)))
            .burst_size(per_minute)
            .finish();
        match governor_conf {
            Some(config) => {
                api_routes = api_routes.layer(GovernorLayer { config: Arc::new(config) });
            }
            None => tracing::warn!(per_minute, "invalid rate limit; requests are not limited"),
        }
    }

    let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .route("/", get(health::health_check))
        .nest("/api", api_routes)
        .merge(docs_router)
        .fallback(health::not_found)
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every route of `router` runs behind the access gate.
fn gated(router: Router<AppState>, tokens: &TokenService, access: Access) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        Gate::new(tokens.clone(), access),
        enforce,
    ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

//! Router construction for the ERP mirror server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post, put},
    Extension, Router,
};
use erp_mirror_core::catalog::{
    Branches, ChartOfAccounts, Collection, ContactPersons, CostCentres, Customers, Invoices,
    Items, Owners, SalesEmployees, Taxes, Warehouses,
};
use erp_mirror_core::crud::RecordHandler;
use erp_mirror_core::ports::{DocumentStore, UserStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Environment;
use crate::handlers;
use crate::middleware::jwt::{optional_auth, require_caller, JwtConfig};

/// CRUD routes for one collection, to be nested under `/api/<route>`.
fn record_routes<C: Collection>(documents: Arc<dyn DocumentStore>) -> Router {
    let guarded = put(handlers::records::update::<C>)
        .delete(handlers::records::remove::<C>)
        .route_layer(axum_mw::from_fn(require_caller));

    Router::new()
        .route(
            "/",
            get(handlers::records::list::<C>).post(handlers::records::create::<C>),
        )
        .route("/:id", get(handlers::records::read_one::<C>).merge(guarded))
        .layer(Extension(RecordHandler::<C>::new(documents)))
}

fn mount<C: Collection>(router: Router, documents: &Arc<dyn DocumentStore>) -> Router {
    let path = format!("/api/{}", C::descriptor().route);
    router.nest(&path, record_routes::<C>(documents.clone()))
}

/// Build the full axum router with all routes and middleware.
pub fn build_router(
    documents: Arc<dyn DocumentStore>,
    users: Arc<dyn UserStore>,
    jwt_config: JwtConfig,
    environment: Environment,
) -> Router {
    let mut api = Router::new();
    api = mount::<Customers>(api, &documents);
    api = mount::<ContactPersons>(api, &documents);
    api = mount::<Branches>(api, &documents);
    api = mount::<SalesEmployees>(api, &documents);
    api = mount::<Owners>(api, &documents);
    api = mount::<Items>(api, &documents);
    api = mount::<Taxes>(api, &documents);
    api = mount::<Warehouses>(api, &documents);
    api = mount::<CostCentres>(api, &documents);
    api = mount::<ChartOfAccounts>(api, &documents);
    api = mount::<Invoices>(api, &documents);

    let auth = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/profile", get(handlers::auth::profile));

    let public = Router::new()
        .route("/", get(handlers::health::banner))
        .route("/health", get(handlers::health::health));

    public
        .merge(api)
        .nest("/api/auth", auth)
        .layer(axum_mw::from_fn(optional_auth))
        .layer(Extension(jwt_config))
        .layer(Extension(users))
        .layer(Extension(environment))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

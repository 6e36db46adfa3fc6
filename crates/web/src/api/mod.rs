use axum::{
    middleware::map_response,
    routing::{get, on},
    Json, Router,
};
use campus::database::Database;
use serde::Serialize;

pub mod v1;

use crate::{
    common::{method_not_allowed, route_not_found, METHOD_FILTER_ALL},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        format!("/api{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest_service("/v1", v1::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
        .layer(map_response(method_not_allowed))
}

/// Liveness probe, answers without touching the store.
#[derive(Serialize)]
struct Pong {
    message: &'static str,
}

async fn ping() -> Json<Pong> {
    Json(Pong { message: "pong!" })
}

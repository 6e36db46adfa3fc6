//! Combined read views of buses for dashboards: driver, schedules and recent
//! locations in one response.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::Method,
    routing::{get, on},
    Extension, Router,
};
use campus::database::Database;
use chrono::Utc;
use model::{
    location::DEFAULT_RECENT_LOCATIONS,
    overview::{BusOverview, BusOverviewDetail},
};
use serde::Deserialize;
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        request_failed, route_not_found, schema_no_example, HateoasResult, VecResponse,
        VecResult, METHOD_FILTER_ALL,
    },
    extract::{PathParam, QueryParams},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

use super::buses;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/bus-data{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema_no_example::<BusOverview>))
        .route("/:id", get(get_bus_overview::<D>))
        .route("/", get(get_bus_overviews::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
struct OverviewParams {
    /// Number of recent locations per bus.
    #[serde(default = "default_locations")]
    locations: usize,
}

fn default_locations() -> usize {
    DEFAULT_RECENT_LOCATIONS
}

async fn get_bus_overviews<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    QueryParams(params): QueryParams<OverviewParams>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<BusOverview> {
    campus_client
        .get_bus_overviews(params.locations)
        .await
        .map(|overviews| {
            overviews
                .into_iter()
                .map(|overview| {
                    let id = overview.bus.id.raw();
                    hateoas::Response::builder(overview, base_url.clone())
                        .link("self", resource!("/{}", id))
                        .link("bus", buses::resource!("/{}", id))
                        .build()
                })
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

/// Includes the full location history and the last and next trip.
async fn get_bus_overview<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<BusOverviewDetail> {
    campus_client
        .get_bus_overview(Id::new(id), Utc::now())
        .await
        .map(|overview| {
            hateoas::Response::builder(overview, base_url)
                .link("self", resource!("/{}", id))
                .link("bus", buses::resource!("/{}", id))
                .build()
                .json()
        })
        .map_err(request_failed(&method, &original_uri))
}

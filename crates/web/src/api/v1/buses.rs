use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Router,
};
use campus::database::Database;
use chrono::Utc;
use model::{
    bus::{Bus, BusFilter},
    overview::BusWithTrips,
    WithId,
};
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        request_failed, route_not_found, schema, CreatedResult, HateoasResult,
        RouteResult, VecResponse, VecResult, METHOD_FILTER_ALL,
    },
    extract::{JsonBody, PathParam, QueryParams},
    hateoas::{self, ResponseBuilder},
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

use super::{bus_data, drivers, locations, schedules};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/buses{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Bus>))
        .route(
            "/:id",
            get(get_bus::<D>)
                .put(update_bus::<D>)
                .delete(delete_bus::<D>),
        )
        .route("/", get(get_buses::<D>).post(create_bus::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_buses<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    QueryParams(filter): QueryParams<BusFilter>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<Bus>> {
    campus_client
        .get_buses(&filter)
        .await
        .map(|buses| {
            buses
                .into_iter()
                .map(|bus| bus_hateoas(bus, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

/// The bus with its driver and its last and next trip.
async fn get_bus<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<BusWithTrips> {
    campus_client
        .get_bus_with_trips(Id::new(id), Utc::now())
        .await
        .map(|bus| {
            let driver = bus.driver.as_ref().map(|driver| driver.id.raw());
            hateoas::Response::builder(bus, base_url)
                .let_owned(|builder| bus_links(builder, id))
                .link_option("driver", driver.map(|driver| drivers::resource!("/{}", driver)))
                .build()
                .json()
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn create_bus<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(bus): JsonBody<Bus>,
) -> CreatedResult<WithId<Bus>> {
    campus_client
        .create_bus(bus)
        .await
        .map(|bus| (StatusCode::CREATED, bus_hateoas(bus, base_url).json()))
        .map_err(request_failed(&method, &original_uri))
}

async fn update_bus<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(bus): JsonBody<Bus>,
) -> HateoasResult<WithId<Bus>> {
    campus_client
        .update_bus(WithId::new(Id::new(id), bus))
        .await
        .map(|bus| bus_hateoas(bus, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

/// Removes the bus with its schedules and location history. Its driver stays,
/// unassigned.
async fn delete_bus<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
) -> RouteResult<StatusCode> {
    campus_client
        .delete_bus(Id::new(id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(request_failed(&method, &original_uri))
}

/// Links shared by every representation of a bus.
pub(crate) fn bus_links<T>(builder: ResponseBuilder<T>, id: i64) -> ResponseBuilder<T> {
    builder
        .link("self", resource!("/{}", id))
        .link("schedules", schedules::resource!("?bus={}", id))
        .link("locations", locations::resource!("?busId={}", id))
        .link("overview", bus_data::resource!("/{}", id))
}

pub(crate) fn bus_hateoas(
    bus: WithId<Bus>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Bus>> {
    let id = bus.id.raw();
    hateoas::Response::builder(bus, base_url)
        .let_owned(|builder| bus_links(builder, id))
        .build()
}

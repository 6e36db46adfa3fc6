use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Router,
};
use campus::database::Database;
use model::{
    driver::{Driver, DriverFilter},
    WithId,
};
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        request_failed, route_not_found, schema, CreatedResult, HateoasResult,
        RouteResult, VecResponse, VecResult, METHOD_FILTER_ALL,
    },
    extract::{JsonBody, PathParam, QueryParams},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

use super::{buses, users};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/drivers{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Driver>))
        .route(
            "/:id",
            get(get_driver::<D>)
                .put(update_driver::<D>)
                .delete(delete_driver::<D>),
        )
        .route("/", get(get_drivers::<D>).post(create_driver::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_drivers<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    QueryParams(filter): QueryParams<DriverFilter>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<Driver>> {
    campus_client
        .get_drivers(&filter)
        .await
        .map(|drivers| {
            drivers
                .into_iter()
                .map(|driver| driver_hateoas(driver, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn get_driver<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Driver>> {
    campus_client
        .get_driver(Id::new(id))
        .await
        .map(|driver| driver_hateoas(driver, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn create_driver<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(driver): JsonBody<Driver>,
) -> CreatedResult<WithId<Driver>> {
    campus_client
        .create_driver(driver)
        .await
        .map(|driver| (StatusCode::CREATED, driver_hateoas(driver, base_url).json()))
        .map_err(request_failed(&method, &original_uri))
}

async fn update_driver<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(driver): JsonBody<Driver>,
) -> HateoasResult<WithId<Driver>> {
    campus_client
        .update_driver(WithId::new(Id::new(id), driver))
        .await
        .map(|driver| driver_hateoas(driver, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn delete_driver<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
) -> RouteResult<StatusCode> {
    campus_client
        .delete_driver(Id::new(id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(request_failed(&method, &original_uri))
}

pub(crate) fn driver_hateoas(
    driver: WithId<Driver>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Driver>> {
    let id = driver.id.raw();
    let user = driver.content.user.raw();
    let bus = driver.content.assigned_bus.map(|bus| bus.raw());
    hateoas::Response::builder(driver, base_url)
        .link("self", resource!("/{}", id))
        .link("user", users::resource!("/{}", user))
        .link_option("bus", bus.map(|bus| buses::resource!("/{}", bus)))
        .build()
}

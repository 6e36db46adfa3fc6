use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Router,
};
use campus::database::Database;
use model::{
    route::{Route, RouteFilter},
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

use super::schedules;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/routes{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Route>))
        .route(
            "/:id",
            get(get_route::<D>)
                .put(update_route::<D>)
                .delete(delete_route::<D>),
        )
        .route("/", get(get_routes::<D>).post(create_route::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_routes<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    QueryParams(filter): QueryParams<RouteFilter>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<Route>> {
    campus_client
        .get_routes(&filter)
        .await
        .map(|routes| {
            routes
                .into_iter()
                .map(|route| route_hateoas(route, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn get_route<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Route>> {
    campus_client
        .get_route(Id::new(id))
        .await
        .map(|route| route_hateoas(route, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn create_route<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(route): JsonBody<Route>,
) -> CreatedResult<WithId<Route>> {
    campus_client
        .create_route(route)
        .await
        .map(|route| (StatusCode::CREATED, route_hateoas(route, base_url).json()))
        .map_err(request_failed(&method, &original_uri))
}

async fn update_route<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(route): JsonBody<Route>,
) -> HateoasResult<WithId<Route>> {
    campus_client
        .update_route(WithId::new(Id::new(id), route))
        .await
        .map(|route| route_hateoas(route, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

/// Removes the route and every schedule that runs on it.
async fn delete_route<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
) -> RouteResult<StatusCode> {
    campus_client
        .delete_route(Id::new(id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(request_failed(&method, &original_uri))
}

pub(crate) fn route_hateoas(
    route: WithId<Route>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Route>> {
    let id = route.id.raw();
    hateoas::Response::builder(route, base_url)
        .link("self", resource!("/{}", id))
        .link("schedules", schedules::resource!("?route={}", id))
        .build()
}

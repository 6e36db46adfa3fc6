use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Router,
};
use campus::database::Database;
use model::{
    schedule::{Schedule, ScheduleFilter},
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

use super::{bus_routes, buses};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/schedules{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Schedule>))
        .route(
            "/:id",
            get(get_schedule::<D>)
                .put(update_schedule::<D>)
                .delete(delete_schedule::<D>),
        )
        .route("/", get(get_schedules::<D>).post(create_schedule::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Ordered by departure.
async fn get_schedules<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    QueryParams(filter): QueryParams<ScheduleFilter>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<Schedule>> {
    campus_client
        .get_schedules(&filter)
        .await
        .map(|schedules| {
            schedules
                .into_iter()
                .map(|schedule| schedule_hateoas(schedule, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn get_schedule<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Schedule>> {
    campus_client
        .get_schedule(Id::new(id))
        .await
        .map(|schedule| schedule_hateoas(schedule, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn create_schedule<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(schedule): JsonBody<Schedule>,
) -> CreatedResult<WithId<Schedule>> {
    campus_client
        .create_schedule(schedule)
        .await
        .map(|schedule| {
            (
                StatusCode::CREATED,
                schedule_hateoas(schedule, base_url).json(),
            )
        })
        .map_err(request_failed(&method, &original_uri))
}

/// The stop times of the request replace the stored ones.
async fn update_schedule<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(schedule): JsonBody<Schedule>,
) -> HateoasResult<WithId<Schedule>> {
    campus_client
        .update_schedule(WithId::new(Id::new(id), schedule))
        .await
        .map(|schedule| schedule_hateoas(schedule, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn delete_schedule<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
) -> RouteResult<StatusCode> {
    campus_client
        .delete_schedule(Id::new(id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(request_failed(&method, &original_uri))
}

pub(crate) fn schedule_hateoas(
    schedule: WithId<Schedule>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Schedule>> {
    let id = schedule.id.raw();
    let bus = schedule.content.bus.raw();
    let route = schedule.content.route.raw();
    hateoas::Response::builder(schedule, base_url)
        .link("self", resource!("/{}", id))
        .link("bus", buses::resource!("/{}", bus))
        .link("route", bus_routes::resource!("/{}", route))
        .build()
}

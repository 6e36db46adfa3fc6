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
    location::{LocationFilter, LocationRecord},
    WithId,
};
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        request_failed, route_not_found, schema, CreatedResult, HateoasResult,
        VecResponse, VecResult, METHOD_FILTER_ALL,
    },
    extract::{JsonBody, PathParam, QueryParams},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

use super::buses;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/locations{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

/// Location history is append only, records are never replaced or deleted.
pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<LocationRecord>))
        .route("/:id", get(get_location::<D>))
        .route("/", get(get_locations::<D>).post(create_location::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Most recent first, optionally restricted to one bus.
async fn get_locations<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    QueryParams(filter): QueryParams<LocationFilter>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<LocationRecord>> {
    campus_client
        .get_locations(&filter)
        .await
        .map(|records| {
            records
                .into_iter()
                .map(|record| location_hateoas(record, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn get_location<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<LocationRecord>> {
    campus_client
        .get_location(Id::new(id))
        .await
        .map(|record| location_hateoas(record, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn create_location<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(record): JsonBody<LocationRecord>,
) -> CreatedResult<WithId<LocationRecord>> {
    campus_client
        .create_location(record, Utc::now())
        .await
        .map(|record| {
            (
                StatusCode::CREATED,
                location_hateoas(record, base_url).json(),
            )
        })
        .map_err(request_failed(&method, &original_uri))
}

pub(crate) fn location_hateoas(
    record: WithId<LocationRecord>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<LocationRecord>> {
    let id = record.id.raw();
    let bus = record.content.bus.raw();
    hateoas::Response::builder(record, base_url)
        .link("self", resource!("/{}", id))
        .link("bus", buses::resource!("/{}", bus))
        .build()
}

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Router,
};
use campus::database::Database;
use model::{
    lecturer::{Lecturer, LecturerFilter},
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

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/lecturers{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Lecturer>))
        .route(
            "/:id",
            get(get_lecturer::<D>)
                .put(update_lecturer::<D>)
                .delete(delete_lecturer::<D>),
        )
        .route("/", get(get_lecturers::<D>).post(create_lecturer::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_lecturers<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    QueryParams(filter): QueryParams<LecturerFilter>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<Lecturer>> {
    campus_client
        .get_lecturers(&filter)
        .await
        .map(|lecturers| {
            lecturers
                .into_iter()
                .map(|lecturer| lecturer_hateoas(lecturer, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn get_lecturer<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Lecturer>> {
    campus_client
        .get_lecturer(Id::new(id))
        .await
        .map(|lecturer| lecturer_hateoas(lecturer, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

/// The staff id is generated, a `staffId` in the request is ignored.
async fn create_lecturer<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(lecturer): JsonBody<Lecturer>,
) -> CreatedResult<WithId<Lecturer>> {
    campus_client
        .create_lecturer(lecturer)
        .await
        .map(|lecturer| {
            (
                StatusCode::CREATED,
                lecturer_hateoas(lecturer, base_url).json(),
            )
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn update_lecturer<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(lecturer): JsonBody<Lecturer>,
) -> HateoasResult<WithId<Lecturer>> {
    campus_client
        .update_lecturer(WithId::new(Id::new(id), lecturer))
        .await
        .map(|lecturer| lecturer_hateoas(lecturer, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn delete_lecturer<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
) -> RouteResult<StatusCode> {
    campus_client
        .delete_lecturer(Id::new(id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(request_failed(&method, &original_uri))
}

pub(crate) fn lecturer_hateoas(
    lecturer: WithId<Lecturer>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Lecturer>> {
    let id = lecturer.id.raw();
    hateoas::Response::builder(lecturer, base_url)
        .link("self", resource!("/{}", id))
        .build()
}

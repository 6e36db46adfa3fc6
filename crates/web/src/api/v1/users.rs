use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Router,
};
use campus::database::Database;
use model::{
    user::{User, UserFilter},
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
        crate::api::v1::resource!("/users{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<User>))
        .route(
            "/:id",
            get(get_user::<D>)
                .put(update_user::<D>)
                .delete(delete_user::<D>),
        )
        .route("/", get(get_users::<D>).post(create_user::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_users<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    QueryParams(filter): QueryParams<UserFilter>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<User>> {
    campus_client
        .get_users(&filter)
        .await
        .map(|users| {
            users
                .into_iter()
                .map(|user| user_hateoas(user, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn get_user<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<User>> {
    campus_client
        .get_user(Id::new(id))
        .await
        .map(|user| user_hateoas(user, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn create_user<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(user): JsonBody<User>,
) -> CreatedResult<WithId<User>> {
    campus_client
        .create_user(user)
        .await
        .map(|user| (StatusCode::CREATED, user_hateoas(user, base_url).json()))
        .map_err(request_failed(&method, &original_uri))
}

async fn update_user<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(user): JsonBody<User>,
) -> HateoasResult<WithId<User>> {
    campus_client
        .update_user(WithId::new(Id::new(id), user))
        .await
        .map(|user| user_hateoas(user, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

/// Removes the user together with their driver profiles.
async fn delete_user<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
) -> RouteResult<StatusCode> {
    campus_client
        .delete_user(Id::new(id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(request_failed(&method, &original_uri))
}

pub(crate) fn user_hateoas(
    user: WithId<User>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<User>> {
    let id = user.id.raw();
    hateoas::Response::builder(user, base_url)
        .link("self", resource!("/{}", id))
        .build()
}

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on, post},
    Extension, Router,
};
use campus::database::Database;
use model::{
    feedback::{Feedback, Reply},
    WithId,
};
use serde::Deserialize;
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        request_failed, route_not_found, schema, CreatedResult, HateoasResult,
        RouteResult, VecResponse, VecResult, METHOD_FILTER_ALL,
    },
    extract::{JsonBody, PathParam},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/feedbacks{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Feedback>))
        .route("/:id/replies", post(create_reply::<D>))
        .route(
            "/:id",
            get(get_feedback::<D>)
                .put(update_feedback::<D>)
                .delete(delete_feedback::<D>),
        )
        .route("/", get(get_feedbacks::<D>).post(create_feedback::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Body of a reply, the feedback it answers is taken from the path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewReply {
    author_name: String,
    message: String,
}

async fn get_feedbacks<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<Feedback>> {
    campus_client
        .get_feedbacks()
        .await
        .map(|feedbacks| {
            feedbacks
                .into_iter()
                .map(|feedback| feedback_hateoas(feedback, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn get_feedback<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Feedback>> {
    campus_client
        .get_feedback(Id::new(id))
        .await
        .map(|feedback| feedback_hateoas(feedback, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn create_feedback<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(feedback): JsonBody<Feedback>,
) -> CreatedResult<WithId<Feedback>> {
    campus_client
        .create_feedback(feedback)
        .await
        .map(|feedback| {
            (
                StatusCode::CREATED,
                feedback_hateoas(feedback, base_url).json(),
            )
        })
        .map_err(request_failed(&method, &original_uri))
}

/// Replies are kept as they are.
async fn update_feedback<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(feedback): JsonBody<Feedback>,
) -> HateoasResult<WithId<Feedback>> {
    campus_client
        .update_feedback(WithId::new(Id::new(id), feedback))
        .await
        .map(|feedback| feedback_hateoas(feedback, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn delete_feedback<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
) -> RouteResult<StatusCode> {
    campus_client
        .delete_feedback(Id::new(id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(request_failed(&method, &original_uri))
}

async fn create_reply<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(reply): JsonBody<NewReply>,
) -> CreatedResult<WithId<Reply>> {
    let reply = Reply {
        feedback: Id::new(id),
        author_name: reply.author_name,
        message: reply.message,
        created_at: None,
    };
    campus_client
        .create_reply(Id::new(id), reply)
        .await
        .map(|reply| {
            let response = hateoas::Response::builder(reply, base_url)
                .link("feedback", resource!("/{}", id))
                .build();
            (StatusCode::CREATED, response.json())
        })
        .map_err(request_failed(&method, &original_uri))
}

fn feedback_hateoas(
    feedback: WithId<Feedback>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Feedback>> {
    let id = feedback.id.raw();
    hateoas::Response::builder(feedback, base_url)
        .link("self", resource!("/{}", id))
        .link("replies", resource!("/{}/replies", id))
        .build()
}

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Router,
};
use campus::database::Database;
use model::{voice_note::VoiceNote, WithId};
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
        crate::api::v1::resource!("/voice-notes{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<VoiceNote>))
        .route(
            "/:id",
            get(get_voice_note::<D>)
                .put(update_voice_note::<D>)
                .delete(delete_voice_note::<D>),
        )
        .route("/", get(get_voice_notes::<D>).post(create_voice_note::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_voice_notes<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> VecResult<WithId<VoiceNote>> {
    campus_client
        .get_voice_notes()
        .await
        .map(|notes| {
            notes
                .into_iter()
                .map(|note| voice_note_hateoas(note, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).json())
        })
        .map_err(request_failed(&method, &original_uri))
}

async fn get_voice_note<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<VoiceNote>> {
    campus_client
        .get_voice_note(Id::new(id))
        .await
        .map(|note| voice_note_hateoas(note, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn create_voice_note<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(note): JsonBody<VoiceNote>,
) -> CreatedResult<WithId<VoiceNote>> {
    campus_client
        .create_voice_note(note)
        .await
        .map(|note| (StatusCode::CREATED, voice_note_hateoas(note, base_url).json()))
        .map_err(request_failed(&method, &original_uri))
}

async fn update_voice_note<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    JsonBody(note): JsonBody<VoiceNote>,
) -> HateoasResult<WithId<VoiceNote>> {
    campus_client
        .update_voice_note(WithId::new(Id::new(id), note))
        .await
        .map(|note| voice_note_hateoas(note, base_url).json())
        .map_err(request_failed(&method, &original_uri))
}

async fn delete_voice_note<D: Database>(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    PathParam(id): PathParam<i64>,
    State(WebState { campus_client }): State<WebState<D>>,
) -> RouteResult<StatusCode> {
    campus_client
        .delete_voice_note(Id::new(id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(request_failed(&method, &original_uri))
}

fn voice_note_hateoas(
    note: WithId<VoiceNote>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<VoiceNote>> {
    let id = note.id.raw();
    hateoas::Response::builder(note, base_url)
        .link("self", resource!("/{}", id))
        .build()
}

use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        OriginalUri, Request,
    },
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::MethodFilter,
    Json,
};
use campus::RequestError;
use model::ExampleData;
use schemars::{schema_for, schema_for_value, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::{extract::QueryParams, hateoas};

pub type RouteResult<O> = Result<O, RouteErrorResponse>;
pub type HateoasResult<O> = RouteResult<Json<hateoas::Response<O>>>;
pub type CreatedResult<O> = RouteResult<(StatusCode, Json<hateoas::Response<O>>)>;
pub type VecResult<O> = RouteResult<Json<VecResponse<hateoas::Response<O>>>>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

#[derive(Debug, Clone, Serialize)]
pub struct VecResponse<T> {
    pub data: Vec<T>,
}

impl<T> VecResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

// - Services returning commonly used responses -

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaParams {
    #[serde(default = "Default::default")]
    example_data: bool,
}

pub(crate) async fn schema<T: ExampleData + JsonSchema + Serialize>(
    QueryParams(params): QueryParams<SchemaParams>,
) -> impl IntoResponse {
    if params.example_data {
        Json(schema_for_value!(T::example_data()))
    } else {
        Json(schema_for!(T))
    }
}

pub(crate) async fn schema_no_example<T: JsonSchema + Serialize>(
    QueryParams(_params): QueryParams<SchemaParams>,
) -> impl IntoResponse {
    Json(schema_for!(T))
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

/// Gives the empty 405 of axum's method routers an error body. The `Allow`
/// header is kept.
pub(crate) async fn method_not_allowed(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    response: Response,
) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(header::ALLOW).cloned();
    let mut error = RouteErrorResponse::new(StatusCode::METHOD_NOT_ALLOWED)
        .with_method(&method)
        .with_uri(original_uri.path())
        .into_response();
    if let Some(allow) = allow {
        error.headers_mut().insert(header::ALLOW, allow);
    }
    error
}

/// Turns a failed request into a response that names the request.
pub(crate) fn request_failed<'a>(
    method: &'a Method,
    uri: &'a Uri,
) -> impl FnOnce(RequestError) -> RouteErrorResponse + 'a {
    move |why| {
        RouteErrorResponse::from(why)
            .with_method(method)
            .with_uri(uri.path())
    }
}

// - Commonly used responeses -

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    pub error: String,

    /// Validation messages per offending field.
    pub fields: Option<BTreeMap<String, Vec<String>>>,

    pub http_method: Option<String>,

    pub requested_uri: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        let error = status_code
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_owned();
        Self {
            status_code,
            error,
            fields: None,
            http_method: None,
            requested_uri: None,
        }
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, Vec<String>>) -> Self {
        self.fields = Some(fields);
        self
    }
}

impl From<RequestError> for RouteErrorResponse {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::NotFound => Self::new(StatusCode::NOT_FOUND)
                .with_error("The requested item does not exist."),
            RequestError::Invalid(errors) => Self::new(StatusCode::BAD_REQUEST)
                .with_error("Invalid input.")
                .with_fields(errors.into_map()),
            RequestError::Other(other) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_error(other.to_string())
            }
        }
    }
}

macro_rules! from_rejection {
    ($rejection:ty) => {
        impl From<$rejection> for RouteErrorResponse {
            fn from(rejection: $rejection) -> Self {
                Self::new(rejection.status()).with_error(rejection.body_text())
            }
        }
    };
}

from_rejection!(JsonRejection);
from_rejection!(QueryRejection);
from_rejection!(PathRejection);

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn invalid_input_lists_fields() {
        let response = RouteErrorResponse::from(RequestError::invalid(
            "busNumber",
            "A record with this value already exists.",
        ))
        .with_method(&Method::POST)
        .with_uri("/api/v1/buses");

        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "error": "Invalid input.",
                "fields": {"busNumber": ["A record with this value already exists."]},
                "httpMethod": "POST",
                "requestedUri": "/api/v1/buses",
            })
        );
    }

    #[test]
    fn not_found_is_404() {
        let response = RouteErrorResponse::from(RequestError::NotFound);
        assert_eq!(response.status_code, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"error": "The requested item does not exist."})
        );
    }

    #[test]
    fn other_errors_carry_their_cause() {
        let why = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let response = RouteErrorResponse::from(RequestError::other(why));
        assert_eq!(response.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error, "connection reset");
    }

    #[tokio::test]
    async fn method_not_allowed_gets_a_body_and_keeps_allow() {
        let response = axum::response::Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(header::ALLOW, "GET,HEAD")
            .body(axum::body::Body::empty())
            .unwrap();
        let uri: Uri = "/api/v1/locations/1".parse().unwrap();

        let response = method_not_allowed(Method::PUT, OriginalUri(uri), response).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET,HEAD");
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(),
            json!({
                "error": "Method Not Allowed",
                "httpMethod": "PUT",
                "requestedUri": "/api/v1/locations/1",
            })
        );
    }
}

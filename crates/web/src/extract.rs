//! Wrappers around axum's extractors whose rejections answer with a
//! [`RouteErrorResponse`] body instead of plain text.

use axum::extract::{FromRequest, FromRequestParts};

use crate::common::RouteErrorResponse;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(RouteErrorResponse))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(RouteErrorResponse))]
pub struct QueryParams<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(RouteErrorResponse))]
pub struct PathParam<T>(pub T);

use std::sync::Arc;

use axum::Json;
use serde::Serialize;

use crate::middleware::base_url::BaseUrl;

#[derive(Debug, Clone, Serialize)]
pub struct Link {
    #[serde(rename = "rel")]
    pub relation: String,

    #[serde(rename = "href")]
    pub hypertext_reference: String,
}

/// A resource together with the links to itself and related resources.
#[derive(Debug, Clone, Serialize)]
pub struct Response<T> {
    #[serde(flatten)]
    pub content: T,
    pub links: Vec<Link>,
}

impl<T> Response<T> {
    pub fn builder(content: T, base_url: Arc<BaseUrl>) -> ResponseBuilder<T> {
        ResponseBuilder {
            response: Self {
                content,
                links: vec![],
            },
            base_url,
        }
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

pub struct ResponseBuilder<T> {
    response: Response<T>,
    base_url: Arc<BaseUrl>,
}

impl<T> ResponseBuilder<T> {
    /// `path` is relative to the externally visible base url.
    pub fn link<R, H>(mut self, relation: R, path: H) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        self.response.links.push(Link {
            relation: relation.into(),
            hypertext_reference: self.base_url.full_url(path),
        });
        self
    }

    pub fn link_option<R, H>(self, relation: R, path: Option<H>) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        match path {
            Some(path) => self.link(relation, path),
            None => self,
        }
    }

    pub fn build(self) -> Response<T> {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use serde_json::json;

    use super::*;

    #[test]
    fn links_are_absolute_and_flattened() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "campus.example".parse().unwrap());
        let base_url = Arc::new(BaseUrl::from_headers(&headers));

        let response = Response::builder(json!({"id": 3}), base_url)
            .link("self", "/api/v1/buses/3")
            .link_option("driver", None::<String>)
            .build();

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "id": 3,
                "links": [{"rel": "self", "href": "http://campus.example/api/v1/buses/3"}],
            })
        );
    }
}

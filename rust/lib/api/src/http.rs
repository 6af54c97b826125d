//! Thin JSON-over-HTTP wrapper shared by every service.

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Scheme word of the `Authorization` header (`Token <key>`).
pub const AUTH_SCHEME: &str = "Token";

/// Query string pairs.
pub type Query = Vec<(&'static str, String)>;

/// HTTP client bound to one API base URL.
///
/// Stateless apart from the connection pool: the session token is passed
/// per call, so the same client serves anonymous and authenticated
/// requests. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` starts with `/` and keeps the backend's trailing slash.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        debug!(%method, path, authed = token.is_some(), "api request");
        let builder = self.http.request(method, self.url(path));
        match token {
            Some(token) => builder.header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", AUTH_SCHEME, token),
            ),
            None => builder,
        }
    }

    /// Map non-2xx answers to `ApiError`, leaving successful ones untouched.
    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "api error response");
        Err(ApiError::from_status(status, body))
    }

    async fn parse<R: DeserializeOwned>(resp: Response) -> Result<R, ApiError> {
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }

    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
        token: Option<&str>,
    ) -> Result<R, ApiError> {
        let resp = self.request(Method::GET, path, token).query(query).send().await?;
        Self::parse(resp).await
    }

    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<R, ApiError> {
        let resp = self.request(Method::POST, path, token).json(body).send().await?;
        Self::parse(resp).await
    }

    pub async fn patch<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<R, ApiError> {
        let resp = self.request(Method::PATCH, path, token).json(body).send().await?;
        Self::parse(resp).await
    }

    /// DELETE; any 2xx (usually 204 with no body) is success.
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(), ApiError> {
        let resp = self.request(Method::DELETE, path, token).send().await?;
        Self::check(resp).await.map(|_| ())
    }
}

/// Append paging parameters to a query.
pub(crate) fn paged(mut query: Query, page: crate::PageRequest) -> Query {
    query.push(("page", page.page.to_string()));
    query.push(("page_size", page.page_size.to_string()));
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PageRequest;

    #[test]
    fn url_joins_base_and_path() {
        let client = ApiClient::new(&ApiConfig::new("http://localhost:8000/api/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url("/users/me/"), "http://localhost:8000/api/users/me/");
    }

    #[test]
    fn paged_appends_page_and_size() {
        let q = paged(vec![("tab", "latest".to_string())], PageRequest::new(3, 10));
        assert_eq!(q, vec![
            ("tab", "latest".to_string()),
            ("page", "3".to_string()),
            ("page_size", "10".to_string()),
        ]);
    }
}

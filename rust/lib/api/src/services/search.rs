use crate::error::ApiError;
use crate::http::{paged, ApiClient};
use crate::model::{Post, User};
use crate::page::{Page, PageRequest};

#[derive(Debug, Clone)]
pub struct SearchService {
    client: ApiClient,
}

impl SearchService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn users(&self, q: &str, page: PageRequest) -> Result<Page<User>, ApiError> {
        let query = vec![("q", q.to_string())];
        self.client.get("/search/users/", &paged(query, page), None).await
    }

    pub async fn posts(
        &self,
        q: &str,
        page: PageRequest,
        token: Option<&str>,
    ) -> Result<Page<Post>, ApiError> {
        let query = vec![("q", q.to_string())];
        self.client.get("/search/posts/", &paged(query, page), token).await
    }
}

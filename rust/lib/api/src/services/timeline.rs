use crate::error::ApiError;
use crate::http::{paged, ApiClient};
use crate::model::{Post, TimelineTab};
use crate::page::{Page, PageRequest};

#[derive(Debug, Clone)]
pub struct TimelineService {
    client: ApiClient,
}

impl TimelineService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /timeline/?tab=`. The token personalizes `is_liked` and is what
    /// the `following` tab is computed from.
    pub async fn get(
        &self,
        tab: TimelineTab,
        page: PageRequest,
        token: Option<&str>,
    ) -> Result<Page<Post>, ApiError> {
        let query = vec![("tab", tab.as_str().to_string())];
        self.client.get("/timeline/", &paged(query, page), token).await
    }
}

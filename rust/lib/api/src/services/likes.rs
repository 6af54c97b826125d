use crate::error::ApiError;
use crate::http::{paged, ApiClient};
use crate::model::{CreateLike, EdgeId, Like, PostId, UserId};
use crate::page::{Page, PageRequest};

#[derive(Debug, Clone)]
pub struct LikeService {
    client: ApiClient,
}

impl LikeService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        user_id: Option<UserId>,
        post_id: Option<PostId>,
        page: PageRequest,
    ) -> Result<Page<Like>, ApiError> {
        let mut query = Vec::new();
        if let Some(id) = user_id {
            query.push(("user_id", id.to_string()));
        }
        if let Some(id) = post_id {
            query.push(("post_id", id.to_string()));
        }
        self.client.get("/likes/", &paged(query, page), None).await
    }

    pub async fn create(&self, post_id: PostId, token: &str) -> Result<Like, ApiError> {
        self.client.post("/likes/", &CreateLike { post_id }, Some(token)).await
    }

    pub async fn delete(&self, id: EdgeId, token: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/likes/{}/", id), Some(token)).await
    }

    /// The like edge `viewer -> post`, if any.
    pub async fn find(&self, viewer: UserId, post: PostId) -> Result<Option<Like>, ApiError> {
        let page = self.list(Some(viewer), Some(post), PageRequest::first(1)).await?;
        Ok(page.items.into_iter().next())
    }
}

use crate::error::ApiError;
use crate::http::{paged, ApiClient};
use crate::model::{CreatePost, LikedStatus, Post, PostId, UserId};
use crate::page::{Page, PageRequest};

#[derive(Debug, Clone)]
pub struct PostService {
    client: ApiClient,
}

impl PostService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// List posts, optionally only those authored by `user_id`.
    pub async fn list(
        &self,
        user_id: Option<UserId>,
        page: PageRequest,
        token: Option<&str>,
    ) -> Result<Page<Post>, ApiError> {
        let mut query = Vec::new();
        if let Some(id) = user_id {
            query.push(("user_id", id.to_string()));
        }
        self.client.get("/posts/", &paged(query, page), token).await
    }

    pub async fn get(&self, id: PostId) -> Result<Post, ApiError> {
        self.client.get(&format!("/posts/{}/", id), &Vec::new(), None).await
    }

    pub async fn create(&self, post: &CreatePost, token: &str) -> Result<Post, ApiError> {
        self.client.post("/posts/", post, Some(token)).await
    }

    pub async fn update(&self, id: PostId, post: &CreatePost, token: &str) -> Result<Post, ApiError> {
        self.client.patch(&format!("/posts/{}/", id), post, Some(token)).await
    }

    pub async fn delete(&self, id: PostId, token: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/posts/{}/", id), Some(token)).await
    }

    /// Which of `ids` the viewer likes.
    pub async fn liked_status(&self, ids: &[PostId], token: &str) -> Result<LikedStatus, ApiError> {
        if ids.is_empty() {
            return Ok(LikedStatus::default());
        }
        let joined = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        self.client
            .get("/posts/liked-status/", &vec![("ids", joined)], Some(token))
            .await
    }
}

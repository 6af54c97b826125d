use crate::error::ApiError;
use crate::http::{paged, ApiClient};
use crate::model::{CreateUser, Post, UpdateUser, User, UserId};
use crate::page::{Page, PageRequest};
use crate::services::follows::{FollowFilter, FollowService};

#[derive(Debug, Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<User>, ApiError> {
        self.client.get("/users/", &paged(Vec::new(), page), None).await
    }

    pub async fn get(&self, id: UserId) -> Result<User, ApiError> {
        self.client.get(&format!("/users/{}/", id), &Vec::new(), None).await
    }

    /// Register a new account. Does not log in.
    pub async fn create(&self, user: &CreateUser) -> Result<User, ApiError> {
        self.client.post("/users/", user, None).await
    }

    /// Partial update; the answer is the server's full representation.
    pub async fn update(&self, id: UserId, patch: &UpdateUser, token: &str) -> Result<User, ApiError> {
        self.client.patch(&format!("/users/{}/", id), patch, Some(token)).await
    }

    pub async fn delete(&self, id: UserId, token: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/users/{}/", id), Some(token)).await
    }

    /// The user the token belongs to.
    pub async fn me(&self, token: &str) -> Result<User, ApiError> {
        self.client.get("/users/me/", &Vec::new(), Some(token)).await
    }

    /// Users following `id`.
    pub async fn followers(&self, id: UserId, page: PageRequest) -> Result<Page<User>, ApiError> {
        let follows = FollowService::new(self.client.clone());
        let filter = FollowFilter { aim_user_id: Some(id), ..Default::default() };
        Ok(follows.list(filter, page).await?.map(|f| f.user))
    }

    /// Users `id` follows.
    pub async fn following(&self, id: UserId, page: PageRequest) -> Result<Page<User>, ApiError> {
        let follows = FollowService::new(self.client.clone());
        let filter = FollowFilter { user_id: Some(id), ..Default::default() };
        Ok(follows.list(filter, page).await?.map(|f| f.aim_user))
    }

    /// Posts liked by `id`. With a token, `is_liked` reflects the viewer.
    pub async fn liked_posts(
        &self,
        id: UserId,
        page: PageRequest,
        token: Option<&str>,
    ) -> Result<Page<Post>, ApiError> {
        self.client
            .get(&format!("/users/{}/liked-posts/", id), &paged(Vec::new(), page), token)
            .await
    }
}

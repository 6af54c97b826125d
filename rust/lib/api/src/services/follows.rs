use crate::error::ApiError;
use crate::http::{paged, ApiClient, Query};
use crate::model::{CreateFollow, EdgeId, Follow, UserId};
use crate::page::{Page, PageRequest};

/// Filter for `GET /follows/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowFilter {
    /// Follower.
    pub user_id: Option<UserId>,
    /// Followed user.
    pub aim_user_id: Option<UserId>,
}

impl FollowFilter {
    fn query(self) -> Query {
        let mut query = Vec::new();
        if let Some(id) = self.user_id {
            query.push(("user_id", id.to_string()));
        }
        if let Some(id) = self.aim_user_id {
            query.push(("aim_user_id", id.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone)]
pub struct FollowService {
    client: ApiClient,
}

impl FollowService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: FollowFilter, page: PageRequest) -> Result<Page<Follow>, ApiError> {
        self.client.get("/follows/", &paged(filter.query(), page), None).await
    }

    pub async fn get(&self, id: EdgeId) -> Result<Follow, ApiError> {
        self.client.get(&format!("/follows/{}/", id), &Vec::new(), None).await
    }

    pub async fn create(&self, aim_user_id: UserId, token: &str) -> Result<Follow, ApiError> {
        self.client.post("/follows/", &CreateFollow { aim_user_id }, Some(token)).await
    }

    pub async fn delete(&self, id: EdgeId, token: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/follows/{}/", id), Some(token)).await
    }

    /// The follow edge `viewer -> target`, if any.
    pub async fn find(&self, viewer: UserId, target: UserId) -> Result<Option<Follow>, ApiError> {
        let filter = FollowFilter { user_id: Some(viewer), aim_user_id: Some(target) };
        let page = self.list(filter, PageRequest::first(1)).await?;
        Ok(page.items.into_iter().next())
    }
}

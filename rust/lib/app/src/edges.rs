//! [`EdgeApi`] over the follow and like endpoints.

use async_trait::async_trait;
use shortsns_api::{ApiError, EdgeId, FollowService, LikeService, UserId};

use crate::toggle::{EdgeApi, TargetId};

/// Viewer follows a user. Target is the followed user's id.
#[derive(Debug, Clone)]
pub struct FollowEdges(pub FollowService);

/// Viewer likes a post. Target is the post id.
#[derive(Debug, Clone)]
pub struct LikeEdges(pub LikeService);

#[async_trait]
impl EdgeApi for FollowEdges {
    const KIND: &'static str = "follow";

    async fn create(&self, target: TargetId, token: &str) -> Result<EdgeId, ApiError> {
        Ok(self.0.create(target, token).await?.id)
    }

    async fn delete(&self, edge: EdgeId, token: &str) -> Result<(), ApiError> {
        self.0.delete(edge, token).await
    }

    async fn find(&self, viewer: UserId, target: TargetId) -> Result<Option<EdgeId>, ApiError> {
        Ok(self.0.find(viewer, target).await?.map(|f| f.id))
    }
}

#[async_trait]
impl EdgeApi for LikeEdges {
    const KIND: &'static str = "like";

    async fn create(&self, target: TargetId, token: &str) -> Result<EdgeId, ApiError> {
        Ok(self.0.create(target, token).await?.id)
    }

    async fn delete(&self, edge: EdgeId, token: &str) -> Result<(), ApiError> {
        self.0.delete(edge, token).await
    }

    async fn find(&self, viewer: UserId, target: TargetId) -> Result<Option<EdgeId>, ApiError> {
        Ok(self.0.find(viewer, target).await?.map(|l| l.id))
    }
}

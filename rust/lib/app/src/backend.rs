//! Service seams used by the app layer.
//!
//! The orchestrator and the loaders talk to these traits instead of the
//! concrete [`Services`] so tests can swap in fakes. [`Services`] is the
//! production implementation of both.

use async_trait::async_trait;
use shortsns_api::{
    ApiError, CreatePost, CreateUser, IdentityLogin, Page, PageRequest, Post, Services,
    UpdateUser, User, UserId,
};

use crate::feed::FeedSource;

/// Account calls needed by [`Auth`](crate::Auth).
#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn me(&self, token: &str) -> Result<User, ApiError>;

    /// Exchange email and password for a session token.
    async fn password_login(&self, email: &str, password: &str) -> Result<String, ApiError>;

    /// Exchange an identity assertion for a session token.
    async fn identity_login(&self, login: &IdentityLogin) -> Result<String, ApiError>;

    async fn create_user(&self, user: &CreateUser) -> Result<User, ApiError>;

    async fn update_user(&self, id: UserId, patch: &UpdateUser, token: &str) -> Result<User, ApiError>;
}

/// Post reads and writes needed by feeds, profiles and the composer.
#[async_trait]
pub trait PostApi: Send + Sync {
    async fn fetch_posts(
        &self,
        source: &FeedSource,
        page: PageRequest,
        token: Option<&str>,
    ) -> Result<Page<Post>, ApiError>;

    async fn user(&self, id: UserId) -> Result<User, ApiError>;

    async fn create_post(&self, post: &CreatePost, token: &str) -> Result<Post, ApiError>;
}

#[async_trait]
impl AccountApi for Services {
    async fn me(&self, token: &str) -> Result<User, ApiError> {
        self.users.me(token).await
    }

    async fn password_login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        Ok(self.auth.login(email, password).await?.token)
    }

    async fn identity_login(&self, login: &IdentityLogin) -> Result<String, ApiError> {
        Ok(self.auth.identity_login(login).await?.token)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User, ApiError> {
        self.users.create(user).await
    }

    async fn update_user(&self, id: UserId, patch: &UpdateUser, token: &str) -> Result<User, ApiError> {
        self.users.update(id, patch, token).await
    }
}

#[async_trait]
impl PostApi for Services {
    async fn fetch_posts(
        &self,
        source: &FeedSource,
        page: PageRequest,
        token: Option<&str>,
    ) -> Result<Page<Post>, ApiError> {
        match source {
            FeedSource::Timeline(tab) => self.timeline.get(*tab, page, token).await,
            FeedSource::Search(q) => self.search.posts(q, page, token).await,
            FeedSource::Ranking(range) => self.ranking.post_likes(*range, page, token).await,
            FeedSource::UserPosts(id) => self.posts.list(Some(*id), page, token).await,
            FeedSource::LikedPosts(id) => self.users.liked_posts(*id, page, token).await,
        }
    }

    async fn user(&self, id: UserId) -> Result<User, ApiError> {
        self.users.get(id).await
    }

    async fn create_post(&self, post: &CreatePost, token: &str) -> Result<Post, ApiError> {
        self.posts.create(post, token).await
    }
}

//! ShortSNS client core.
//!
//! Session handling, the auth state machine, optimistic follow/like
//! toggles and the view-state loaders, all publishing into one
//! path-addressed [`StateStore`].
//!
//! Everything hangs off an [`App`] that the embedder creates once and
//! passes around explicitly:
//!
//! ```ignore
//! use std::sync::Arc;
//! use shortsns_app::{App, FeedSource, FileSessionStore};
//! use shortsns_api::{ApiConfig, TimelineTab};
//!
//! let app = App::new(&ApiConfig::from_env(), Arc::new(FileSessionStore::new(path)))?;
//! app.hydrate().await;
//! app.store().subscribe("like/+", |path, _| println!("{} changed", path));
//!
//! let feed = app.feed(FeedSource::Timeline(TimelineTab::Latest));
//! app.load_first(&feed).await?;
//! app.toggle_like(feed.state().items[0].post_id).await?;
//! ```

pub mod auth;
pub mod backend;
pub mod compose;
pub mod edges;
pub mod feed;
pub mod identity;
pub mod profile;
pub mod session;
pub mod store;
pub mod toggle;

use std::sync::Arc;

use shortsns_api::{
    ApiClient, ApiConfig, ApiError, CreateUser, Page, PageRequest, Post, PostId, Services, UpdateUser, User, UserId,
};
use tracing::debug;

pub use auth::{Auth, AuthError, AuthPhase, AuthState};
pub use backend::{AccountApi, PostApi};
pub use compose::{ComposeError, ComposeState, Composer, MAX_POST_CHARS};
pub use edges::{FollowEdges, LikeEdges};
pub use feed::{Feed, FeedError, FeedSource, FeedState};
pub use identity::{IdentityAssertion, IdentityError};
pub use profile::{Profile, ProfilePage};
pub use session::{FileSessionStore, MemorySessionStore, SessionError, SessionStore, TOKEN_KEY};
pub use store::{StateStore, StateValue, SubscriptionId};
pub use toggle::{EdgeApi, Relation, TargetId, ToggleController, ToggleError};

/// Client context: API, state, session and the controllers built on them.
pub struct App {
    services: Services,
    store: Arc<StateStore>,
    auth: Auth<Services>,
    follows: ToggleController<FollowEdges>,
    likes: ToggleController<LikeEdges>,
    page_size: u32,
}

impl App {
    pub fn new(config: &ApiConfig, session: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        let services = Services::new(ApiClient::new(config)?);
        Ok(Self::with_services(services, session))
    }

    pub fn with_services(services: Services, session: Arc<dyn SessionStore>) -> Self {
        let store = Arc::new(StateStore::new());
        Self {
            auth: Auth::new(services.clone(), session, store.clone()),
            follows: ToggleController::new(FollowEdges(services.follows.clone()), store.clone()),
            likes: ToggleController::new(LikeEdges(services.likes.clone()), store.clone()),
            services,
            store,
            page_size: shortsns_api::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn api(&self) -> &Services {
        &self.services
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn auth(&self) -> &Auth<Services> {
        &self.auth
    }

    pub fn follows(&self) -> &ToggleController<FollowEdges> {
        &self.follows
    }

    pub fn likes(&self) -> &ToggleController<LikeEdges> {
        &self.likes
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    // ── Session ─────────────────────────────────────────────────────

    pub async fn hydrate(&self) -> AuthPhase {
        self.auth.hydrate().await
    }

    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.auth.login_with_password(email, password).await?;
        self.forget_viewer_state();
        Ok(user)
    }

    pub async fn login_with_identity_assertion(&self, assertion: &IdentityAssertion) -> Result<User, AuthError> {
        let user = self
            .auth
            .login_with_identity_assertion(&assertion.credential, &assertion.email, assertion.display_name())
            .await?;
        self.forget_viewer_state();
        Ok(user)
    }

    pub async fn register(&self, account: &CreateUser) -> Result<User, AuthError> {
        let user = self.auth.register(account).await?;
        self.forget_viewer_state();
        Ok(user)
    }

    pub fn logout(&self) {
        self.auth.logout();
        self.forget_viewer_state();
    }

    pub async fn update_profile(&self, patch: &UpdateUser) -> Result<User, AuthError> {
        let token = self.auth.token();
        let result = self.auth.update_profile(patch).await;
        if let Err(AuthError::Api(e)) = &result {
            self.on_api_error(token.as_deref(), e);
        }
        result
    }

    // ── Feeds and pages ─────────────────────────────────────────────

    pub fn feed(&self, source: FeedSource) -> Feed<Services> {
        Feed::new(self.services.clone(), self.store.clone(), source, self.page_size)
    }

    pub async fn load_first(&self, feed: &Feed<Services>) -> Result<FeedState, FeedError> {
        let token = self.auth.token();
        let result = feed.load_first(token.as_deref()).await;
        self.after_feed_load(token.as_deref(), result)
    }

    pub async fn load_more(&self, feed: &Feed<Services>) -> Result<FeedState, FeedError> {
        let token = self.auth.token();
        let result = feed.load_more(token.as_deref()).await;
        self.after_feed_load(token.as_deref(), result)
    }

    pub async fn load_profile(&self, user_id: UserId) -> Result<ProfilePage, ApiError> {
        let token = self.auth.token();
        let viewer = self.auth.current_user();
        let profile = Profile {
            api: &self.services,
            follows: &self.follows,
            store: &self.store,
            page_size: self.page_size,
        };
        let result = profile.load(user_id, viewer.as_ref(), token.as_deref()).await;
        match &result {
            Ok(page) => self.track_likes(&page.posts.items),
            Err(e) => self.on_api_error(token.as_deref(), e),
        }
        result
    }

    /// First page of the users following `user_id`.
    pub async fn followers(&self, user_id: UserId) -> Result<Page<User>, ApiError> {
        self.services.users.followers(user_id, PageRequest::first(self.page_size)).await
    }

    /// First page of the users `user_id` follows.
    pub async fn following(&self, user_id: UserId) -> Result<Page<User>, ApiError> {
        self.services.users.following(user_id, PageRequest::first(self.page_size)).await
    }

    pub fn composer(&self) -> Composer<Services> {
        Composer::new(self.services.clone(), self.store.clone())
    }

    /// Create a post as the current user.
    pub async fn compose(&self, text: &str) -> Result<Post, ComposeError> {
        let token = self.auth.token();
        let result = self.composer().submit(text, token.as_deref()).await;
        match &result {
            Ok(post) => {
                self.likes.track(post.post_id, None, post.like_count);
            }
            Err(ComposeError::Api(e)) => self.on_api_error(token.as_deref(), e),
            Err(_) => {}
        }
        result
    }

    // ── Toggles ─────────────────────────────────────────────────────

    pub async fn toggle_follow(&self, user_id: UserId) -> Result<Relation, ToggleError> {
        self.change_follow(user_id, None).await
    }

    /// Follow or unfollow; a no-op if the server already agrees.
    pub async fn set_follow(&self, user_id: UserId, follow: bool) -> Result<Relation, ToggleError> {
        self.change_follow(user_id, Some(follow)).await
    }

    pub async fn toggle_like(&self, post_id: PostId) -> Result<Relation, ToggleError> {
        self.change_like(post_id, None).await
    }

    /// Like or unlike; a no-op if the server already agrees.
    pub async fn set_like(&self, post_id: PostId, like: bool) -> Result<Relation, ToggleError> {
        self.change_like(post_id, Some(like)).await
    }

    /// `want = None` flips whatever is tracked; `Some` re-reads the edge
    /// from the server first and only calls out if it differs.
    async fn change_follow(&self, user_id: UserId, want: Option<bool>) -> Result<Relation, ToggleError> {
        let token = self.auth.token().ok_or(ToggleError::NoSession)?;
        let result: Result<Relation, ToggleError> = async {
            let current = match (want, self.follows.relation(user_id)) {
                (None, Some(relation)) => relation,
                _ => {
                    let viewer = self.auth.current_user().ok_or(ToggleError::NoSession)?;
                    let user = self.services.users.get(user_id).await?;
                    self.follows.sync(user_id, viewer.user_id, user.stats.follower_count).await?
                }
            };
            match want {
                Some(want) if current.is_active() == want => Ok(current),
                _ => self.follows.toggle(user_id, Some(&token)).await,
            }
        }
        .await;
        if let Err(ToggleError::Api(e)) = &result {
            self.on_api_error(Some(&token), e);
        }
        result
    }

    async fn change_like(&self, post_id: PostId, want: Option<bool>) -> Result<Relation, ToggleError> {
        let token = self.auth.token().ok_or(ToggleError::NoSession)?;
        let result: Result<Relation, ToggleError> = async {
            let current = match (want, self.likes.relation(post_id)) {
                (None, Some(relation)) => relation,
                _ => {
                    let viewer = self.auth.current_user().ok_or(ToggleError::NoSession)?;
                    let post = self.services.posts.get(post_id).await?;
                    self.likes.sync(post_id, viewer.user_id, post.like_count).await?
                }
            };
            match want {
                Some(want) if current.is_active() == want => Ok(current),
                _ => self.likes.toggle(post_id, Some(&token)).await,
            }
        }
        .await;
        if let Err(ToggleError::Api(e)) = &result {
            self.on_api_error(Some(&token), e);
        }
        result
    }

    // ── Internals ───────────────────────────────────────────────────

    fn after_feed_load(
        &self,
        token: Option<&str>,
        result: Result<FeedState, FeedError>,
    ) -> Result<FeedState, FeedError> {
        match &result {
            Ok(state) => self.track_likes(&state.items),
            Err(FeedError::Api(e)) => self.on_api_error(token, e),
            Err(FeedError::NotAuthenticated) => {}
        }
        result
    }

    /// Seed like relations from listed posts. A post the viewer likes is
    /// left untracked until its edge id is looked up, unless the edge is
    /// already known.
    fn track_likes(&self, posts: &[Post]) {
        for post in posts {
            match (post.is_liked, self.likes.relation(post.post_id)) {
                (false, _) => {
                    self.likes.track(post.post_id, None, post.like_count);
                }
                (true, Some(relation)) if relation.is_active() => {
                    self.likes.track(post.post_id, relation.edge, post.like_count);
                }
                (true, _) => {}
            }
        }
    }

    /// A 401 on any request made with the current token ends the session.
    /// A 401 for a token that has since been replaced changes nothing.
    fn on_api_error(&self, token: Option<&str>, error: &ApiError) {
        if let (true, Some(token)) = (error.is_unauthorized(), token) {
            if self.auth.invalidate(token) {
                self.forget_viewer_state();
            }
        }
    }

    /// Relations and page state belong to a viewer.
    fn forget_viewer_state(&self) {
        debug!("dropping viewer-scoped state");
        self.follows.forget_all();
        self.likes.forget_all();
        self.store.remove_prefix("profile");
        self.store.remove(ComposeState::PATH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        // Nothing listens here; these tests never reach the network.
        let config = ApiConfig::new("http://127.0.0.1:9/api");
        App::new(&config, Arc::new(MemorySessionStore::new())).unwrap()
    }

    #[tokio::test]
    async fn signed_out_actions_are_refused_locally() {
        let app = app();
        assert_eq!(app.hydrate().await, AuthPhase::Anonymous);

        assert!(matches!(app.toggle_follow(2).await, Err(ToggleError::NoSession)));
        assert!(matches!(app.set_like(3, true).await, Err(ToggleError::NoSession)));
        assert!(matches!(app.compose("hello").await, Err(ComposeError::NotAuthenticated)));

        let following = app.feed(FeedSource::Timeline(shortsns_api::TimelineTab::Following));
        assert!(matches!(app.load_first(&following).await, Err(FeedError::NotAuthenticated)));
    }

    #[test]
    fn logout_drops_viewer_state() {
        let app = app().with_page_size(5);
        assert_eq!(app.page_size(), 5);

        app.likes().track(1, Some(10), 3);
        app.follows().track(2, Some(20), 4);
        assert!(app.store().get("like/1").is_some());

        app.logout();
        assert!(app.likes().relation(1).is_none());
        assert!(app.follows().relation(2).is_none());
        assert!(app.store().get("follow/2").is_none());
        assert_eq!(app.auth().phase(), AuthPhase::Anonymous);
    }

    #[test]
    fn stale_unauthorized_keeps_viewer_state() {
        let app = app();
        app.likes().track(1, Some(10), 3);
        app.follows().track(2, Some(20), 4);

        let expired = ApiError::Unauthorized { message: "Invalid token.".into() };
        app.on_api_error(Some("replaced"), &expired);

        assert!(app.likes().relation(1).is_some());
        assert!(app.follows().relation(2).is_some());
        assert!(app.store().get("like/1").is_some());
    }

    #[test]
    fn track_likes_leaves_unknown_edges_untracked() {
        let app = app();
        app.likes().track(3, Some(30), 1);
        let posts = vec![
            Post { post_id: 1, like_count: 2, is_liked: false, ..Default::default() },
            Post { post_id: 2, like_count: 5, is_liked: true, ..Default::default() },
            Post { post_id: 3, like_count: 9, is_liked: true, ..Default::default() },
        ];
        app.track_likes(&posts);

        assert_eq!(app.likes().relation(1), Some(Relation { edge: None, count: 2, pending: false }));
        assert!(app.likes().relation(2).is_none());
        assert_eq!(app.likes().relation(3), Some(Relation { edge: Some(30), count: 9, pending: false }));
    }
}

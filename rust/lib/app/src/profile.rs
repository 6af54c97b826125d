//! Profile page: a user, their latest posts and the viewer's follow
//! relation to them.

use shortsns_api::{ApiError, Page, PageRequest, Post, User, UserId};
use tracing::warn;

use crate::backend::PostApi;
use crate::feed::FeedSource;
use crate::store::StateStore;
use crate::toggle::{EdgeApi, Relation, ToggleController};

#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePage {
    pub user: User,
    pub posts: Page<Post>,
    /// The viewer is looking at their own profile.
    pub is_self: bool,
    /// Viewer's follow relation. `None` when signed out, on the viewer's
    /// own page, or when the lookup failed.
    pub follow: Option<Relation>,
}

impl ProfilePage {
    pub fn path(user_id: UserId) -> String {
        format!("profile/{}", user_id)
    }
}

pub struct Profile<'a, P, E> {
    pub api: &'a P,
    pub follows: &'a ToggleController<E>,
    pub store: &'a StateStore,
    pub page_size: u32,
}

impl<P: PostApi, E: EdgeApi> Profile<'_, P, E> {
    /// Load and publish the profile of `user_id`.
    ///
    /// A failed follow lookup only leaves `follow` empty; the page itself
    /// still loads.
    pub async fn load(
        &self,
        user_id: UserId,
        viewer: Option<&User>,
        token: Option<&str>,
    ) -> Result<ProfilePage, ApiError> {
        let user = self.api.user(user_id).await?;
        let posts = self
            .api
            .fetch_posts(&FeedSource::UserPosts(user_id), PageRequest::first(self.page_size), token)
            .await?;

        let is_self = viewer.is_some_and(|v| v.user_id == user_id);
        let follow = match viewer {
            Some(v) if !is_self => {
                match self.follows.sync(user_id, v.user_id, user.stats.follower_count).await {
                    Ok(relation) => Some(relation),
                    Err(e) => {
                        warn!(user_id, error = %e, "follow lookup failed");
                        None
                    }
                }
            }
            _ => None,
        };

        let page = ProfilePage { user, posts, is_self, follow };
        self.store.set(&ProfilePage::path(user_id), page.clone());
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shortsns_api::{CreatePost, EdgeId, UserStats};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakePosts;

    #[async_trait]
    impl PostApi for FakePosts {
        async fn fetch_posts(
            &self,
            source: &FeedSource,
            _page: PageRequest,
            _token: Option<&str>,
        ) -> Result<Page<Post>, ApiError> {
            let FeedSource::UserPosts(id) = source else {
                return Ok(Page::empty());
            };
            let author = User { user_id: *id, ..Default::default() };
            Ok(Page {
                total_count: 1,
                next_page_token: None,
                previous_page_token: None,
                items: vec![Post { post_id: 10, user: author, ..Default::default() }],
            })
        }

        async fn user(&self, id: UserId) -> Result<User, ApiError> {
            if id == 404 {
                return Err(ApiError::NotFound { message: "Not found.".into() });
            }
            Ok(User {
                user_id: id,
                stats: UserStats { follower_count: 7, ..Default::default() },
                ..Default::default()
            })
        }

        async fn create_post(&self, _post: &CreatePost, _token: &str) -> Result<Post, ApiError> {
            unreachable!()
        }
    }

    #[derive(Default)]
    struct FakeFollows {
        finds: AtomicUsize,
        broken: bool,
    }

    #[async_trait]
    impl EdgeApi for FakeFollows {
        const KIND: &'static str = "follow";

        async fn create(&self, _target: u64, _token: &str) -> Result<EdgeId, ApiError> {
            unreachable!()
        }

        async fn delete(&self, _edge: EdgeId, _token: &str) -> Result<(), ApiError> {
            unreachable!()
        }

        async fn find(&self, _viewer: UserId, _target: u64) -> Result<Option<EdgeId>, ApiError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(ApiError::Server { status: 502, message: "bad gateway".into() });
            }
            Ok(Some(42))
        }
    }

    fn viewer() -> User {
        User { user_id: 1, ..Default::default() }
    }

    #[tokio::test]
    async fn other_users_profile_carries_follow_relation() {
        let store = Arc::new(StateStore::new());
        let follows = ToggleController::new(FakeFollows::default(), store.clone());
        let profile = Profile { api: &FakePosts, follows: &follows, store: &store, page_size: 20 };

        let page = profile.load(2, Some(&viewer()), Some("tok")).await.unwrap();
        assert!(!page.is_self);
        assert_eq!(page.posts.items[0].post_id, 10);
        assert_eq!(page.follow, Some(Relation { edge: Some(42), count: 7, pending: false }));
        assert_eq!(follows.relation(2), page.follow);
        assert_eq!(store.read::<ProfilePage>("profile/2"), Some(page));
    }

    #[tokio::test]
    async fn own_profile_skips_follow_lookup() {
        let store = Arc::new(StateStore::new());
        let follows = ToggleController::new(FakeFollows::default(), store.clone());
        let profile = Profile { api: &FakePosts, follows: &follows, store: &store, page_size: 20 };

        let page = profile.load(1, Some(&viewer()), Some("tok")).await.unwrap();
        assert!(page.is_self);
        assert!(page.follow.is_none());

        let anonymous = profile.load(2, None, None).await.unwrap();
        assert!(anonymous.follow.is_none());
        assert_eq!(follows.edges().finds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_follow_lookup_still_loads() {
        let store = Arc::new(StateStore::new());
        let follows = ToggleController::new(FakeFollows { broken: true, ..Default::default() }, store.clone());
        let profile = Profile { api: &FakePosts, follows: &follows, store: &store, page_size: 20 };

        let page = profile.load(2, Some(&viewer()), Some("tok")).await.unwrap();
        assert!(page.follow.is_none());
        assert!(follows.relation(2).is_none());
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let store = Arc::new(StateStore::new());
        let follows = ToggleController::new(FakeFollows::default(), store.clone());
        let profile = Profile { api: &FakePosts, follows: &follows, store: &store, page_size: 20 };

        let err = profile.load(404, None, None).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.get("profile/404").is_none());
    }
}

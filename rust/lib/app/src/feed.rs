//! Paged post lists: timeline tabs, post search, rankings, a user's posts.
//!
//! A [`Feed`] keeps the concatenation of the pages loaded so far and
//! publishes it at [`FeedSource::path`]. Like changes published by the
//! like controller are folded into matching items by post id.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use shortsns_api::{ApiError, Page, PageRequest, Post, PostId, RankingRange, TimelineTab, UserId};
use tracing::debug;

use crate::backend::PostApi;
use crate::store::{StateStore, SubscriptionId};
use crate::toggle::Relation;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedSource {
    Timeline(TimelineTab),
    /// Post search.
    Search(String),
    /// Most liked posts.
    Ranking(RankingRange),
    UserPosts(UserId),
    LikedPosts(UserId),
}

impl FeedSource {
    pub fn path(&self) -> String {
        match self {
            FeedSource::Timeline(tab) => format!("timeline/{}", tab.as_str()),
            FeedSource::Search(_) => "search/posts".to_string(),
            FeedSource::Ranking(range) => format!("ranking/posts/{}", range.as_str()),
            FeedSource::UserPosts(id) => format!("user/{}/posts", id),
            FeedSource::LikedPosts(id) => format!("user/{}/liked", id),
        }
    }

    /// The following tab is computed from the viewer's follows.
    pub fn requires_auth(&self) -> bool {
        matches!(self, FeedSource::Timeline(TimelineTab::Following))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub items: Vec<Post>,
    /// Last loaded page, 0 before the first load.
    pub page: u32,
    pub total_count: u64,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("sign in to see this feed")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Default)]
struct Inner {
    view: FeedState,
    /// Bumped by every first-page load; older loads drop their result.
    generation: u64,
}

pub struct Feed<P> {
    api: P,
    store: Arc<StateStore>,
    source: FeedSource,
    path: String,
    page_size: u32,
    inner: Arc<Mutex<Inner>>,
    like_subscription: SubscriptionId,
}

impl<P: PostApi> Feed<P> {
    pub fn new(api: P, store: Arc<StateStore>, source: FeedSource, page_size: u32) -> Self {
        let path = source.path();
        let inner = Arc::new(Mutex::new(Inner::default()));

        let like_subscription = {
            let inner = inner.clone();
            let store_ref: Weak<StateStore> = Arc::downgrade(&store);
            let path = path.clone();
            store.subscribe("like/+", move |changed, value| {
                let (Some(relation), Some(post_id)) = (
                    value.downcast_ref::<Relation>(),
                    changed.rsplit('/').next().and_then(|id| id.parse::<PostId>().ok()),
                ) else {
                    return;
                };
                let updated = apply_like(&inner, post_id, relation.is_active(), relation.count);
                if let (Some(view), Some(store)) = (updated, store_ref.upgrade()) {
                    store.set(&path, view);
                }
            })
        };

        Self {
            api,
            store,
            source,
            path,
            page_size: page_size.max(1),
            inner,
            like_subscription,
        }
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    pub fn state(&self) -> FeedState {
        self.lock().view.clone()
    }

    /// Replace the items with page 1.
    pub async fn load_first(&self, token: Option<&str>) -> Result<FeedState, FeedError> {
        if self.source.requires_auth() && token.is_none() {
            let view = self.update(|inner| {
                inner.generation += 1;
                inner.view = FeedState {
                    error: Some(FeedError::NotAuthenticated.to_string()),
                    ..FeedState::default()
                };
                inner.view.clone()
            });
            self.store.set(&self.path, view);
            return Err(FeedError::NotAuthenticated);
        }

        let generation = self.update(|inner| {
            inner.generation += 1;
            inner.view.loading = true;
            inner.generation
        });
        self.publish();

        let request = PageRequest::first(self.page_size);
        let result = self.api.fetch_posts(&self.source, request, token).await;
        self.finish(generation, request.page, result, false)
    }

    /// Append the next page. A no-op while a load is open or when the last
    /// page had no `next` cursor.
    pub async fn load_more(&self, token: Option<&str>) -> Result<FeedState, FeedError> {
        let started = self.update(|inner| {
            if inner.view.loading || !inner.view.has_more {
                return None;
            }
            inner.view.loading = true;
            Some((inner.generation, inner.view.page + 1))
        });
        let Some((generation, page)) = started else {
            return Ok(self.state());
        };
        self.publish();

        let request = PageRequest::new(page, self.page_size);
        let result = self.api.fetch_posts(&self.source, request, token).await;
        self.finish(generation, page, result, true)
    }

    /// Set like flag and count on the item with `post_id`. Returns whether
    /// an item matched.
    pub fn apply_like(&self, post_id: PostId, liked: bool, count: u64) -> bool {
        match apply_like(&self.inner, post_id, liked, count) {
            Some(view) => {
                self.store.set(&self.path, view);
                true
            }
            None => false,
        }
    }

    /// Put a freshly created post at the top.
    pub fn prepend(&self, post: Post) {
        let view = self.update(|inner| {
            inner.view.items.retain(|p| p.post_id != post.post_id);
            inner.view.items.insert(0, post);
            inner.view.total_count += 1;
            inner.view.clone()
        });
        self.store.set(&self.path, view);
    }

    fn finish(
        &self,
        generation: u64,
        page: u32,
        result: Result<Page<Post>, ApiError>,
        append: bool,
    ) -> Result<FeedState, FeedError> {
        let view = self.update(|inner| {
            if inner.generation != generation {
                return None;
            }
            let view = &mut inner.view;
            view.loading = false;
            match &result {
                Ok(loaded) => {
                    if !append {
                        view.items.clear();
                    }
                    let fresh: Vec<Post> = loaded
                        .items
                        .iter()
                        .filter(|p| !view.items.iter().any(|have| have.post_id == p.post_id))
                        .cloned()
                        .collect();
                    view.items.extend(fresh);
                    view.page = page;
                    view.total_count = loaded.total_count;
                    view.has_more = loaded.has_next();
                    view.error = None;
                }
                Err(e) => view.error = Some(e.to_string()),
            }
            Some(view.clone())
        });

        match view {
            Some(view) => {
                self.store.set(&self.path, view.clone());
                result.map(|_| view).map_err(FeedError::from)
            }
            None => {
                debug!(path = %self.path, page, "dropping superseded page");
                result.map(|_| self.state()).map_err(FeedError::from)
            }
        }
    }

    fn publish(&self) {
        let view = self.state();
        self.store.set(&self.path, view);
    }

    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> Drop for Feed<P> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.like_subscription);
    }
}

fn apply_like(inner: &Mutex<Inner>, post_id: PostId, liked: bool, count: u64) -> Option<FeedState> {
    let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
    let post = inner.view.items.iter_mut().find(|p| p.post_id == post_id)?;
    if post.is_liked == liked && post.like_count == count {
        return None;
    }
    post.is_liked = liked;
    post.like_count = count;
    Some(inner.view.clone())
}

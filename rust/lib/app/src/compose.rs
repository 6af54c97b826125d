//! New-post composer, published at `compose/state`.

use std::sync::Arc;

use shortsns_api::{ApiError, CreatePost, Post, PostId};
use tracing::info;

use crate::backend::PostApi;
use crate::store::StateStore;

/// Longest accepted post, in characters.
pub const MAX_POST_CHARS: usize = 280;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeState {
    pub busy: bool,
    pub error: Option<String>,
    /// Id of the last post created from this composer.
    pub last_post: Option<PostId>,
}

impl ComposeState {
    pub const PATH: &'static str = "compose/state";
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("sign in to post")]
    NotAuthenticated,

    #[error("post is empty")]
    Empty,

    #[error("post is {len} characters, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Trim `text` and check it against the length limit.
pub fn validate(text: &str) -> Result<&str, ComposeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ComposeError::Empty);
    }
    let len = text.chars().count();
    if len > MAX_POST_CHARS {
        return Err(ComposeError::TooLong { len, max: MAX_POST_CHARS });
    }
    Ok(text)
}

pub struct Composer<P> {
    api: P,
    store: Arc<StateStore>,
}

impl<P: PostApi> Composer<P> {
    pub fn new(api: P, store: Arc<StateStore>) -> Self {
        Self { api, store }
    }

    /// Validate locally, then create the post. Nothing is sent when
    /// validation fails.
    pub async fn submit(&self, text: &str, token: Option<&str>) -> Result<Post, ComposeError> {
        let token = match token {
            Some(token) => token,
            None => return Err(self.fail(ComposeError::NotAuthenticated)),
        };
        let context = match validate(text) {
            Ok(context) => context.to_string(),
            Err(e) => return Err(self.fail(e)),
        };

        self.publish(ComposeState { busy: true, ..self.state() });
        match self.api.create_post(&CreatePost { context }, token).await {
            Ok(post) => {
                info!(post_id = post.post_id, "post created");
                self.publish(ComposeState { busy: false, error: None, last_post: Some(post.post_id) });
                Ok(post)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub fn state(&self) -> ComposeState {
        self.store.read::<ComposeState>(ComposeState::PATH).unwrap_or_default()
    }

    fn fail(&self, error: ComposeError) -> ComposeError {
        self.publish(ComposeState { busy: false, error: Some(error.to_string()), ..self.state() });
        error
    }

    fn publish(&self, state: ComposeState) {
        self.store.set(ComposeState::PATH, state);
    }
}

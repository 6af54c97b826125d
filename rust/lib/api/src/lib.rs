//! ShortSNS REST client.
//!
//! Typed access to the ShortSNS backend: entities, the pagination
//! envelope, and one service per resource family. Authentication is a
//! per-call session token; this crate never stores it.
//!
//! # Usage
//!
//! ```ignore
//! use shortsns_api::{ApiClient, ApiConfig, PageRequest, Services, TimelineTab};
//!
//! let client = ApiClient::new(&ApiConfig::from_env())?;
//! let api = Services::new(client);
//! let page = api.timeline.get(TimelineTab::Latest, PageRequest::default(), None).await?;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod page;
pub mod services;

pub use config::ApiConfig;
pub use error::ApiError;
pub use http::{ApiClient, AUTH_SCHEME};
pub use model::*;
pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE};
pub use services::follows::FollowFilter;
pub use services::{
    AuthService, FollowService, LikeService, PostService, RankingService, SearchService, Services,
    TimelineService, UserService,
};

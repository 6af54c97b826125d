//! Typed façades over [`ApiClient`], one per resource family.
//!
//! Each call builds exactly one request, decodes the body and hands any
//! error back unchanged: no retries, no caching.

pub mod auth;
pub mod follows;
pub mod likes;
pub mod posts;
pub mod ranking;
pub mod search;
pub mod timeline;
pub mod users;

pub use auth::AuthService;
pub use follows::FollowService;
pub use likes::LikeService;
pub use posts::PostService;
pub use ranking::RankingService;
pub use search::SearchService;
pub use timeline::TimelineService;
pub use users::UserService;

use crate::http::ApiClient;

/// All services sharing one client.
#[derive(Debug, Clone)]
pub struct Services {
    pub auth: AuthService,
    pub users: UserService,
    pub posts: PostService,
    pub follows: FollowService,
    pub likes: LikeService,
    pub timeline: TimelineService,
    pub search: SearchService,
    pub ranking: RankingService,
}

impl Services {
    pub fn new(client: ApiClient) -> Self {
        Self {
            auth: AuthService::new(client.clone()),
            users: UserService::new(client.clone()),
            posts: PostService::new(client.clone()),
            follows: FollowService::new(client.clone()),
            likes: LikeService::new(client.clone()),
            timeline: TimelineService::new(client.clone()),
            search: SearchService::new(client.clone()),
            ranking: RankingService::new(client),
        }
    }
}

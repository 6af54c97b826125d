use crate::error::ApiError;
use crate::http::{paged, ApiClient};
use crate::model::{Post, RankingRange, User, UserRanking};
use crate::page::{Page, PageRequest};

#[derive(Debug, Clone)]
pub struct RankingService {
    client: ApiClient,
}

impl RankingService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Most liked posts within `range`.
    pub async fn post_likes(
        &self,
        range: RankingRange,
        page: PageRequest,
        token: Option<&str>,
    ) -> Result<Page<Post>, ApiError> {
        let query = vec![("range", range.as_str().to_string())];
        self.client.get("/rankings/posts/likes/", &paged(query, page), token).await
    }

    pub async fn users(&self, board: UserRanking, page: PageRequest) -> Result<Page<User>, ApiError> {
        let path = format!("/rankings/users/{}/", board.as_str());
        self.client.get(&path, &paged(Vec::new(), page), None).await
    }
}

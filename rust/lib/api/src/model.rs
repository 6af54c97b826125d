//! Wire entities and request bodies.
//!
//! Field names follow the backend's JSON exactly; Rust-side names only
//! differ where the backend uses non-snake-case keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type PostId = u64;
/// Server-assigned id of a follow or like record.
pub type EdgeId = u64;

// ── Users ───────────────────────────────────────────────────────────

/// Per-user counters maintained by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub experience_points: u64,
    pub total_likes_received: u64,
    pub total_likes_given: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub post_count: u64,
    #[serde(default)]
    pub last_level_up: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    /// Handle, unique.
    pub username: String,
    /// Display name.
    pub user_name: String,
    pub user_level: u32,
    pub user_rank: String,
    #[serde(default)]
    pub user_mail: String,
    #[serde(rename = "user_URL", default)]
    pub user_url: String,
    #[serde(default)]
    pub user_bio: String,
    pub stats: UserStats,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// Body of `POST /users/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateUser {
    pub username: String,
    pub user_name: String,
    pub user_mail: String,
    pub password: String,
    #[serde(rename = "user_URL", skip_serializing_if = "Option::is_none")]
    pub user_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_bio: Option<String>,
}

/// Body of `PATCH /users/{id}/`. Only the fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(rename = "user_URL", skip_serializing_if = "Option::is_none")]
    pub user_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_bio: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none() && self.user_url.is_none() && self.user_bio.is_none()
    }
}

// ── Posts ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: PostId,
    pub user: User,
    /// Post text.
    pub context: String,
    pub like_count: u64,
    pub time: DateTime<Utc>,
    /// Whether the requesting viewer likes this post. Always false for
    /// anonymous requests.
    #[serde(default)]
    pub is_liked: bool,
}

/// Body of `POST /posts/` and `PATCH /posts/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePost {
    pub context: String,
}

// ── Follows / likes ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub id: EdgeId,
    /// The follower.
    pub user: User,
    /// The followed user.
    pub aim_user: User,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateFollow {
    pub aim_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: EdgeId,
    pub user: User,
    pub post: Post,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateLike {
    pub post_id: PostId,
}

/// Answer of `GET /posts/liked-status/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LikedStatus {
    pub liked_post_ids: Vec<PostId>,
}

// ── Auth ────────────────────────────────────────────────────────────

/// Answer of both login endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Body of `POST /auth/login/`.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordLogin {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/google/`: an identity assertion issued by the
/// external identity provider plus the profile hints it carries.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityLogin {
    pub id_token: String,
    pub email: String,
    pub display_name: String,
}

// ── Listing parameters ──────────────────────────────────────────────

/// Home timeline tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineTab {
    #[default]
    Latest,
    Popular,
    /// Posts of followed users; only meaningful with a session token.
    Following,
}

impl TimelineTab {
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineTab::Latest => "latest",
            TimelineTab::Popular => "popular",
            TimelineTab::Following => "following",
        }
    }
}

/// Time window of the post-likes ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingRange {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "all")]
    All,
}

impl RankingRange {
    pub fn as_str(self) -> &'static str {
        match self {
            RankingRange::Day => "24h",
            RankingRange::All => "all",
        }
    }
}

/// User ranking boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRanking {
    TotalLikes,
    Level,
    Followers,
}

impl UserRanking {
    /// Path segment under `/rankings/users/`.
    pub fn as_str(self) -> &'static str {
        match self {
            UserRanking::TotalLikes => "total-likes",
            UserRanking::Level => "level",
            UserRanking::Followers => "followers",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_json() -> serde_json::Value {
        serde_json::json!({
            "user_id": 7,
            "username": "alice",
            "user_name": "Alice",
            "user_level": 3,
            "user_rank": "silver",
            "user_mail": "alice@example.com",
            "user_URL": "https://alice.dev",
            "user_bio": "hi",
            "stats": {
                "experience_points": 120,
                "total_likes_received": 9,
                "total_likes_given": 4,
                "follower_count": 2,
                "following_count": 5,
                "post_count": 11,
                "last_level_up": null,
                "updated_at": "2024-05-01T12:00:00Z"
            },
            "rank": null
        })
    }

    #[test]
    fn user_decodes_backend_field_names() {
        let user: User = serde_json::from_value(user_json()).unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.user_url, "https://alice.dev");
        assert_eq!(user.stats.follower_count, 2);
        assert!(user.stats.last_level_up.is_none());
        assert!(user.rank.is_none());
    }

    #[test]
    fn post_defaults_is_liked_to_false() {
        let post: Post = serde_json::from_value(serde_json::json!({
            "post_id": 1,
            "user": user_json(),
            "context": "hello",
            "like_count": 3,
            "time": "2024-05-02T08:30:00+09:00",
        }))
        .unwrap();
        assert!(!post.is_liked);
        assert_eq!(post.like_count, 3);
        assert_eq!(post.time.to_rfc3339(), "2024-05-01T23:30:00+00:00");
    }

    #[test]
    fn update_user_omits_unset_fields() {
        let patch = UpdateUser { user_url: Some("https://x".into()), ..Default::default() };
        let v = serde_json::to_value(&patch).unwrap();
        assert_eq!(v, serde_json::json!({ "user_URL": "https://x" }));
        assert!(!patch.is_empty());
        assert!(UpdateUser::default().is_empty());
    }

    #[test]
    fn enum_wire_names() {
        assert_eq!(serde_json::to_value(TimelineTab::Following).unwrap(), "following");
        assert_eq!(serde_json::to_value(RankingRange::Day).unwrap(), "24h");
        assert_eq!(RankingRange::All.as_str(), "all");
        assert_eq!(UserRanking::TotalLikes.as_str(), "total-likes");
    }
}

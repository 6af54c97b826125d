pub mod account;
pub mod posts;
pub mod settings;
pub mod users;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use shortsns_api::{Post, User};
use shortsns_app::{App, AuthPhase, FileSessionStore};
use tracing::debug;

use crate::config::ClientConfig;

/// Build the client for the config at `config_path` and restore the
/// saved session.
pub async fn connect(config_path: &Path) -> Result<App> {
    let config = ClientConfig::load(config_path)?;
    let api = config.api_config();
    let session = FileSessionStore::new(ClientConfig::session_path(config_path));
    debug!(server = %api.base_url, session = %session.path().display(), "connecting");

    let app = App::new(&api, Arc::new(session))?.with_page_size(config.page_size);
    if app.hydrate().await == AuthPhase::Authenticated {
        debug!("session restored");
    }
    Ok(app)
}

/// Read one line from stdin after printing `label` to stderr.
pub fn prompt(label: &str) -> Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_posts(posts: &[Post], json: bool) -> Result<()> {
    if json {
        return print_json(posts);
    }
    if posts.is_empty() {
        println!("No posts.");
        return Ok(());
    }
    for post in posts {
        let liked = if post.is_liked { ", liked" } else { "" };
        println!(
            "#{} @{} ({} likes{}) {}",
            post.post_id,
            post.user.username,
            post.like_count,
            liked,
            post.time.format("%Y-%m-%d %H:%M"),
        );
        println!("    {}", post.context);
    }
    Ok(())
}

pub fn print_users(users: &[User], json: bool) -> Result<()> {
    if json {
        return print_json(users);
    }
    if users.is_empty() {
        println!("No users.");
        return Ok(());
    }
    println!("{:<4} {:<8} {:<20} {:<24} {:>6} {:>9} {:>7}", "RANK", "ID", "USERNAME", "NAME", "LEVEL", "FOLLOWERS", "LIKES");
    for user in users {
        let rank = user.rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<8} {:<20} {:<24} {:>6} {:>9} {:>7}",
            rank,
            user.user_id,
            user.username,
            user.user_name,
            user.user_level,
            user.stats.follower_count,
            user.stats.total_likes_received,
        );
    }
    Ok(())
}

pub fn print_user(user: &User, json: bool) -> Result<()> {
    if json {
        return print_json(user);
    }
    println!("{} (@{}), id {}", user.user_name, user.username, user.user_id);
    println!("  level {} ({})", user.user_level, user.user_rank);
    println!(
        "  {} posts, {} followers, {} following, {} likes received",
        user.stats.post_count,
        user.stats.follower_count,
        user.stats.following_count,
        user.stats.total_likes_received,
    );
    if !user.user_url.is_empty() {
        println!("  {}", user.user_url);
    }
    if !user.user_bio.is_empty() {
        println!("  {}", user.user_bio);
    }
    Ok(())
}

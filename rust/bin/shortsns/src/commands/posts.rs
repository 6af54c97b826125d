//! Feeds, posting and likes.

use anyhow::Result;
use shortsns_api::{PostId, RankingRange, TimelineTab, UserId};
use shortsns_app::{App, FeedSource, FeedState};

use super::{print_json, print_posts};

pub async fn timeline(app: &App, tab: TimelineTab, pages: u32, json: bool) -> Result<()> {
    let state = load(app, FeedSource::Timeline(tab), pages).await?;
    show(&state, json)
}

pub async fn search(app: &App, query: &str, json: bool) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Search query cannot be empty.");
    }
    let state = load(app, FeedSource::Search(query.to_string()), 1).await?;
    show(&state, json)
}

pub async fn ranking(app: &App, range: RankingRange, json: bool) -> Result<()> {
    let state = load(app, FeedSource::Ranking(range), 1).await?;
    show(&state, json)
}

/// Posts `user_id` has liked.
pub async fn liked(app: &App, user_id: UserId, pages: u32, json: bool) -> Result<()> {
    let state = load(app, FeedSource::LikedPosts(user_id), pages).await?;
    show(&state, json)
}

pub async fn post(app: &App, text: &str, json: bool) -> Result<()> {
    let post = app.compose(text).await?;
    if json {
        return print_json(&post);
    }
    println!("Posted #{}.", post.post_id);
    Ok(())
}

/// Make the viewer's like on `post_id` match `like`.
pub async fn like(app: &App, post_id: PostId, like: bool) -> Result<()> {
    let relation = app.set_like(post_id, like).await?;
    let verb = if relation.is_active() { "liked" } else { "not liked" };
    println!("Post #{} is {} ({} likes).", post_id, verb, relation.count);
    Ok(())
}

/// Load up to `pages` pages, stopping early when the feed runs out.
async fn load(app: &App, source: FeedSource, pages: u32) -> Result<FeedState> {
    let feed = app.feed(source);
    let mut state = app.load_first(&feed).await?;
    for _ in 1..pages {
        if !state.has_more {
            break;
        }
        state = app.load_more(&feed).await?;
    }
    Ok(state)
}

fn show(state: &FeedState, json: bool) -> Result<()> {
    print_posts(&state.items, json)?;
    if !json && state.has_more {
        println!("({} of {} posts shown)", state.items.len(), state.total_count);
    }
    Ok(())
}

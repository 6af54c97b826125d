//! Profiles, follows and user listings.

use anyhow::Result;
use shortsns_api::{PageRequest, UpdateUser, UserId, UserRanking};
use shortsns_app::App;

use super::{print_json, print_posts, print_user, print_users};

pub async fn show(app: &App, user_id: Option<UserId>, json: bool) -> Result<()> {
    let user_id = match (user_id, app.auth().current_user()) {
        (Some(id), _) => id,
        (None, Some(me)) => me.user_id,
        (None, None) => anyhow::bail!("Not logged in. Pass a user id."),
    };
    let page = app.load_profile(user_id).await?;
    if json {
        return print_json(&serde_json::json!({
            "user": page.user,
            "posts": page.posts.items,
            "post_count": page.posts.total_count,
            "is_self": page.is_self,
            "following": page.follow.map(|r| r.is_active()),
        }));
    }

    print_user(&page.user, false)?;
    match page.follow {
        Some(r) if r.is_active() => println!("  you follow this user"),
        Some(_) => println!("  you do not follow this user"),
        None => {}
    }
    println!();
    print_posts(&page.posts.items, false)
}

pub async fn update(app: &App, patch: &UpdateUser, json: bool) -> Result<()> {
    if patch.is_empty() {
        anyhow::bail!("Nothing to update. Pass --name, --url or --bio.");
    }
    let user = app.update_profile(patch).await?;
    if !json {
        println!("Profile updated.");
    }
    print_user(&user, json)
}

/// Make the viewer's follow of `user_id` match `follow`.
pub async fn follow(app: &App, user_id: UserId, follow: bool) -> Result<()> {
    let relation = app.set_follow(user_id, follow).await?;
    let verb = if relation.is_active() { "following" } else { "not following" };
    println!("You are {} user {} ({} followers).", verb, user_id, relation.count);
    Ok(())
}

pub async fn followers(app: &App, user_id: UserId, json: bool) -> Result<()> {
    let page = app.followers(user_id).await?;
    print_users(&page.items, json)
}

pub async fn following(app: &App, user_id: UserId, json: bool) -> Result<()> {
    let page = app.following(user_id).await?;
    print_users(&page.items, json)
}

pub async fn search(app: &App, query: &str, json: bool) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Search query cannot be empty.");
    }
    let page = app.api().search.users(query, PageRequest::first(app.page_size())).await?;
    print_users(&page.items, json)
}

pub async fn ranking(app: &App, board: UserRanking, json: bool) -> Result<()> {
    let page = app.api().ranking.users(board, PageRequest::first(app.page_size())).await?;
    print_users(&page.items, json)
}

//! Login / logout and account commands.

use anyhow::Result;
use shortsns_api::CreateUser;
use shortsns_app::{App, IdentityAssertion};

use super::print_user;

pub async fn login(app: &App, email: &str, password: &str) -> Result<()> {
    if email.is_empty() || password.is_empty() {
        anyhow::bail!("Email and password are required.");
    }
    let user = app.login_with_password(email, password).await?;
    println!("Logged in as @{} ({}).", user.username, user.user_name);
    Ok(())
}

/// Sign in with a credential issued by the identity provider. The email
/// and display name are read from the credential itself.
pub async fn login_assertion(app: &App, credential: &str) -> Result<()> {
    let assertion = IdentityAssertion::decode(credential)?;
    let user = app.login_with_identity_assertion(&assertion).await?;
    println!("Logged in as @{} ({}).", user.username, user.user_name);
    Ok(())
}

pub async fn register(app: &App, account: &CreateUser) -> Result<()> {
    let user = app.register(account).await?;
    println!("Created @{} and logged in.", user.username);
    Ok(())
}

pub fn logout(app: &App) {
    app.logout();
    println!("Logged out.");
}

pub fn whoami(app: &App, json: bool) -> Result<()> {
    match app.auth().current_user() {
        Some(user) => print_user(&user, json),
        None => {
            println!("Not logged in.");
            Ok(())
        }
    }
}

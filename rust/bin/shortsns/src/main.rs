//! `shortsns`: command-line ShortSNS client.
//!
//! Every command except `config` and `version` restores the saved
//! session first, so a token that the server no longer accepts is
//! dropped before anything else runs.

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use shortsns_api::{RankingRange, TimelineTab, UserRanking};

/// ShortSNS CLI tool.
#[derive(Parser, Debug)]
#[command(name = "shortsns", about = "ShortSNS command-line client")]
struct Cli {
    /// Path to client config file (default: ~/.shortsns/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or change client settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Login with email and password.
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted when omitted).
        #[arg(long)]
        password: Option<String>,
    },

    /// Login with an identity-provider credential (a signed ID token).
    LoginAssertion {
        #[arg(long)]
        credential: String,
    },

    /// Create an account and sign in.
    Register {
        #[arg(long)]
        username: String,
        /// Display name.
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },

    /// Logout: forget the saved session token.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Read the home timeline.
    Timeline {
        #[arg(long, value_enum, default_value_t = Tab::Latest)]
        tab: Tab,
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Publish a post.
    Post { text: String },

    Like { post_id: u64 },
    Unlike { post_id: u64 },
    Follow { user_id: u64 },
    Unfollow { user_id: u64 },

    Search {
        #[command(subcommand)]
        what: SearchWhat,
    },

    Ranking {
        #[command(subcommand)]
        board: RankingBoard,
    },

    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set {
        /// API base URL.
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        page_size: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
enum SearchWhat {
    Users { query: String },
    Posts { query: String },
}

#[derive(Subcommand, Debug)]
enum RankingBoard {
    /// Most liked posts.
    Posts {
        #[arg(long, value_enum, default_value_t = Range::Day)]
        range: Range,
    },
    TotalLikes,
    Level,
    Followers,
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Show a profile (default: your own).
    Show { user_id: Option<u64> },
    /// Change your own profile. Omitted fields are left alone.
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// Users following a user.
    Followers { user_id: u64 },
    /// Users a user follows.
    Following { user_id: u64 },
    /// Posts a user has liked.
    Likes {
        user_id: u64,
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Tab {
    Latest,
    Popular,
    Following,
}

impl From<Tab> for TimelineTab {
    fn from(tab: Tab) -> Self {
        match tab {
            Tab::Latest => TimelineTab::Latest,
            Tab::Popular => TimelineTab::Popular,
            Tab::Following => TimelineTab::Following,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Range {
    #[value(name = "24h")]
    Day,
    All,
}

impl From<Range> for RankingRange {
    fn from(range: Range) -> Self {
        match range {
            Range::Day => RankingRange::Day,
            Range::All => RankingRange::All,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.output == "json";

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);

    let command = match cli.command {
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => commands::settings::show(&config_path)?,
                ConfigAction::Set { server, page_size } => {
                    commands::settings::set(server.as_deref(), page_size, &config_path)?
                }
            }
            return Ok(());
        }
        Commands::Version => {
            println!("shortsns cli v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        command => command,
    };

    let app = commands::connect(&config_path).await?;
    match command {
        Commands::Login { email, password } => {
            let email = match email {
                Some(email) => email,
                None => commands::prompt("Email: ")?,
            };
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            commands::account::login(&app, &email, &password).await?;
        }
        Commands::LoginAssertion { credential } => {
            commands::account::login_assertion(&app, &credential).await?;
        }
        Commands::Register { username, name, email, url, bio } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                anyhow::bail!("Passwords do not match.");
            }
            if password.is_empty() {
                anyhow::bail!("Password cannot be empty.");
            }
            let account = shortsns_api::CreateUser {
                username,
                user_name: name,
                user_mail: email,
                password,
                user_url: url,
                user_bio: bio,
            };
            commands::account::register(&app, &account).await?;
        }
        Commands::Logout => commands::account::logout(&app),
        Commands::Whoami => commands::account::whoami(&app, json)?,

        Commands::Timeline { tab, pages } => {
            commands::posts::timeline(&app, tab.into(), pages, json).await?;
        }
        Commands::Post { text } => commands::posts::post(&app, &text, json).await?,
        Commands::Like { post_id } => commands::posts::like(&app, post_id, true).await?,
        Commands::Unlike { post_id } => commands::posts::like(&app, post_id, false).await?,
        Commands::Follow { user_id } => commands::users::follow(&app, user_id, true).await?,
        Commands::Unfollow { user_id } => commands::users::follow(&app, user_id, false).await?,

        Commands::Search { what } => match what {
            SearchWhat::Users { query } => commands::users::search(&app, &query, json).await?,
            SearchWhat::Posts { query } => commands::posts::search(&app, &query, json).await?,
        },

        Commands::Ranking { board } => match board {
            RankingBoard::Posts { range } => {
                commands::posts::ranking(&app, range.into(), json).await?
            }
            RankingBoard::TotalLikes => {
                commands::users::ranking(&app, UserRanking::TotalLikes, json).await?
            }
            RankingBoard::Level => commands::users::ranking(&app, UserRanking::Level, json).await?,
            RankingBoard::Followers => {
                commands::users::ranking(&app, UserRanking::Followers, json).await?
            }
        },

        Commands::Profile { action } => match action {
            ProfileAction::Show { user_id } => commands::users::show(&app, user_id, json).await?,
            ProfileAction::Update { name, url, bio } => {
                let patch = shortsns_api::UpdateUser {
                    user_name: name,
                    user_url: url,
                    user_bio: bio,
                };
                commands::users::update(&app, &patch, json).await?;
            }
            ProfileAction::Followers { user_id } => commands::users::followers(&app, user_id, json).await?,
            ProfileAction::Following { user_id } => commands::users::following(&app, user_id, json).await?,
            ProfileAction::Likes { user_id, pages } => commands::posts::liked(&app, user_id, pages, json).await?,
        },

        // Local commands, answered above.
        Commands::Config { .. } | Commands::Version => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ranking_range() {
        let cli = Cli::try_parse_from(["shortsns", "ranking", "posts", "--range", "all"]).unwrap();
        match cli.command {
            Commands::Ranking { board: RankingBoard::Posts { range } } => {
                assert_eq!(RankingRange::from(range), RankingRange::All);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["shortsns", "ranking", "posts"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ranking { board: RankingBoard::Posts { range: Range::Day } }
        ));
    }

    #[test]
    fn parses_profile_listings() {
        let cli = Cli::try_parse_from(["shortsns", "profile", "likes", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Profile { action: ProfileAction::Likes { user_id: 3, pages: 1 } }
        ));

        let cli = Cli::try_parse_from(["shortsns", "profile", "followers", "7"]).unwrap();
        assert!(matches!(cli.command, Commands::Profile { action: ProfileAction::Followers { user_id: 7 } }));

        assert!(Cli::try_parse_from(["shortsns", "profile", "following"]).is_err());
    }

    #[test]
    fn timeline_defaults() {
        let cli = Cli::try_parse_from(["shortsns", "-o", "json", "timeline"]).unwrap();
        assert_eq!(cli.output, "json");
        assert!(matches!(cli.command, Commands::Timeline { tab: Tab::Latest, pages: 1 }));

        let cli = Cli::try_parse_from(["shortsns", "timeline", "--tab", "following"]).unwrap();
        match cli.command {
            Commands::Timeline { tab, .. } => assert_eq!(TimelineTab::from(tab), TimelineTab::Following),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

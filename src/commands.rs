use anyhow::{anyhow, bail};

use crate::config::Config;
use crate::db::FeedStore;
use crate::fetcher::Fetcher;
use crate::{follows, scheduler};

/// How many posts `browse` shows when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// The closed set of commands. Dispatch is a plain `match`, so there is no
/// registration order to get wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { name: String },
    Register { name: String },
    Users,
    Reset,
    Agg { interval: String },
    AddFeed { name: String, url: String },
    Feeds,
    Follow { url: String },
    Unfollow { url: String },
    Following,
    Browse { limit: Option<i64> },
}

/// Everything a handler needs, passed explicitly.
pub struct Context<'a, S> {
    pub store: &'a S,
    pub config: &'a mut Config,
}

impl Command {
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| anyhow!("no command given"))?;

        match name.as_str() {
            "login" => Ok(Self::Login {
                name: single_arg(rest, "login <name>")?,
            }),
            "register" => Ok(Self::Register {
                name: single_arg(rest, "register <name>")?,
            }),
            "users" => Ok(Self::Users),
            "reset" => Ok(Self::Reset),
            "agg" => Ok(Self::Agg {
                interval: single_arg(rest, "agg <interval>")?,
            }),
            "addfeed" => match rest {
                [name, url] => Ok(Self::AddFeed {
                    name: name.clone(),
                    url: url.clone(),
                }),
                _ => bail!("usage: tidings addfeed <name> <url>"),
            },
            "feeds" => Ok(Self::Feeds),
            "follow" => Ok(Self::Follow {
                url: single_arg(rest, "follow <url>")?,
            }),
            "unfollow" => Ok(Self::Unfollow {
                url: single_arg(rest, "unfollow <url>")?,
            }),
            "following" => Ok(Self::Following),
            "browse" => {
                let limit = match rest.first() {
                    Some(raw) => Some(
                        raw.parse::<i64>()
                            .map_err(|_| anyhow!("browse limit must be a number, got '{raw}'"))?,
                    ),
                    None => None,
                };
                Ok(Self::Browse { limit })
            }
            other => bail!("unknown command '{other}'"),
        }
    }

    pub async fn run<S: FeedStore>(self, ctx: &mut Context<'_, S>) -> anyhow::Result<()> {
        match self {
            Self::Login { name } => {
                let user = ctx.store.get_user_by_name(&name).await?;
                ctx.config.set_user(&user.name)?;
                println!("Logged in as {}", user.name);
            }
            Self::Register { name } => {
                let user = ctx.store.create_user(&name).await?;
                ctx.config.set_user(&user.name)?;
                println!("Created user {}", user.name);
            }
            Self::Users => {
                for user in ctx.store.list_users().await? {
                    if ctx.config.current_user_name.as_deref() == Some(user.name.as_str()) {
                        println!("{} (current)", user.name);
                    } else {
                        println!("{}", user.name);
                    }
                }
            }
            Self::Reset => {
                ctx.store.delete_all_users().await?;
                ctx.config.clear_user()?;
                println!("Database reset");
            }
            Self::Agg { interval } => {
                let period = scheduler::parse_interval(&interval)?;
                let fetcher = Fetcher::new();
                scheduler::run(ctx.store, &fetcher, period).await;
            }
            Self::AddFeed { name, url } => {
                let user_name = current_user(ctx.config)?.to_string();
                let user = ctx.store.get_user_by_name(&user_name).await?;
                let feed = ctx.store.create_feed(&name, &url, user.id).await?;
                ctx.store.create_follow(user.id, feed.id).await?;
                println!("Added feed '{}' ({})", feed.name, feed.url);
            }
            Self::Feeds => {
                let feeds = ctx.store.list_feeds().await?;
                if feeds.is_empty() {
                    println!("No feeds yet");
                }
                for feed in feeds {
                    println!("* {} ({}) added by {}", feed.name, feed.url, feed.owner_name);
                }
            }
            Self::Follow { url } => {
                let user_name = current_user(ctx.config)?.to_string();
                let follow = follows::follow_feed(ctx.store, &user_name, &url).await?;
                println!("{} is now following '{}'", follow.user_name, follow.feed_name);
            }
            Self::Unfollow { url } => {
                let user_name = current_user(ctx.config)?.to_string();
                follows::unfollow_feed(ctx.store, &user_name, &url).await?;
                println!("Unfollowed {}", url);
            }
            Self::Following => {
                let user_name = current_user(ctx.config)?.to_string();
                let names = follows::list_following(ctx.store, &user_name).await?;
                if names.is_empty() {
                    println!("Not following any feeds");
                }
                for name in names {
                    println!("* {}", name);
                }
            }
            Self::Browse { limit } => {
                let user_name = current_user(ctx.config)?.to_string();
                let user = ctx.store.get_user_by_name(&user_name).await?;
                let posts = ctx
                    .store
                    .posts_for_user(user.id, limit.unwrap_or(DEFAULT_BROWSE_LIMIT))
                    .await?;
                for post in posts {
                    println!("{}", post.title);
                    println!("  {}", post.url);
                    if let Some(at) = &post.published_at {
                        println!("  published {}", at);
                    }
                    if let Some(description) = &post.description {
                        println!("  {}", description);
                    }
                }
            }
        }
        Ok(())
    }
}

fn current_user(config: &Config) -> anyhow::Result<&str> {
    config
        .current_user_name
        .as_deref()
        .ok_or_else(|| anyhow!("not logged in; run `tidings login <name>` first"))
}

fn single_arg(rest: &[String], usage: &str) -> anyhow::Result<String> {
    match rest {
        [arg] => Ok(arg.clone()),
        _ => bail!("usage: tidings {usage}"),
    }
}

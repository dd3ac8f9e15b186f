use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tidings::commands::{Command, Context};
use tidings::config::Config;
use tidings::db::SqliteStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidings=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let mut config = Config::load_default()?;

    let store = SqliteStore::connect(&config.db_url).await?;
    store.initialize().await?;

    let mut ctx = Context {
        store: &store,
        config: &mut config,
    };
    command.run(&mut ctx).await
}

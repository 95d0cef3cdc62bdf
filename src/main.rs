use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::prelude::*;
use tracing::info;

use wishbot::bot;
use wishbot::config::Config;
use wishbot::dialogue::FlowState;
use wishbot::session::SessionManager;
use wishbot::storage::{JsonStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Wishbot");

    let config = Config::from_env()?;

    // Pick the storage backend: Postgres when DATABASE_URL is set,
    // otherwise the JSON document next to the binary.
    let store = match &config.database_url {
        Some(url) => {
            info!("Using Postgres storage backend");
            Store::Postgres(PgStore::connect(url).await?)
        }
        None => {
            info!(path = %config.data_file.display(), "Using JSON storage backend");
            Store::Json(JsonStore::open(
                &config.data_file,
                &config.allow_list.numeric_ids(),
            )?)
        }
    };
    let store = Arc::new(store);
    let sessions = Arc::new(SessionManager::new(
        config.allow_list.clone(),
        Arc::clone(&store),
    ));

    let telegram_bot = Bot::new(&config.bot_token);

    info!("Bot initialized, starting dispatcher");

    let handler = dialogue::enter::<Update, InMemStorage<FlowState>, FlowState, _>()
        .branch(Update::filter_message().endpoint(bot::message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

    Dispatcher::builder(telegram_bot, handler)
        .dependencies(dptree::deps![
            store,
            sessions,
            InMemStorage::<FlowState>::new()
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

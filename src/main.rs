mod bible;
mod bot;
mod config;
mod error;
mod leaderboard;
mod line;
mod push;
mod quiz;
mod scoring;
mod server;
mod user;

use std::{fs::File, sync::Arc};

use dotenv::dotenv;
use log::info;
use tokio::sync::Mutex;

use bible::{plan::ReadingPlans, Bible};
use bot::Bot;
use config::Config;
use line::LineClient;
use server::AppState;
use user::JsonFileUserStore;

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting Bible reading bot...");

    let config = Config::from_env().expect("Invalid configuration");

    // Load the verse corpus
    let bible_path = config.bible_text_path();
    let bible = Bible::from_reader(
        File::open(&bible_path)
            .unwrap_or_else(|e| panic!("Failed to open {}: {e}", bible_path.display())),
    )
    .expect("Failed to parse the Bible text");
    info!(
        "Bible loaded: {} verses in {} chapters",
        bible.verse_count(),
        bible.chapter_count()
    );

    // Load the reading plans
    let plans_path = config.bible_plans_path();
    let plans = ReadingPlans::from_reader(
        File::open(&plans_path)
            .unwrap_or_else(|e| panic!("Failed to open {}: {e}", plans_path.display())),
    )
    .expect("Failed to parse the reading plans");
    info!("Reading plans loaded: {} days", plans.len());

    let users = JsonFileUserStore::open(&config.users_file).expect("Failed to open the user store");
    info!(
        "User store {} opened with {} users",
        config.users_file.display(),
        users.len()
    );

    let state = AppState {
        bot: Arc::new(Bot::new(Arc::new(bible), Arc::new(plans))),
        users: Arc::new(Mutex::new(users)),
        messenger: Arc::new(LineClient::new(
            &config.line_api_base,
            &config.channel_access_token,
        )),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind the listen address");
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, server::build_router(state))
        .await
        .expect("Server error");
}

mod demo;
mod ui;

use std::error::Error;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use hopeswap::catalog::ListingQuery;
use hopeswap::config;
use hopeswap::services::AppServices;
use ui::HopeSwapApp;

/// Signed-in user when neither the config nor the environment names one.
const FALLBACK_USER_ID: &str = "demo-buyer";

#[derive(Parser)]
#[command(
    name = "hopeswap",
    version,
    about = "HopeSwap marketplace client: swipe listings and chat with sellers"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Open the desktop client (default)
    Gui,
    /// Run a scripted chat and swipe session without a window
    Demo,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    config::apply_env_overrides(&mut app_config);
    let user_id = app_config
        .user_id
        .get_or_insert_with(|| {
            log::info!("No user configured; signing in as {FALLBACK_USER_ID}");
            FALLBACK_USER_ID.to_string()
        })
        .clone();

    let services = AppServices::from_config(app_config)?;
    let conversation = demo::seed(&services, &user_id).await?;

    match cli.mode.unwrap_or(Mode::Gui) {
        Mode::Demo => demo::run(&services, &conversation.id).await,
        Mode::Gui => run_gui(services, &conversation.id).await,
    }
}

async fn run_gui(services: AppServices, conversation_id: &str) -> Result<(), Box<dyn Error>> {
    let session = match services.open_chat(conversation_id).await {
        Ok(session) => Some(session),
        Err(err) => {
            log::warn!("Chat unavailable: {err}");
            None
        }
    };
    let query = match services.current_user_id() {
        Some(user_id) => ListingQuery::new().excluding_owner(user_id),
        None => ListingQuery::new(),
    };
    let listings = demo::sample_listings();
    let swipe_config = services.config.swipe;

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "HopeSwap",
        options,
        Box::new(move |cc| {
            log::info!("Client started with {} listings", listings.len());
            Ok(Box::new(HopeSwapApp::new(
                cc,
                session,
                listings,
                query,
                swipe_config,
            )))
        }),
    )?;
    Ok(())
}

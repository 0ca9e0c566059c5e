mod analytics;
mod api;
mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod tasks;
mod voting;

#[cfg(test)]
mod test_support;

use api::HttpApi;
use config::Config;
use db::SessionStore;
use error::PollResult;
use handlers::{App, Terminal};
use log::{error, info};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{stdin, stdout, BufReader};

async fn run() -> PollResult<()> {
    let config = Config::from_env()?;
    info!("Using polling API at {}", config.api_url);

    let storage = SessionStore::new(&config.database_url).await?;
    let api = Arc::new(HttpApi::new(config.api_url.clone()));

    let app = App {
        storage,
        topics: api.clone(),
        polls: api,
        share_base_url: config.share_base_url,
    };

    let args: Vec<String> = env::args().skip(1).collect();
    let (name, rest) = match args.split_first() {
        Some((name, rest)) => (name.as_str(), rest),
        None => ("generate", &[] as &[String]),
    };

    let mut term = Terminal::new(BufReader::new(stdin()), stdout());
    commands::handle_command(&app, &mut term, name, rest).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

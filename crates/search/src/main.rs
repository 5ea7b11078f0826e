//! WebRank Search
//!
//! Command-line front end to the ranking engine:
//! - Interactive shell with register, login, search, suggestions and history
//! - One-shot phrase/wildcard search, suggestions and history lookups
//! - User registration

mod cli;
mod password;
mod shell;

use clap::Parser;
use cli::{Cli, Commands};
use shell::{render_history, render_results, render_suggestions, Shell};
use std::io::BufRead;
use std::sync::Arc;
use tracing::{error, info};
use webrank_common::auth::UserStore;
use webrank_common::backend::{wait_until_ready, ElasticsearchClient, SearchBackend};
use webrank_common::config::{AppConfig, ObservabilityConfig};
use webrank_common::{metrics, telemetry, VERSION};
use webrank_search::{FileQueryLog, PersonalizationStore, QueryMode, Ranker, SearchRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    // Load configuration
    let loaded = match &args.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(&ObservabilityConfig::default());
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    telemetry::init_tracing(&config.observability);
    metrics::register_metrics();
    info!("Starting WebRank search v{}", VERSION);

    match args.command.unwrap_or(Commands::Shell) {
        Commands::Register { user } => {
            let mut users = UserStore::open(&config.users.path);
            let user = users.check_new_username(&user)?.to_string();
            let password = read_password("Password: ")?;
            password::confirm(&password, &read_password("Confirm password: ")?)?;
            users.register(&user, &password)?;
            println!("Registered {}.", user);
        }
        Commands::History { user } => {
            let user = login(&config, &user)?;
            let ranker = connect(&config, false).await?;
            print!("{}", render_history(&ranker.history(&user).await?));
        }
        Commands::Phrase { query, user } => {
            let user = user.map(|user| login(&config, &user)).transpose()?;
            let ranker = connect(&config, true).await?;
            let request = request(query, QueryMode::Phrase, user, config.ranking.result_limit);
            print!("{}", render_results(&ranker.search(&request).await?));
        }
        Commands::Wildcard { pattern, user } => {
            let user = user.map(|user| login(&config, &user)).transpose()?;
            let ranker = connect(&config, true).await?;
            let request = request(pattern, QueryMode::Wildcard, user, config.ranking.result_limit);
            print!("{}", render_results(&ranker.search(&request).await?));
        }
        Commands::Suggest { prefix } => {
            let ranker = connect(&config, true).await?;
            print!("{}", render_suggestions(&ranker.suggest(&prefix).await?));
        }
        Commands::Shell => {
            let ranker = connect(&config, true).await?;
            let users = UserStore::open(&config.users.path);
            Shell::new(ranker, users, config.ranking.result_limit).run().await?;
        }
    }

    Ok(())
}

/// Read a password, without echo when stdin is a terminal
fn read_password(label: &str) -> anyhow::Result<String> {
    if password::hidden_input_available() {
        return password::read_hidden(label)?.ok_or_else(|| anyhow::anyhow!("password entry cancelled"));
    }

    eprint!("{}", label);
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Check the user's password; history is only read or written for authenticated users
fn login(config: &AppConfig, user: &str) -> anyhow::Result<String> {
    login_with(&UserStore::open(&config.users.path), user, read_password)
}

fn login_with(
    users: &UserStore,
    user: &str,
    read: impl FnOnce(&str) -> anyhow::Result<String>,
) -> anyhow::Result<String> {
    let password = read(&format!("Password for {}: ", user.trim()))?;
    Ok(users.authenticate(user, &password)?)
}

/// Build the ranker, optionally waiting for the search service first
async fn connect(config: &AppConfig, wait_for_service: bool) -> anyhow::Result<Arc<Ranker>> {
    let backend: Arc<dyn SearchBackend> = Arc::new(ElasticsearchClient::new(config)?);

    if wait_for_service {
        info!(url = %config.search_service.url, "Connecting to search service...");
        wait_until_ready(backend.as_ref(), config.connect_retry())
            .await
            .map_err(|e| {
                error!(error = %e, "Search service unreachable");
                e
            })?;
    }

    let log = Arc::new(FileQueryLog::new(&config.history.path));
    let personalization = PersonalizationStore::new(log);
    Ok(Arc::new(Ranker::new(backend, personalization, &config.ranking)?))
}

fn request(query: String, mode: QueryMode, user: Option<String>, limit: usize) -> SearchRequest {
    SearchRequest {
        query,
        mode,
        user,
        limit,
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "search",
    about = "Ranked search over crawled pages, boosted by link authority and query history",
    version
)]
pub struct Cli {
    /// Configuration file (defaults to config/default, config/{APP_ENV}, config/local)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive session with register, login, search and history
    Shell,

    /// Exact phrase search
    Phrase {
        /// Phrase to match
        query: String,

        /// Personalize for this user and log the query (asks for the password)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Case-insensitive wildcard search (`*` and `?`)
    Wildcard {
        /// Pattern to match
        pattern: String,

        /// Personalize for this user and log the query (asks for the password)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Completion suggestions for a prefix
    Suggest {
        prefix: String,
    },

    /// Past queries of a user (asks for the password)
    History {
        user: String,
    },

    /// Register a user (password entered twice, hidden on a terminal)
    Register {
        user: String,
    },
}

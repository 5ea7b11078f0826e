//! Interactive search session and result rendering

use crate::password;
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, warn};
use webrank_common::auth::UserStore;
use webrank_common::errors::{AppError, Result};
use webrank_search::{HistoryEntry, QueryMode, RankedResult, Ranker, SearchRequest};

/// Menu-driven session over a line reader (stdin in production)
pub struct Shell<R> {
    ranker: Arc<Ranker>,
    users: UserStore,
    result_limit: usize,
    input: Lines<R>,

    /// Read passwords from the terminal without echo
    hidden_passwords: bool,
}

enum Flow {
    Continue,
    Leave,
}

impl Shell<BufReader<Stdin>> {
    pub fn new(ranker: Arc<Ranker>, users: UserStore, result_limit: usize) -> Self {
        let mut shell = Self::with_input(ranker, users, result_limit, BufReader::new(tokio::io::stdin()));
        shell.hidden_passwords = password::hidden_input_available();
        shell
    }
}

impl<R: AsyncBufRead + Unpin> Shell<R> {
    /// Session reading menu choices and passwords as plain lines from `input`
    pub fn with_input(ranker: Arc<Ranker>, users: UserStore, result_limit: usize, input: R) -> Self {
        Self {
            ranker,
            users,
            result_limit,
            input: input.lines(),
            hidden_passwords: false,
        }
    }

    /// Run until the user quits or input closes
    pub async fn run(&mut self) -> Result<()> {
        println!("\n===== WebRank search =====");

        loop {
            println!("\n1. Register\n2. Login\n3. Quit");
            let Some(choice) = self.prompt("Choose an option: ").await? else {
                return Ok(());
            };

            match choice.as_str() {
                "1" => self.register().await?,
                "2" => {
                    if let Some(user) = self.login().await? {
                        if let Flow::Leave = self.session(&user).await? {
                            return Ok(());
                        }
                    }
                }
                "3" | "q" | "quit" => {
                    println!("Bye.");
                    return Ok(());
                }
                _ => println!("Invalid choice, try again."),
            }
        }
    }

    async fn session(&mut self, user: &str) -> Result<Flow> {
        loop {
            println!("\n===== Search ({}) =====", user);
            println!("1. Phrase search\n2. Wildcard search\n3. Suggestions\n4. Query history\n5. Logout");
            let Some(choice) = self.prompt("Choose an option: ").await? else {
                return Ok(Flow::Leave);
            };

            match choice.as_str() {
                "1" => self.search(user, QueryMode::Phrase).await?,
                "2" => self.search(user, QueryMode::Wildcard).await?,
                "3" => self.suggest().await?,
                "4" => self.history(user).await,
                "5" => {
                    println!("Logged out.");
                    return Ok(Flow::Continue);
                }
                _ => println!("Invalid choice, try again."),
            }
        }
    }

    /// Re-prompts for a taken or malformed username and for mismatched passwords;
    /// an empty username cancels
    async fn register(&mut self) -> Result<()> {
        let username = loop {
            let Some(username) = self.prompt("Username: ").await? else {
                return Ok(());
            };
            if username.is_empty() {
                println!("Registration cancelled.");
                return Ok(());
            }
            match self.users.check_new_username(&username) {
                Ok(username) => break username.to_string(),
                Err(e) => println!("{}, choose another username.", describe(&e)),
            }
        };

        let password = loop {
            let Some(password) = self.password("Password: ").await? else {
                return Ok(());
            };
            let Some(confirmation) = self.password("Confirm password: ").await? else {
                return Ok(());
            };
            match password::confirm(&password, &confirmation) {
                Ok(()) => break password,
                Err(e) => println!("{}, try again.", describe(&e)),
            }
        };

        match self.users.register(&username, &password) {
            Ok(()) => println!("Registered {}.", username),
            Err(e) => println!("Registration failed: {}", describe(&e)),
        }
        Ok(())
    }

    async fn login(&mut self) -> Result<Option<String>> {
        let Some(username) = self.prompt("Username: ").await? else {
            return Ok(None);
        };
        let Some(password) = self.password("Password: ").await? else {
            return Ok(None);
        };

        match self.users.authenticate(&username, &password) {
            Ok(user) => {
                println!("Welcome, {}.", user);
                Ok(Some(user))
            }
            Err(e) => {
                println!("Login failed: {}", describe(&e));
                Ok(None)
            }
        }
    }

    async fn search(&mut self, user: &str, mode: QueryMode) -> Result<()> {
        let label = match mode {
            QueryMode::Phrase => "Phrase: ",
            QueryMode::Wildcard => "Wildcard pattern: ",
        };
        let Some(query) = self.prompt(label).await? else {
            return Ok(());
        };
        if query.is_empty() {
            println!("Query must not be empty.");
            return Ok(());
        }

        let request = SearchRequest {
            query,
            mode,
            user: Some(user.to_string()),
            limit: self.result_limit,
        };

        match self.ranker.search(&request).await {
            Ok(results) => print!("{}", render_results(&results)),
            Err(e) => {
                if !e.is_client_error() {
                    warn!(error = %e, "Search failed");
                }
                println!("Search failed: {}", describe(&e));
            }
        }
        Ok(())
    }

    async fn suggest(&mut self) -> Result<()> {
        let Some(prefix) = self.prompt("Prefix: ").await? else {
            return Ok(());
        };
        if prefix.is_empty() {
            println!("Prefix must not be empty.");
            return Ok(());
        }

        match self.ranker.suggest(&prefix).await {
            Ok(suggestions) => print!("{}", render_suggestions(&suggestions)),
            Err(e) => println!("Suggestions unavailable: {}", describe(&e)),
        }
        Ok(())
    }

    async fn history(&self, user: &str) {
        match self.ranker.history(user).await {
            Ok(entries) => print!("{}", render_history(&entries)),
            Err(e) => println!("History unavailable: {}", describe(&e)),
        }
    }

    /// Print a label and read one trimmed line; `None` once input is closed
    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        Ok(self.read_line(label).await?.map(|line| line.trim().to_string()))
    }

    /// Read a password, hidden when attached to a terminal; `None` when cancelled or closed
    async fn password(&mut self, label: &str) -> Result<Option<String>> {
        if !self.hidden_passwords {
            return self.read_line(label).await;
        }

        let label = label.to_string();
        let typed = tokio::task::spawn_blocking(move || password::read_hidden(&label))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("password prompt failed: {}", e),
            })??;
        Ok(typed)
    }

    async fn read_line(&mut self, label: &str) -> Result<Option<String>> {
        print!("{}", label);
        std::io::stdout().flush()?;

        let line = self.input.next_line().await?;
        debug!(eof = line.is_none(), "Read input line");
        Ok(line)
    }
}

fn describe(err: &AppError) -> String {
    match err {
        e if e.is_service_error() => "the search service is unavailable".to_string(),
        AppError::Validation { message, .. } => message.clone(),
        AppError::UserNotFound { username } => format!("no user named '{}'", username),
        AppError::Unauthorized { .. } => "wrong password".to_string(),
        AppError::DuplicateUser { username } => format!("'{}' is already registered", username),
        other => other.to_string(),
    }
}

pub fn render_results(results: &[RankedResult]) -> String {
    if results.is_empty() {
        return "No matching pages found.\n".to_string();
    }

    let mut out = String::from("\n===== Results =====\n");
    for (rank, result) in results.iter().enumerate() {
        let _ = writeln!(out, "\nRank {}:", rank + 1);
        let _ = writeln!(out, "Title: {}", result.title);
        let _ = writeln!(out, "URL: {}", result.url);
        let _ = writeln!(out, "Final Score: {:.6}", result.final_score);
        let _ = writeln!(out, "Snippet: {}...", result.snippet);
    }
    out.push_str("===================\n");
    out
}

pub fn render_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return "No suggestions found.\n".to_string();
    }

    let mut out = String::from("\n===== Suggestions =====\n");
    for suggestion in suggestions {
        let _ = writeln!(out, "{}", suggestion);
    }
    out.push_str("=======================\n");
    out
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "Query history is empty.\n".to_string();
    }

    let mut out = String::from("\n===== Query history =====\n");
    for entry in entries {
        let _ = writeln!(
            out,
            "{} | {}",
            entry.timestamp.format(webrank_search::personalization::TIMESTAMP_FORMAT),
            entry.query
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use webrank_common::backend::{MockBackend, SearchHit};
    use webrank_common::config::RankingConfig;
    use webrank_common::models::IndexedPage;
    use webrank_search::{InMemoryQueryLog, PersonalizationStore, QueryLog};

    fn scripted(
        users: UserStore,
        log: Arc<InMemoryQueryLog>,
        script: &'static str,
    ) -> Shell<BufReader<&'static [u8]>> {
        let backend = Arc::new(MockBackend::new().with_hits(vec![SearchHit {
            score: 1.0,
            page: IndexedPage {
                url: "https://lib.example/".into(),
                title: "Library".into(),
                text: "Opening hours".into(),
                pagerank: 0.2,
                ..Default::default()
            },
        }]));
        let ranker = Ranker::new(backend, PersonalizationStore::new(log), &RankingConfig::default()).unwrap();
        Shell::with_input(Arc::new(ranker), users, 4, BufReader::new(script.as_bytes()))
    }

    #[tokio::test]
    async fn test_register_confirms_password_and_reprompts_taken_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let mut existing = UserStore::open(&path);
        existing.register("alice", "pw").unwrap();

        // taken name, then a mismatched confirmation, then a match
        let script = "1\nalice\nbob\nfirst\nsecond\nsecret\nsecret\n3\n";
        let mut shell = scripted(UserStore::open(&path), Arc::new(InMemoryQueryLog::new()), script);
        shell.run().await.unwrap();

        let users = UserStore::open(&path);
        assert_eq!(users.len(), 2);
        assert_eq!(users.authenticate("bob", "secret").unwrap(), "bob");
        assert!(users.authenticate("bob", "first").is_err());
    }

    #[tokio::test]
    async fn test_login_search_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        UserStore::open(&path).register("alice", "pw").unwrap();

        let log = Arc::new(InMemoryQueryLog::new());
        let script = "2\nalice\nwrong\n2\nalice\npw\n1\nlibrary hours\n5\n3\n";
        let mut shell = scripted(UserStore::open(&path), log.clone(), script);
        shell.run().await.unwrap();

        let history = log.read_all(Some("alice")).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "library hours");
    }

    #[test]
    fn test_describe_errors() {
        assert_eq!(describe(&AppError::unavailable("refused")), "the search service is unavailable");
        let mismatch = AppError::Validation {
            message: "passwords do not match".into(),
            field: Some("password".into()),
        };
        assert_eq!(describe(&mismatch), "passwords do not match");
    }

    #[test]
    fn test_render_results() {
        let rendered = render_results(&[RankedResult {
            title: "Library".into(),
            url: "https://lib.example/".into(),
            snippet: "Open daily".into(),
            authority: 0.4,
            final_score: 0.68,
        }]);

        assert!(rendered.contains("Rank 1:"));
        assert!(rendered.contains("Final Score: 0.680000"));
        assert!(rendered.contains("Snippet: Open daily..."));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_results(&[]), "No matching pages found.\n");
        assert_eq!(render_suggestions(&[]), "No suggestions found.\n");
        assert_eq!(render_history(&[]), "Query history is empty.\n");
    }

    #[test]
    fn test_render_history() {
        let entry = HistoryEntry {
            timestamp: NaiveDateTime::parse_from_str("2024-05-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            username: "alice".into(),
            query: "library hours".into(),
            results: vec![],
        };
        assert!(render_history(&[entry]).contains("2024-05-01 10:00:00 | library hours"));
    }
}

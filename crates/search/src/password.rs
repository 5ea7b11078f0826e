//! Password entry without echo

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, IsTerminal, Write};
use webrank_common::errors::{AppError, Result};

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Submit,
    Cancel,
}

/// True when stdin is a terminal that can be switched to raw mode
pub fn hidden_input_available() -> bool {
    io::stdin().is_terminal()
}

/// Read a password from the terminal without echoing it; `None` when cancelled
///
/// Blocks the calling thread until Enter, Esc or Ctrl-C.
pub fn read_hidden(label: &str) -> io::Result<Option<String>> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", label)?;
    stderr.flush()?;

    terminal::enable_raw_mode()?;
    let typed = read_keys();
    let restored = terminal::disable_raw_mode();
    writeln!(stderr)?;

    let typed = typed?;
    restored?;
    Ok(typed)
}

fn read_keys() -> io::Result<Option<String>> {
    let mut buffer = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_key(&mut buffer, key) {
                KeyOutcome::Continue => {}
                KeyOutcome::Submit => return Ok(Some(buffer)),
                KeyOutcome::Cancel => return Ok(None),
            }
        }
    }
}

fn apply_key(buffer: &mut String, key: KeyEvent) -> KeyOutcome {
    if key.kind == KeyEventKind::Release {
        return KeyOutcome::Continue;
    }

    match key.code {
        KeyCode::Enter => KeyOutcome::Submit,
        KeyCode::Esc => KeyOutcome::Cancel,
        KeyCode::Char('c') | KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyOutcome::Cancel
        }
        KeyCode::Backspace => {
            buffer.pop();
            KeyOutcome::Continue
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    }
}

/// A new password and its confirmation must match and not be empty
pub fn confirm(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(AppError::Validation {
            message: "passwords do not match".to_string(),
            field: Some("password".to_string()),
        });
    }
    if password.is_empty() {
        return Err(AppError::Validation {
            message: "password must not be empty".to_string(),
            field: Some("password".to_string()),
        });
    }
    Ok(())
}

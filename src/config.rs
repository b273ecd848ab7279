//! API key and model resolution.
//!
//! Precedence for the key: environment (including a `.env` file) first, then the
//! value saved in the local store. Model: `GEMINI_MODEL`, then the stored
//! override, then the default.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent};
use crossterm::terminal;

use crate::clients::gemini::models::GeminiModel;

/// Store key holding the saved API key.
pub const API_KEY_SETTING: &str = "gemini_api_key";
/// Store key holding an optional model override.
pub const MODEL_SETTING: &str = "gemini_model";

pub const MODEL_ENV: &str = "GEMINI_MODEL";
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";
pub const DATA_DIR_ENV: &str = "LESSON_FORGE_DATA_DIR";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_DATA_DIR: &str = ".lesson-forge";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking environment variables, after loading `.env` if present
    fn find_key() -> Option<String> {
        let _ = dotenvy::dotenv();
        env::var(Self::KEY_NAME)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Environment key first, then the stored one.
    fn resolve_key(stored: Option<&str>) -> Option<String> {
        Self::find_key().or_else(|| {
            stored
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
        })
    }

    /// Ask whether the key should also go into `.env`. Single keystroke, defaults to no.
    fn prompt_save_to_env() -> bool {
        print!("Also add {} to .env file? (y/N): ", Self::KEY_NAME);
        let _ = io::stdout().flush();

        if let Ok(answer) = read_yes_no() {
            println!("{}", if answer { "y" } else { "n" });
            return answer;
        }

        // No raw terminal (piped stdin); fall back to a line.
        let mut input = String::new();
        io::stdin().read_line(&mut input).is_ok() && input.trim().eq_ignore_ascii_case("y")
    }

    /// Append `KEY_NAME=value` to `.env` unless the key is already there.
    fn save_to_env_file(api_key: &str) -> io::Result<()> {
        if let Ok(content) = fs::read_to_string(".env") {
            if content.contains(&format!("{}=", Self::KEY_NAME)) {
                return Ok(());
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(".env")?;
        file.write_all(format!("{}={}\n", Self::KEY_NAME, api_key.trim()).as_bytes())
    }
}

/// One keystroke in raw mode: `y`/`Y` is yes, anything else or a 30 s timeout is no.
fn read_yes_no() -> io::Result<bool> {
    terminal::enable_raw_mode()?;
    let result = (|| -> io::Result<bool> {
        if !event::poll(Duration::from_secs(30))? {
            return Ok(false);
        }
        Ok(matches!(
            event::read()?,
            Event::Key(KeyEvent {
                code: KeyCode::Char('y' | 'Y'),
                ..
            })
        ))
    })();
    terminal::disable_raw_mode()?;
    result
}

/// Values persisted by the user through the settings surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl Settings {
    /// Resolve the effective model from environment, stored override, or default.
    #[must_use]
    pub fn resolve_model(&self) -> GeminiModel {
        let _ = dotenvy::dotenv();
        env::var(MODEL_ENV)
            .ok()
            .or_else(|| self.model.clone())
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .map(|m| GeminiModel::from_id(&m))
            .unwrap_or_default()
    }
}

#[must_use]
pub fn base_url() -> String {
    env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Directory for the file-backed store.
#[must_use]
pub fn data_dir() -> PathBuf {
    env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_RANGE: &str = "Sheet1!A1";
pub const DEFAULT_TOKEN_PATH: &str = "token.json";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Remote submission is disabled when unset.
    pub spreadsheet_id: Option<String>,
    pub range: String,
    pub token_path: PathBuf,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_uri: String,
    pub auth_uri: String,
    pub redirect_uri: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            range: DEFAULT_RANGE.to_string(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            client_id: None,
            client_secret: None,
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            redirect_uri: "http://localhost".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

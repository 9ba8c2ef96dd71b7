//! Delivery of finished survey records: append to the remote sheet and
//! CSV export for local download.

pub mod adapter;
pub mod config;
pub mod credentials;
pub mod csv_export;
pub mod error;
pub mod sheets;

pub use adapter::SubmissionAdapter;
pub use config::SheetsConfig;
pub use credentials::{AuthorizedUser, CredentialProvider, OAuthClient, StaticToken, TokenFileProvider};
pub use csv_export::{to_csv, CSV_FILE_NAME};
pub use error::SubmitError;
pub use sheets::{http_client, AppendReceipt, RowSink, SheetsClient, UnconfiguredSink};

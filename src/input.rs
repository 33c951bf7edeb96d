//! Loading provisioning requests from tabular input.
//!
//! The input is CSV with a header row. Two columns matter, an email column and
//! an initial-password column, and their header labels are configurable since
//! source spreadsheets are often not in English. Everything else is ignored.
//!
//! Rows whose email cell is blank are dropped. A row that names an email but
//! no password is an input error, reported before any remote call is made.
//!
//! Header labels and email cells are trimmed. Password cells are kept exactly
//! as written, surrounding whitespace included.

use crate::secret::SecretString;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const DEFAULT_EMAIL_COLUMN: &str = "email";
pub const DEFAULT_PASSWORD_COLUMN: &str = "password";

/// Errors raised while reading the input table.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Cannot open input file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("Required column '{column}' is missing from the input header")]
    MissingColumn { column: String },

    #[error("Row on line {line} has an email but no initial password")]
    MissingPassword { line: u64 },
}

/// One desired account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Used both as the duplicate-check key and as the provider username.
    pub email: String,
    pub initial_password: SecretString,
}

impl ProvisionRequest {
    pub fn new(email: impl Into<String>, initial_password: impl Into<SecretString>) -> Self {
        Self {
            email: email.into(),
            initial_password: initial_password.into(),
        }
    }
}

/// Header labels of the two columns the tool reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputColumns {
    pub email: String,
    pub password: String,
}

impl InputColumns {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl Default for InputColumns {
    fn default() -> Self {
        Self::new(DEFAULT_EMAIL_COLUMN, DEFAULT_PASSWORD_COLUMN)
    }
}

/// Read requests from CSV data, in input order.
pub fn read_requests<R: Read>(
    reader: R,
    columns: &InputColumns,
) -> Result<Vec<ProvisionRequest>, InputError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let position = |label: &str| {
        headers
            .iter()
            .position(|h| h == label)
            .ok_or_else(|| InputError::MissingColumn {
                column: label.to_string(),
            })
    };
    let email_at = position(&columns.email)?;
    let password_at = position(&columns.password)?;

    let mut requests = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let email = record.get(email_at).unwrap_or_default().trim();
        if email.is_empty() {
            continue;
        }

        let password = record.get(password_at).unwrap_or_default();
        if password.is_empty() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(InputError::MissingPassword { line });
        }

        requests.push(ProvisionRequest::new(email, password));
    }
    Ok(requests)
}

/// Read requests from a CSV file.
pub fn read_requests_from_path(
    path: impl AsRef<Path>,
    columns: &InputColumns,
) -> Result<Vec<ProvisionRequest>, InputError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_requests(file, columns)
}

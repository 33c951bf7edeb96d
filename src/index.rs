//! Existence index over a directory snapshot.
//!
//! The index flattens each [`DirectoryUser`] into one record (core fields plus
//! every attribute) and lays the records out as a column table addressable by
//! column name. A user lacking an attribute has a null cell in that column.
//!
//! # Matching policy
//!
//! [`ExistenceIndex::contains`] is a substring-containment test, not equality:
//! a request email counts as already present when it occurs anywhere inside an
//! existing `email` value. `ann@x.com` therefore matches an existing
//! `ann@x.com.evil` as well as `joann@x.com`, so an account that does not
//! exist yet can be skipped.
//!
//! Each lookup scans the `email` column, so a lookup is O(U) in the number of
//! existing users.

use crate::store::{DirectoryUser, EMAIL_ATTRIBUTE};
use std::collections::HashMap;

pub const USERNAME_COLUMN: &str = "Username";
pub const STATUS_COLUMN: &str = "UserStatus";
pub const CREATED_COLUMN: &str = "UserCreateDate";
pub const LAST_MODIFIED_COLUMN: &str = "UserLastModifiedDate";

/// Second-precision display format for the timestamp columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Flatten a user into `(column, value)` pairs.
///
/// Core fields come first; attributes follow in name order. An attribute whose
/// name collides with a core column replaces the core value.
pub fn flatten_user(user: &DirectoryUser) -> Vec<(String, String)> {
    let mut record = vec![
        (USERNAME_COLUMN.to_string(), user.username.clone()),
        (STATUS_COLUMN.to_string(), user.status.to_string()),
        (
            CREATED_COLUMN.to_string(),
            user.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ),
        (
            LAST_MODIFIED_COLUMN.to_string(),
            user.last_modified_at.format(TIMESTAMP_FORMAT).to_string(),
        ),
    ];

    for (name, value) in &user.attributes {
        match record.iter_mut().find(|(column, _)| column == name) {
            Some(existing) => existing.1 = value.clone(),
            None => record.push((name.clone(), value.clone())),
        }
    }
    record
}

/// One named column of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    cells: Vec<Option<String>>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    /// Cell value at `row`; `None` for a null cell or an out-of-range row.
    pub fn get(&self, row: usize) -> Option<&str> {
        self.cells.get(row).and_then(|cell| cell.as_deref())
    }
}

/// Read-only duplicate-check view over a directory snapshot.
///
/// Built once per run before any mutation; never refreshed.
#[derive(Debug, Clone, Default)]
pub struct ExistenceIndex {
    rows: usize,
    columns: Vec<Column>,
    positions: HashMap<String, usize>,
}

impl ExistenceIndex {
    /// Build the index from a user snapshot.
    pub fn build(users: &[DirectoryUser]) -> Self {
        let records: Vec<Vec<(String, String)>> = users.iter().map(flatten_user).collect();
        let rows = records.len();

        let mut columns: Vec<Column> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (row, record) in records.into_iter().enumerate() {
            for (name, value) in record {
                let position = *positions.entry(name.clone()).or_insert_with(|| {
                    columns.push(Column {
                        name,
                        cells: vec![None; rows],
                    });
                    columns.len() - 1
                });
                columns[position].cells[row] = Some(value);
            }
        }

        Self {
            rows,
            columns,
            positions,
        }
    }

    /// Number of records (existing users).
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.positions.get(name).map(|&i| &self.columns[i])
    }

    /// Column names in first-seen order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Rows whose `email` cell contains `email` as a substring.
    pub fn matching_rows(&self, email: &str) -> Vec<usize> {
        let Some(column) = self.column(EMAIL_ATTRIBUTE) else {
            return Vec::new();
        };
        column
            .cells
            .iter()
            .enumerate()
            .filter_map(|(row, cell)| match cell {
                Some(existing) if existing.contains(email) => Some(row),
                _ => None,
            })
            .collect()
    }

    /// Usernames of the rows that make `email` count as present.
    pub fn matches(&self, email: &str) -> Vec<&str> {
        let usernames = self.column(USERNAME_COLUMN);
        self.matching_rows(email)
            .into_iter()
            .filter_map(|row| usernames.and_then(|c| c.get(row)))
            .collect()
    }

    /// Whether `email` counts as an existing account under the containment policy.
    pub fn contains(&self, email: &str) -> bool {
        let Some(column) = self.column(EMAIL_ATTRIBUTE) else {
            return false;
        };
        column
            .cells
            .iter()
            .flatten()
            .any(|existing| existing.contains(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UserStatus;
    use chrono::{TimeZone, Utc};

    fn user(username: &str, email: Option<&str>) -> DirectoryUser {
        let mut user = DirectoryUser::new(username, UserStatus::Confirmed);
        if let Some(email) = email {
            user = user.with_attribute("email", email);
        }
        user
    }

    #[test]
    fn test_flatten_formats_timestamps_to_seconds() {
        let mut u = user("ann", Some("ann@x.com")).with_attribute("sub", "1234");
        u.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        u.last_modified_at = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap()
            + chrono::Duration::milliseconds(999);

        let record = flatten_user(&u);
        assert_eq!(
            record,
            vec![
                ("Username".to_string(), "ann".to_string()),
                ("UserStatus".to_string(), "CONFIRMED".to_string()),
                ("UserCreateDate".to_string(), "2024-03-01 09:05:07".to_string()),
                ("UserLastModifiedDate".to_string(), "2024-03-02 10:00:00".to_string()),
                ("email".to_string(), "ann@x.com".to_string()),
                ("sub".to_string(), "1234".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_pads_missing_attributes_with_nulls() {
        let users = vec![
            user("a", Some("a@x.com")),
            user("b", None).with_attribute("phone_number", "+100"),
        ];
        let index = ExistenceIndex::build(&users);

        assert_eq!(index.len(), 2);
        let email = index.column("email").unwrap();
        assert_eq!(email.cells(), &[Some("a@x.com".to_string()), None]);
        let phone = index.column("phone_number").unwrap();
        assert_eq!(phone.get(0), None);
        assert_eq!(phone.get(1), Some("+100"));

        let names: Vec<_> = index.column_names().collect();
        assert_eq!(
            names,
            vec![
                "Username",
                "UserStatus",
                "UserCreateDate",
                "UserLastModifiedDate",
                "email",
                "phone_number"
            ]
        );
    }

    #[test]
    fn test_contains_exact_and_substring_matches() {
        let index = ExistenceIndex::build(&[
            user("1", Some("ann@x.com.evil")),
            user("2", Some("bob@x.com")),
        ]);

        assert!(index.contains("bob@x.com"));
        assert!(index.contains("ann@x.com"));
        assert!(index.contains("x.com"));
        assert!(!index.contains("carol@x.com"));
        // Containment runs one way only: the existing value must contain the request.
        assert!(!index.contains("bob@x.com.au"));
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let index = ExistenceIndex::build(&[user("1", Some("Ann@X.com"))]);
        assert!(!index.contains("ann@x.com"));
    }

    #[test]
    fn test_empty_pool_or_missing_email_column_matches_nothing() {
        assert!(!ExistenceIndex::build(&[]).contains("ann@x.com"));
        assert!(ExistenceIndex::build(&[]).is_empty());

        let index = ExistenceIndex::build(&[user("ann@x.com", None)]);
        assert!(index.column("email").is_none());
        assert!(!index.contains("ann@x.com"));
    }

    #[test]
    fn test_matches_reports_usernames_of_matching_rows() {
        let index = ExistenceIndex::build(&[
            user("u-1", Some("ann@x.com")),
            user("u-2", Some("joann@x.com")),
            user("u-3", Some("bob@x.com")),
        ]);
        assert_eq!(index.matches("ann@x.com"), vec!["u-1", "u-2"]);
        assert_eq!(index.matching_rows("bob"), vec![2]);
    }
}

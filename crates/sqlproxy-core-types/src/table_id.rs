//! Table identifiers and the hierarchical naming rules of a namespace
//!
//! A namespace is rooted at a caller-supplied table name. Every child table
//! is named `<root>__<n>` where `n` comes from the root's allocator.
//!
//! SQL engines cannot bind identifiers as parameters, so every identifier
//! that ends up in a statement template is validated here first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between a parent table name and an allocated child number
pub const CHILD_SEPARATOR: &str = "__";

/// Escape character used in catalog `LIKE` patterns
pub const LIKE_ESCAPE: char = '\\';

/// Longest identifier accepted (PostgreSQL truncates beyond 63 bytes)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Longest root identifier: leaves room for `__` plus any `i64` suffix
pub const MAX_ROOT_LEN: usize = MAX_IDENTIFIER_LEN - CHILD_SEPARATOR.len() - I64_MAX_DIGITS;

// `9223372036854775807`
const I64_MAX_DIGITS: usize = 19;

/// Identifier validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableIdError {
    #[error("table identifier is empty")]
    Empty,

    #[error("table identifier '{id}' exceeds {max} characters")]
    TooLong { id: String, max: usize },

    #[error("root table identifier '{id}' exceeds {max} characters, child names would not fit")]
    RootTooLong { id: String, max: usize },

    #[error("table identifier '{id}' contains invalid character '{ch}'")]
    InvalidCharacter { id: String, ch: char },

    #[error("table identifier '{id}' must start with a letter or underscore")]
    InvalidStart { id: String },
}

/// Validated SQL identifier naming one element table
///
/// Accepted shape: `[A-Za-z_][A-Za-z0-9_]*`, at most [`MAX_IDENTIFIER_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableId(String);

impl TableId {
    /// Validate and wrap an identifier
    pub fn parse(id: impl Into<String>) -> Result<Self, TableIdError> {
        let id = id.into();
        validate_identifier(&id)?;
        Ok(Self(id))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate and wrap an identifier that will own a namespace
    pub fn parse_root(id: impl Into<String>) -> Result<Self, TableIdError> {
        let id = Self::parse(id)?;
        id.check_root_capacity()?;
        Ok(id)
    }

    /// Fails unless every `<self>__<i64>` child name is itself a valid identifier
    pub fn check_root_capacity(&self) -> Result<(), TableIdError> {
        if self.0.len() > MAX_ROOT_LEN {
            return Err(TableIdError::RootTooLong {
                id: self.0.clone(),
                max: MAX_ROOT_LEN,
            });
        }
        Ok(())
    }

    /// Name of the child table with the given allocated number
    pub fn child(&self, element_id: i64) -> Result<TableId, TableIdError> {
        Self::parse(format!("{}{}{}", self.0, CHILD_SEPARATOR, element_id))
    }

    /// Prefix stored in the root table's `element_prefix` column
    pub fn element_prefix(&self) -> String {
        format!("{}:", self.0)
    }

    /// Catalog `LIKE` pattern matching every child table of this identifier
    ///
    /// Wildcards in the identifier itself are escaped with [`LIKE_ESCAPE`], so
    /// `root__%` does not also match `rootXY...`.
    pub fn child_pattern(&self) -> String {
        format!("{}%", escape_like(&format!("{}{}", self.0, CHILD_SEPARATOR)))
    }

    /// Whether `other` was derived from this identifier by [`TableId::child`]
    pub fn is_ancestor_of(&self, other: &TableId) -> bool {
        other
            .0
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix(CHILD_SEPARATOR))
            .is_some_and(|rest| !rest.is_empty())
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TableId {
    type Error = TableIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TableId> for String {
    fn from(id: TableId) -> Self {
        id.0
    }
}

impl AsRef<str> for TableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Escape `LIKE` wildcards (`%`, `_`) and the escape character itself
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 4);
    for ch in input.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

fn validate_identifier(id: &str) -> Result<(), TableIdError> {
    let mut chars = id.chars();
    let first = chars.next().ok_or(TableIdError::Empty)?;
    if id.len() > MAX_IDENTIFIER_LEN {
        return Err(TableIdError::TooLong {
            id: id.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(TableIdError::InvalidStart { id: id.to_string() });
    }
    if let Some(ch) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(TableIdError::InvalidCharacter {
            id: id.to_string(),
            ch,
        });
    }
    Ok(())
}

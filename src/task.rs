use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// A to-do item as the server returns it. Never stored locally beyond one render.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    #[serde(deserialize_with = "utc_timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(deserialize_with = "utc_timestamp")]
    pub updated_at: NaiveDateTime,
}

// The API emits naive UTC timestamps, some proxies append a `Z`.
fn utc_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").map_err(serde::de::Error::custom)
}

/// Which slice of the task list the server should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Pending, Filter::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Pending => "pending",
            Filter::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Pending => "Pending",
            Filter::Completed => "Completed",
        }
    }

    pub fn next(self) -> Filter {
        match self {
            Filter::All => Filter::Pending,
            Filter::Pending => Filter::Completed,
            Filter::Completed => Filter::All,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Filter::All),
            "pending" => Ok(Filter::Pending),
            "completed" => Ok(Filter::Completed),
            other => Err(format!(
                "unknown filter '{}', expected all, pending or completed",
                other
            )),
        }
    }
}

/// Form contents of the add/edit modal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
}

/// A draft that passed validation, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub title: String,
    pub description: Option<String>,
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
        }
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.description.clear();
    }

    /// Checks the draft before any network call. An empty description is sent as absent.
    pub fn validate(&self) -> Result<ValidDraft, ClientError> {
        let title = validate_title(&self.title)?;
        validate_description(&self.description)?;
        let description = if self.description.trim().is_empty() {
            None
        } else {
            Some(self.description.clone())
        };
        Ok(ValidDraft { title, description })
    }
}

/// Trims the title and enforces the 1..=200 character bound.
pub fn validate_title(title: &str) -> Result<String, ClientError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ClientError::ValidationFailed("title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ClientError::ValidationFailed(format!(
            "title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

pub fn validate_description(description: &str) -> Result<(), ClientError> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ClientError::ValidationFailed(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_CHARS
        )));
    }
    Ok(())
}

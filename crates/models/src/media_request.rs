use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Triage state of a media request. Any value may follow any other.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "StatusRepr")]
pub enum RequestStatus {
    #[default]
    Pending,
    Processing,
    Complete,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 3] = [Self::Pending, Self::Processing, Self::Complete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Complete => "Complete",
        }
    }

    fn from_ordinal(n: u64) -> Option<Self> {
        usize::try_from(n).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the variant name (any case) or its ordinal (`0`, `1`, `2`).
impl FromStr for RequestStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u64>() {
            return Self::from_ordinal(n)
                .ok_or_else(|| ModelError::Validation(format!("invalid status: {s}")));
        }
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::Validation(format!("invalid status: {s}")))
    }
}

// Older data files store the status as its ordinal.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Name(String),
    Ordinal(u64),
}

impl TryFrom<StatusRepr> for RequestStatus {
    type Error = ModelError;

    fn try_from(repr: StatusRepr) -> Result<Self, Self::Error> {
        match repr {
            StatusRepr::Name(name) => name.parse(),
            StatusRepr::Ordinal(n) => Self::from_ordinal(n)
                .ok_or_else(|| ModelError::Validation(format!("invalid status ordinal: {n}"))),
        }
    }
}

/// A user-submitted title awaiting triage.
///
/// Field names are PascalCase on the wire and on disk, matching what the
/// browser client reads.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct MediaRequest {
    pub id: String,
    pub title: String,
    pub requested_by: String,
    pub requested_by_name: String,
    pub requested_date: DateTime<Utc>,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

impl MediaRequest {
    /// Build a fresh `Pending` request. The title is trimmed and must not be empty.
    pub fn new(
        id: String,
        title: &str,
        requested_by: String,
        requested_by_name: String,
        requested_date: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            id,
            title: validate_title(title)?,
            requested_by,
            requested_by_name,
            requested_date,
            status: RequestStatus::Pending,
            admin_notes: None,
        })
    }

    /// Apply an admin edit. Creator fields and the title are never touched.
    pub fn apply(&mut self, edit: &RequestEdit) {
        match edit {
            RequestEdit::Status(status) => self.status = *status,
            RequestEdit::Notes(notes) => {
                self.admin_notes = notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
            }
        }
    }
}

/// Mutations an admin may apply to an existing request.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestEdit {
    Status(RequestStatus),
    Notes(Option<String>),
}

/// Body of `POST /Requests/Create`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateRequestInput {
    #[serde(default, alias = "Title")]
    pub title: String,
}

pub fn validate_title(raw: &str) -> Result<String, ModelError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ModelError::Validation("Title is required".into()));
    }
    Ok(title.to_string())
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A player's line in the standings table
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct StandingsRow {
    pub name: String,
    pub net_points: String,
    pub total_points: String,
    pub spent_points: String,
}

/// A single point change from the combined roll-up log
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub points_change: String,
    /// Inner markup of the description cell
    pub description: String,
    /// Untrimmed text of the description cell, `None` when the row has no such cell
    #[serde(skip)]
    pub description_text: Option<String>,
}

/// How values are inserted into generated HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Escaping {
    /// Values (description markup included) go in verbatim
    #[default]
    Raw,
    Escape,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Next direction for a column header click
    pub fn toggle(current: Option<SortDirection>) -> SortDirection {
        match current {
            Some(SortDirection::Asc) => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

/// Table view state owned by the client and round-tripped on every interaction
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Display column index -> last applied direction
    #[serde(default)]
    pub directions: BTreeMap<usize, SortDirection>,
    /// Current row order as indices into the standings in document order
    #[serde(default)]
    pub order: Vec<usize>,
    #[serde(default)]
    pub search: String,
}

/// Body of `POST /api/standings/view`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ViewRequest {
    #[serde(default)]
    pub state: ViewState,
    /// Column header that was clicked, if any
    #[serde(default)]
    pub sort: Option<usize>,
    /// New contents of the search box, if it changed
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ViewResponse {
    pub state: ViewState,
    pub tbody: String,
}

/// Result of one ingestion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Nothing waiting at the drop location
    SourceMissing,
    Ingested {
        archived_as: std::path::PathBuf,
        /// `true` when this roll-up started a new combined log
        created_log: bool,
    },
}

/// Default profile link; `{name}` is replaced with the encoded character name
pub const DEFAULT_PROFILE_URL: &str =
    "https://armory.warmane.com/character/{name}/Icecrown/profile";

//! Domain results handed to the presentation and persistence layers.
//!
//! The crate only constructs these. Long-term storage belongs to an external
//! collaborator reached through [`ResultSink`].

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CheckKind;

/// Identity and user-editable state shared by every result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    user_voted: bool,
    pub custom_name: Option<String>,
}

impl ResultMeta {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            user_voted: false,
            custom_name: None,
        }
    }

    pub fn user_voted(&self) -> bool {
        self.user_voted
    }

    /// Records that the result was shown and voted on.
    ///
    /// Returns `true` only the first time; the flag can never be cleared.
    pub fn mark_voted(&mut self) -> bool {
        if self.user_voted {
            return false;
        }
        self.user_voted = true;
        true
    }

    /// Sets or clears the user-chosen name. Blank names clear it.
    pub fn rename(&mut self, name: Option<&str>) {
        self.custom_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from);
    }
}

impl Default for ResultMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// One place the query photo was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub name: String,
    pub image_url: Option<String>,
    pub favicon_url: Option<String>,
    pub link: Option<String>,
    pub source: Option<String>,
    pub site_host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSearchResult {
    pub meta: ResultMeta,
    pub found_people: Vec<PersonRecord>,
    #[serde(skip)]
    pub query_image_snapshot: Option<Vec<u8>>,
}

/// A red flag or a recommendation from conversation analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub title: String,
    pub description: String,
    pub is_red: bool,
}

impl Flag {
    pub const RED_FLAG_LABEL: &'static str = "Red flag";
    pub const RECOMMENDATION_LABEL: &'static str = "Recommendation";

    pub fn red(text: impl Into<String>) -> Self {
        Self {
            title: text.into(),
            description: Self::RED_FLAG_LABEL.to_string(),
            is_red: true,
        }
    }

    pub fn recommendation(text: impl Into<String>) -> Self {
        Self {
            title: text.into(),
            description: Self::RECOMMENDATION_LABEL.to_string(),
            is_red: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub meta: ResultMeta,
    /// 0..=100
    pub risk_score: u8,
    pub red_flags: Vec<Flag>,
    /// Green flags.
    pub recommendations: Vec<Flag>,
    pub your_message_count: u32,
    pub their_message_count: u32,
    /// 0..=100
    pub your_interest: u8,
    /// 0..=100
    pub their_interest: u8,
    #[serde(skip)]
    pub query_image_snapshot: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationResult {
    pub meta: ResultMeta,
    pub location_text: String,
    #[serde(skip)]
    pub query_snapshot: Option<Vec<u8>>,
}

/// The outcome of one successful analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisResult {
    Profile(ProfileSearchResult),
    Conversation(ConversationResult),
    Location(LocationResult),
}

impl AnalysisResult {
    pub fn kind(&self) -> CheckKind {
        match self {
            AnalysisResult::Profile(_) => CheckKind::Profile,
            AnalysisResult::Conversation(_) => CheckKind::Conversation,
            AnalysisResult::Location(_) => CheckKind::Location,
        }
    }

    pub fn meta(&self) -> &ResultMeta {
        match self {
            AnalysisResult::Profile(r) => &r.meta,
            AnalysisResult::Conversation(r) => &r.meta,
            AnalysisResult::Location(r) => &r.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ResultMeta {
        match self {
            AnalysisResult::Profile(r) => &mut r.meta,
            AnalysisResult::Conversation(r) => &mut r.meta,
            AnalysisResult::Location(r) => &mut r.meta,
        }
    }
}

/// Persistence collaborator that stores finished results.
pub trait ResultSink: Send + Sync {
    fn save(&self, result: &AnalysisResult) -> anyhow::Result<()>;
}

/// Keeps results in memory, for the CLI and tests.
#[derive(Debug, Default)]
pub struct MemoryResultSink {
    saved: Mutex<Vec<AnalysisResult>>,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<AnalysisResult> {
        self.saved
            .lock()
            .map(|saved| saved.clone())
            .unwrap_or_default()
    }
}

impl ResultSink for MemoryResultSink {
    fn save(&self, result: &AnalysisResult) -> anyhow::Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("result store lock poisoned"))?;
        saved.push(result.clone());
        Ok(())
    }
}

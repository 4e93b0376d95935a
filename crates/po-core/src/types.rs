use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PoError;

/// Normalize user-supplied enum text: `in-progress`, `In Progress` and
/// `IN_PROGRESS` all become `IN_PROGRESS`.
fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// StoryStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoryStatus {
    Draft,
    InProgress,
    Done,
}

impl StoryStatus {
    pub fn all() -> &'static [StoryStatus] {
        &[StoryStatus::Draft, StoryStatus::InProgress, StoryStatus::Done]
    }

    /// The only status a story may move to next. Stories move strictly
    /// forward one step at a time.
    pub fn next(self) -> Option<StoryStatus> {
        match self {
            StoryStatus::Draft => Some(StoryStatus::InProgress),
            StoryStatus::InProgress => Some(StoryStatus::Done),
            StoryStatus::Done => None,
        }
    }

    pub fn can_transition_to(self, to: StoryStatus) -> bool {
        self.next() == Some(to)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoryStatus::Draft => "DRAFT",
            StoryStatus::InProgress => "IN_PROGRESS",
            StoryStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoryStatus {
    type Err = PoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "DRAFT" => Ok(StoryStatus::Draft),
            "IN_PROGRESS" => Ok(StoryStatus::InProgress),
            "DONE" => Ok(StoryStatus::Done),
            _ => Err(PoError::validation(format!("unknown story status '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// SprintStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SprintStatus {
    Planning,
    Active,
    Completed,
}

impl SprintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SprintStatus::Planning => "PLANNING",
            SprintStatus::Active => "ACTIVE",
            SprintStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SprintStatus {
    type Err = PoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "PLANNING" => Ok(SprintStatus::Planning),
            "ACTIVE" => Ok(SprintStatus::Active),
            "COMPLETED" => Ok(SprintStatus::Completed),
            _ => Err(PoError::validation(format!("unknown sprint status '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = PoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            "CRITICAL" => Ok(Priority::Critical),
            _ => Err(PoError::validation(format!("unknown priority '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// BacklogStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BacklogStatus {
    #[default]
    New,
    Ready,
    InSprint,
    Done,
}

impl BacklogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BacklogStatus::New => "NEW",
            BacklogStatus::Ready => "READY",
            BacklogStatus::InSprint => "IN_SPRINT",
            BacklogStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for BacklogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BacklogStatus {
    type Err = PoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "NEW" => Ok(BacklogStatus::New),
            "READY" => Ok(BacklogStatus::Ready),
            "IN_SPRINT" => Ok(BacklogStatus::InSprint),
            "DONE" => Ok(BacklogStatus::Done),
            _ => Err(PoError::validation(format!("unknown backlog status '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// FeedbackType / FeedbackStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackType {
    FeatureRequest,
    Bug,
    Improvement,
    #[default]
    General,
}

impl FeedbackType {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackType::FeatureRequest => "FEATURE_REQUEST",
            FeedbackType::Bug => "BUG",
            FeedbackType::Improvement => "IMPROVEMENT",
            FeedbackType::General => "GENERAL",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeedbackType {
    type Err = PoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "FEATURE_REQUEST" | "FEATURE" => Ok(FeedbackType::FeatureRequest),
            "BUG" => Ok(FeedbackType::Bug),
            "IMPROVEMENT" => Ok(FeedbackType::Improvement),
            "GENERAL" => Ok(FeedbackType::General),
            _ => Err(PoError::validation(format!("unknown feedback type '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackStatus {
    #[default]
    Open,
    Reviewed,
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackStatus::Open => "OPEN",
            FeedbackStatus::Reviewed => "REVIEWED",
            FeedbackStatus::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeedbackStatus {
    type Err = PoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "OPEN" => Ok(FeedbackStatus::Open),
            "REVIEWED" => Ok(FeedbackStatus::Reviewed),
            "RESOLVED" => Ok(FeedbackStatus::Resolved),
            _ => Err(PoError::validation(format!("unknown feedback status '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

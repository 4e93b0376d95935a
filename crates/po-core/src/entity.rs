//! Plain records for the five stored entity types.
//!
//! Identities are assigned by the owning repository on `create`; a record
//! built in memory carries id `0` until then. Timestamps are stamped by
//! whoever builds or mutates the record, at the moment of the operation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{
    BacklogStatus, FeedbackStatus, FeedbackType, Priority, SprintStatus, StoryStatus,
};

pub type EntityId = u64;

/// Identity value of a record that has not been persisted yet.
pub const UNASSIGNED: EntityId = 0;

/// Common contract for every stored record.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable name used in errors and logs.
    const KIND: &'static str;
    /// Storage table / collection name.
    const TABLE: &'static str;

    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);
}

macro_rules! impl_entity {
    ($ty:ty, $kind:literal, $table:literal) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;
            const TABLE: &'static str = $table;

            fn id(&self) -> EntityId {
                self.id
            }

            fn set_id(&mut self, id: EntityId) {
                self.id = id;
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UserStory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    pub story_points: u32,
    pub status: StoryStatus,
    #[serde(default)]
    pub sprint_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserStory {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UNASSIGNED,
            title: title.into(),
            description: description.into(),
            acceptance_criteria: Vec::new(),
            priority: Priority::default(),
            story_points: 0,
            status: StoryStatus::Draft,
            sprint_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == StoryStatus::Done
    }
}

impl_entity!(UserStory, "user story", "user_stories");

// ---------------------------------------------------------------------------
// Sprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: EntityId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goal: String,
    pub status: SprintStatus,
    /// Completed story points; derived by performance analysis.
    pub velocity: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sprint {
    pub fn new(
        name: impl Into<String>,
        goal: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UNASSIGNED,
            name: name.into(),
            start_date,
            end_date,
            goal: goal.into(),
            status: SprintStatus::Planning,
            velocity: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Length of the sprint in days, inclusive of both ends.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

impl_entity!(Sprint, "sprint", "sprints");

// ---------------------------------------------------------------------------
// BacklogItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: BacklogStatus,
    #[serde(default)]
    pub story_points: u32,
    #[serde(default)]
    pub sprint_id: Option<EntityId>,
    /// Stakeholder-assessed value, 1–10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_value: Option<u8>,
    /// Team-assessed technical complexity, 1–10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BacklogItem {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UNASSIGNED,
            title: title.into(),
            description: description.into(),
            priority: Priority::default(),
            status: BacklogStatus::default(),
            story_points: 0,
            sprint_id: None,
            business_value: None,
            complexity: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl_entity!(BacklogItem, "backlog item", "backlog_items");

// ---------------------------------------------------------------------------
// Stakeholder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: EntityId,
    pub name: String,
    pub role: String,
    pub contact: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stakeholder {
    pub fn new(name: impl Into<String>, role: impl Into<String>, contact: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UNASSIGNED,
            name: name.into(),
            role: role.into(),
            contact: contact.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl_entity!(Stakeholder, "stakeholder", "stakeholders");

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: EntityId,
    pub stakeholder_id: EntityId,
    pub content: String,
    #[serde(rename = "type", default)]
    pub feedback_type: FeedbackType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(stakeholder_id: EntityId, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UNASSIGNED,
            stakeholder_id,
            content: content.into(),
            feedback_type: FeedbackType::default(),
            priority: Priority::default(),
            status: FeedbackStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl_entity!(Feedback, "feedback", "feedback");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_are_unassigned() {
        let story = UserStory::new("Reset password", "As a user...");
        assert_eq!(story.id(), UNASSIGNED);
        assert_eq!(story.status, StoryStatus::Draft);
        assert_eq!(story.created_at, story.updated_at);
    }

    #[test]
    fn sprint_starts_planning_with_zero_velocity() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let sprint = Sprint::new("Sprint 1", "Ship login", start, end);
        assert_eq!(sprint.status, SprintStatus::Planning);
        assert_eq!(sprint.velocity, 0.0);
        assert_eq!(sprint.duration_days(), 14);
    }

    #[test]
    fn feedback_type_serializes_as_type() {
        let fb = Feedback::new(3, "Dark mode please");
        let value = serde_json::to_value(&fb).unwrap();
        assert_eq!(value["type"], "GENERAL");
        assert_eq!(value["stakeholder_id"], 3);
    }

    #[test]
    fn backlog_item_omits_unset_scores() {
        let item = BacklogItem::new("Auth", "Implement authentication");
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("business_value").is_none());
        let parsed: BacklogItem = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, item);
    }
}

//! Inputs and results of the product-owner workflows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{
    FeedbackAnalysis, Prioritization, SprintPerformance, SprintReport, StoryAnalysis,
};
use crate::entity::{EntityId, Feedback, Sprint, Stakeholder, UserStory};
use crate::error::{PoError, Result};
use crate::types::Priority;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStory {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    /// When empty, the analysis' recommendations become the criteria.
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub sprint_id: Option<EntityId>,
}

impl NewStory {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(PoError::validation("story title is empty"));
        }
        if self.description.trim().is_empty() {
            return Err(PoError::validation("story description is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSprint {
    pub name: String,
    #[serde(default)]
    pub goal: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub capacity_points: Option<u32>,
}

impl NewSprint {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PoError::validation("sprint name is empty"));
        }
        if self.end_date < self.start_date {
            return Err(PoError::validation(format!(
                "sprint ends ({}) before it starts ({})",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryCreated {
    pub story: UserStory,
    pub analysis: StoryAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintPlan {
    pub sprint: Sprint,
    pub prioritization: Prioritization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    pub sprint: Sprint,
    pub performance: SprintPerformance,
    pub report: SprintReport,
    pub stakeholders: Vec<Stakeholder>,
    pub feedback: Vec<Feedback>,
    /// Present when any feedback has been recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_analysis: Option<FeedbackAnalysis>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackReview {
    pub analysis: FeedbackAnalysis,
    pub stakeholders: Vec<Stakeholder>,
    pub feedback_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBreakdown {
    pub story: UserStory,
    pub tasks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_story_requires_title_and_description() {
        assert!(NewStory::new("Login", "As a user...").validate().is_ok());
        assert!(NewStory::new("  ", "As a user...").validate().is_err());
        assert!(NewStory::new("Login", "").validate().is_err());
    }

    #[test]
    fn new_sprint_rejects_inverted_dates() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 7, d).unwrap();
        let mut input = NewSprint {
            name: "Sprint 1".into(),
            goal: String::new(),
            start_date: day(1),
            end_date: day(1),
            capacity_points: None,
        };
        assert!(input.validate().is_ok());
        input.end_date = day(1).pred_opt().unwrap();
        assert!(input.validate().unwrap_err().is_client_error());
        input.end_date = day(14);
        input.name = String::new();
        assert!(input.validate().is_err());
    }
}

//! Analysis agents: turn entity snapshots into prompts, send them through a
//! [`CompletionClient`], and parse the generated text into typed results.
//!
//! The text contract every completion must follow is described in
//! [`parse`]. When a completion does not follow it, the operation fails with
//! [`PoError::Parse`] naming the offending section.
//!
//! Two agents are provided and selected by `agent.kind`:
//! - [`LlmAnalysisAgent`] sends one completion per operation.
//! - [`AdvancedAnalysisAgent`] wraps it and enriches results with heuristics
//!   over a [`TrainingStore`].

pub mod advanced;
pub mod llm;
pub mod parse;
pub mod prompt;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use completion_client::{CompletionClient, CompletionOptions};
use serde::{Deserialize, Serialize};

use crate::config::AgentKind;
use crate::entity::{BacklogItem, EntityId, Feedback, Sprint, Stakeholder, UserStory};
use crate::error::{PoError, Result};
use crate::training::TrainingStore;
use crate::types::Priority;

pub use advanced::AdvancedAnalysisAgent;
pub use llm::LlmAnalysisAgent;

// ---------------------------------------------------------------------------
// AnalysisAgent
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze_story(&self, description: &str, context: &StoryContext)
        -> Result<StoryAnalysis>;

    /// Rank `items`. The result always contains every item exactly once.
    async fn prioritize_backlog(
        &self,
        items: &[BacklogItem],
        context: &PlanningContext,
    ) -> Result<Prioritization>;

    async fn analyze_sprint_performance(&self, snapshot: &SprintSnapshot)
        -> Result<SprintPerformance>;

    async fn generate_sprint_report(&self, context: &ReportContext) -> Result<SprintReport>;

    async fn analyze_feedback(&self, feedback: &[Feedback]) -> Result<FeedbackAnalysis>;

    /// Split a feature description into technical tasks.
    async fn break_down_feature(&self, description: &str) -> Result<Vec<String>>;
}

/// Build the agent selected by configuration.
pub fn build_agent(
    kind: AgentKind,
    client: Arc<dyn CompletionClient>,
    options: CompletionOptions,
    training: Arc<TrainingStore>,
) -> Arc<dyn AnalysisAgent> {
    let standard = LlmAnalysisAgent::new(client, options);
    match kind {
        AgentKind::Standard => Arc::new(standard),
        AgentKind::Advanced => Arc::new(AdvancedAnalysisAgent::new(standard, training)),
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// What is known about a story besides its description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryContext {
    pub title: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The sprint being planned when the backlog is prioritized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningContext {
    pub sprint_name: String,
    pub goal: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_points: Option<u32>,
}

/// A sprint together with its stories and the velocity of earlier sprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintSnapshot {
    pub sprint: Sprint,
    pub stories: Vec<UserStory>,
    /// Velocities of sprints created before this one, oldest first.
    pub previous_velocities: Vec<f64>,
}

impl SprintSnapshot {
    /// Story points of DONE stories. This is the sprint's velocity.
    pub fn completed_points(&self) -> f64 {
        self.stories
            .iter()
            .filter(|s| s.is_done())
            .map(|s| f64::from(s.story_points))
            .sum()
    }

    pub fn planned_points(&self) -> f64 {
        self.stories.iter().map(|s| f64::from(s.story_points)).sum()
    }

    /// Fraction of planned points completed, 0.0 for an empty sprint.
    pub fn completion_rate(&self) -> f64 {
        let planned = self.planned_points();
        if planned == 0.0 {
            0.0
        } else {
            self.completed_points() / planned
        }
    }
}

/// Everything a sprint report is written from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportContext {
    pub snapshot: SprintSnapshot,
    pub performance: SprintPerformance,
    pub stakeholders: Vec<Stakeholder>,
    pub feedback: Vec<Feedback>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<RiskLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryAnalysis {
    pub story_points: u32,
    pub risks: Vec<Risk>,
    pub recommendations: Vec<String>,
    /// Business value, 1–10.
    pub value_score: u8,
    /// Technical complexity, 1–10.
    pub complexity_score: u8,
    /// The completion text the analysis was parsed from.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub item_id: EntityId,
    /// 1-based position in the ordering.
    pub rank: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

/// An advisory ordering of backlog items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prioritization {
    pub ordered: Vec<RankedItem>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw: String,
}

impl Prioritization {
    pub fn item_ids(&self) -> Vec<EntityId> {
        self.ordered.iter().map(|r| r.item_id).collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocityTrend {
    Improving,
    Stable,
    Declining,
}

impl VelocityTrend {
    pub fn as_str(self) -> &'static str {
        match self {
            VelocityTrend::Improving => "improving",
            VelocityTrend::Stable => "stable",
            VelocityTrend::Declining => "declining",
        }
    }
}

impl fmt::Display for VelocityTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VelocityTrend {
    type Err = PoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "improving" => Ok(VelocityTrend::Improving),
            "stable" => Ok(VelocityTrend::Stable),
            "declining" => Ok(VelocityTrend::Declining),
            _ => Err(PoError::validation(format!("unknown velocity trend '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetric {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintPerformance {
    /// Completed story points at the time of analysis.
    pub velocity: f64,
    pub velocity_trend: VelocityTrend,
    pub quality_metrics: Vec<QualityMetric>,
    pub risk_assessment: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintReport {
    pub executive_summary: String,
    pub detailed_analysis: String,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAnalysis {
    pub patterns: Vec<String>,
    pub impact_assessment: Vec<String>,
    pub action_items: Vec<String>,
    pub risk_assessment: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoryStatus;

    fn story(points: u32, status: StoryStatus) -> UserStory {
        let mut s = UserStory::new("s", "d");
        s.story_points = points;
        s.status = status;
        s
    }

    #[test]
    fn snapshot_velocity_counts_done_points_only() {
        let day = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let snapshot = SprintSnapshot {
            sprint: Sprint::new("S1", "goal", day, day),
            stories: vec![
                story(5, StoryStatus::Done),
                story(3, StoryStatus::InProgress),
                story(2, StoryStatus::Done),
            ],
            previous_velocities: vec![],
        };
        assert_eq!(snapshot.completed_points(), 7.0);
        assert_eq!(snapshot.planned_points(), 10.0);
        assert!((snapshot.completion_rate() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn empty_snapshot_has_zero_rate() {
        let day = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let snapshot = SprintSnapshot {
            sprint: Sprint::new("S1", "goal", day, day),
            stories: vec![],
            previous_velocities: vec![],
        };
        assert_eq!(snapshot.completion_rate(), 0.0);
    }

    #[test]
    fn velocity_trend_parses_keywords() {
        assert_eq!("Improving".parse::<VelocityTrend>().unwrap(), VelocityTrend::Improving);
        assert!("sideways".parse::<VelocityTrend>().is_err());
        assert_eq!(
            serde_json::to_string(&VelocityTrend::Declining).unwrap(),
            "\"declining\""
        );
    }
}

//! The product-owner workflows.
//!
//! [`ProductOwner`] sequences repository calls and analysis-agent calls.
//! Every workflow either completes or fails at its first error; nothing is
//! rolled back.
//!
//! Story lifecycle:
//!
//! ```text
//! DRAFT ──▶ IN_PROGRESS ──▶ DONE
//!                             │
//!                             └─▶ sprint performance re-analyzed
//! ```

pub mod model;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{
    AnalysisAgent, PlanningContext, ReportContext, SprintPerformance, SprintSnapshot,
    StoryContext,
};
use crate::entity::{BacklogItem, EntityId, Feedback, Sprint, Stakeholder, UserStory};
use crate::error::{PoError, Result};
use crate::repository::{collect_all, require, Repositories};
use crate::types::StoryStatus;

pub use model::{
    ComprehensiveReport, FeedbackReview, NewSprint, NewStory, SprintPlan, StoryCreated,
    TaskBreakdown,
};

pub struct ProductOwner {
    repos: Repositories,
    agent: Arc<dyn AnalysisAgent>,
}

impl ProductOwner {
    pub fn new(repos: Repositories, agent: Arc<dyn AnalysisAgent>) -> Self {
        Self { repos, agent }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }

    // -----------------------------------------------------------------------
    // Stories
    // -----------------------------------------------------------------------

    /// Analyze a new story and persist it as DRAFT with the estimated points.
    pub async fn create_and_analyze_story(&self, input: NewStory) -> Result<StoryCreated> {
        input.validate()?;
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, title = %input.title, "create_and_analyze_story: started");

        if let Some(sprint_id) = input.sprint_id {
            require::<Sprint, _>(self.repos.sprints.as_ref(), sprint_id).await?;
        }

        let context = StoryContext {
            title: input.title.clone(),
            priority: input.priority,
            acceptance_criteria: input.acceptance_criteria.clone(),
            notes: None,
        };
        let analysis = self.agent.analyze_story(&input.description, &context).await?;

        let mut story = UserStory::new(input.title, input.description);
        story.priority = input.priority;
        story.story_points = analysis.story_points;
        story.sprint_id = input.sprint_id;
        story.acceptance_criteria = if input.acceptance_criteria.is_empty() {
            analysis.recommendations.clone()
        } else {
            input.acceptance_criteria
        };
        let story = self.repos.stories.create(story).await?;

        info!(
            run_id = %run_id,
            story_id = story.id,
            story_points = story.story_points,
            "create_and_analyze_story: story created"
        );
        Ok(StoryCreated { story, analysis })
    }

    /// Move a story one step along DRAFT → IN_PROGRESS → DONE. Reaching DONE
    /// re-analyzes the story's sprint when it has one; the story is saved
    /// only after that analysis succeeds, so a failed DONE can be retried.
    pub async fn update_story_status(
        &self,
        story_id: EntityId,
        new_status: StoryStatus,
    ) -> Result<UserStory> {
        let mut story = require::<UserStory, _>(self.repos.stories.as_ref(), story_id).await?;
        if !story.status.can_transition_to(new_status) {
            return Err(PoError::InvalidTransition {
                from: story.status.to_string(),
                to: new_status.to_string(),
            });
        }

        let from = story.status;
        story.status = new_status;
        story.updated_at = Utc::now();

        let mut evaluated = None;
        if new_status == StoryStatus::Done {
            if let Some(sprint_id) = story.sprint_id {
                match self.repos.sprints.get_by_id(sprint_id).await? {
                    Some(sprint) => evaluated = Some(self.evaluate(sprint, Some(&story)).await?),
                    None => {
                        warn!(story_id, sprint_id, "update_story_status: sprint no longer exists")
                    }
                }
            }
        }

        let story = self.repos.stories.update(story).await?;
        info!(story_id, from = %from, to = %new_status, "update_story_status: transitioned");

        if let Some((performance, sprint)) = evaluated {
            let sprint = self.repos.sprints.update(sprint).await?;
            info!(
                sprint_id = sprint.id,
                velocity = sprint.velocity,
                trend = %performance.velocity_trend,
                "update_story_status: sprint re-analyzed"
            );
        }
        Ok(story)
    }

    pub async fn assign_story_to_sprint(
        &self,
        story_id: EntityId,
        sprint_id: EntityId,
    ) -> Result<UserStory> {
        let mut story = require::<UserStory, _>(self.repos.stories.as_ref(), story_id).await?;
        require::<Sprint, _>(self.repos.sprints.as_ref(), sprint_id).await?;
        story.sprint_id = Some(sprint_id);
        story.updated_at = Utc::now();
        let story = self.repos.stories.update(story).await?;
        info!(story_id, sprint_id, "assign_story_to_sprint: assigned");
        Ok(story)
    }

    pub async fn break_down_story(&self, story_id: EntityId) -> Result<TaskBreakdown> {
        let story = require::<UserStory, _>(self.repos.stories.as_ref(), story_id).await?;
        let feature = format!("{}\n\n{}", story.title, story.description);
        let tasks = self.agent.break_down_feature(&feature).await?;
        info!(story_id, tasks = tasks.len(), "break_down_story: done");
        Ok(TaskBreakdown { story, tasks })
    }

    // -----------------------------------------------------------------------
    // Sprints
    // -----------------------------------------------------------------------

    /// Prioritize the whole backlog and persist a new PLANNING sprint.
    pub async fn prioritize_and_plan_sprint(&self, input: NewSprint) -> Result<SprintPlan> {
        input.validate()?;
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, sprint = %input.name, "prioritize_and_plan_sprint: started");

        let items = collect_all::<BacklogItem, _>(self.repos.backlog.as_ref()).await?;
        let context = PlanningContext {
            sprint_name: input.name.clone(),
            goal: input.goal.clone(),
            start_date: input.start_date,
            end_date: input.end_date,
            capacity_points: input.capacity_points,
        };
        let prioritization = self.agent.prioritize_backlog(&items, &context).await?;

        let sprint = Sprint::new(input.name, input.goal, input.start_date, input.end_date);
        let sprint = self.repos.sprints.create(sprint).await?;

        info!(
            run_id = %run_id,
            sprint_id = sprint.id,
            items = prioritization.len(),
            "prioritize_and_plan_sprint: sprint created"
        );
        Ok(SprintPlan {
            sprint,
            prioritization,
        })
    }

    /// Analyze a sprint and persist its velocity: the story points of its
    /// DONE stories.
    pub async fn analyze_sprint_performance(
        &self,
        sprint_id: EntityId,
    ) -> Result<SprintPerformance> {
        let sprint = require::<Sprint, _>(self.repos.sprints.as_ref(), sprint_id).await?;
        let (performance, sprint) = self.evaluate(sprint, None).await?;
        self.repos.sprints.update(sprint).await?;

        info!(
            sprint_id,
            velocity = performance.velocity,
            trend = %performance.velocity_trend,
            "analyze_sprint_performance: done"
        );
        Ok(performance)
    }

    /// Performance analysis, sprint report, and the stakeholder and feedback
    /// picture, in one result.
    pub async fn generate_comprehensive_report(
        &self,
        sprint_id: EntityId,
    ) -> Result<ComprehensiveReport> {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, sprint_id, "generate_comprehensive_report: started");

        let performance = self.analyze_sprint_performance(sprint_id).await?;
        let sprint = require::<Sprint, _>(self.repos.sprints.as_ref(), sprint_id).await?;
        let snapshot = self.snapshot(sprint).await?;
        let stakeholders = collect_all::<Stakeholder, _>(self.repos.stakeholders.as_ref()).await?;
        let feedback = collect_all::<Feedback, _>(self.repos.feedback.as_ref()).await?;

        let feedback_analysis = if feedback.is_empty() {
            None
        } else {
            Some(self.agent.analyze_feedback(&feedback).await?)
        };

        let context = ReportContext {
            snapshot,
            performance,
            stakeholders,
            feedback,
        };
        let report = self.agent.generate_sprint_report(&context).await?;

        info!(run_id = %run_id, sprint_id, "generate_comprehensive_report: done");
        let ReportContext {
            snapshot,
            performance,
            stakeholders,
            feedback,
        } = context;
        Ok(ComprehensiveReport {
            sprint: snapshot.sprint,
            performance,
            report,
            stakeholders,
            feedback,
            feedback_analysis,
            generated_at: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Feedback
    // -----------------------------------------------------------------------

    pub async fn analyze_stakeholder_feedback(&self) -> Result<FeedbackReview> {
        let feedback = collect_all::<Feedback, _>(self.repos.feedback.as_ref()).await?;
        if feedback.is_empty() {
            return Err(PoError::validation("no feedback recorded"));
        }
        let stakeholders = collect_all::<Stakeholder, _>(self.repos.stakeholders.as_ref()).await?;
        let analysis = self.agent.analyze_feedback(&feedback).await?;
        info!(
            feedback = feedback.len(),
            stakeholders = stakeholders.len(),
            "analyze_stakeholder_feedback: done"
        );
        Ok(FeedbackReview {
            analysis,
            stakeholders,
            feedback_count: feedback.len(),
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Run the performance analysis for `sprint` without saving anything.
    /// `pending` stands in for its stored version in the snapshot. Returns the
    /// analysis and the sprint with its recomputed velocity.
    async fn evaluate(
        &self,
        sprint: Sprint,
        pending: Option<&UserStory>,
    ) -> Result<(SprintPerformance, Sprint)> {
        let mut snapshot = self.snapshot(sprint).await?;
        if let Some(story) = pending {
            match snapshot.stories.iter_mut().find(|s| s.id == story.id) {
                Some(stored) => *stored = story.clone(),
                None => snapshot.stories.push(story.clone()),
            }
        }
        let velocity = snapshot.completed_points();

        let mut performance = self.agent.analyze_sprint_performance(&snapshot).await?;
        performance.velocity = velocity;

        let mut sprint = snapshot.sprint;
        sprint.velocity = velocity;
        sprint.updated_at = Utc::now();
        Ok((performance, sprint))
    }

    /// The sprint's stories plus the velocity of every earlier sprint.
    async fn snapshot(&self, sprint: Sprint) -> Result<SprintSnapshot> {
        let stories = collect_all::<UserStory, _>(self.repos.stories.as_ref())
            .await?
            .into_iter()
            .filter(|s| s.sprint_id == Some(sprint.id))
            .collect();
        let previous_velocities = collect_all::<Sprint, _>(self.repos.sprints.as_ref())
            .await?
            .into_iter()
            .filter(|s| s.id < sprint.id)
            .map(|s| s.velocity)
            .collect();
        Ok(SprintSnapshot {
            sprint,
            stories,
            previous_velocities,
        })
    }
}

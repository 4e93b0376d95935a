use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    AnalysisAgent, FeedbackAnalysis, LlmAnalysisAgent, PlanningContext, Prioritization,
    ReportContext, SprintPerformance, SprintReport, SprintSnapshot, StoryAnalysis, StoryContext,
    VelocityTrend,
};
use crate::entity::{BacklogItem, Feedback};
use crate::error::Result;
use crate::training::{Category, TrainingStore};

/// Relative change against the recent mean that counts as a trend.
const TREND_THRESHOLD: f64 = 0.10;
/// Previous sprints considered when computing the trend.
const TREND_WINDOW: usize = 3;
/// Complexity this far above the recorded mean earns a split recommendation.
const COMPLEXITY_MARGIN: f64 = 3.0;

/// Standard analysis plus local heuristics learned from past results.
///
/// Story complexity, risk severity, velocity and completion rates are
/// recorded in the shared [`TrainingStore`] after each analysis. When the
/// snapshot carries at least one earlier sprint velocity, the trend is
/// computed locally from those persisted velocities and the current one
/// instead of taken from the completion.
pub struct AdvancedAnalysisAgent {
    inner: LlmAnalysisAgent,
    training: Arc<TrainingStore>,
}

impl AdvancedAnalysisAgent {
    pub fn new(inner: LlmAnalysisAgent, training: Arc<TrainingStore>) -> Self {
        Self { inner, training }
    }

    pub fn training(&self) -> &TrainingStore {
        &self.training
    }
}

/// Trend of `current` against the mean of the last few `previous` values.
/// `None` when there is nothing to compare against.
pub fn velocity_trend(previous: &[f64], current: f64) -> Option<VelocityTrend> {
    if previous.is_empty() {
        return None;
    }
    let window = &previous[previous.len().saturating_sub(TREND_WINDOW)..];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let trend = if mean == 0.0 {
        if current > 0.0 {
            VelocityTrend::Improving
        } else {
            VelocityTrend::Stable
        }
    } else {
        let change = (current - mean) / mean;
        if change > TREND_THRESHOLD {
            VelocityTrend::Improving
        } else if change < -TREND_THRESHOLD {
            VelocityTrend::Declining
        } else {
            VelocityTrend::Stable
        }
    };
    Some(trend)
}

fn label(text: &str) -> String {
    const MAX: usize = 60;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl AnalysisAgent for AdvancedAnalysisAgent {
    fn name(&self) -> &str {
        "advanced"
    }

    async fn analyze_story(
        &self,
        description: &str,
        context: &StoryContext,
    ) -> Result<StoryAnalysis> {
        let mut analysis = self.inner.analyze_story(description, context).await?;

        let complexity = f64::from(analysis.complexity_score);
        if let Some(mean) = self.training.mean(Category::StoryComplexity) {
            if complexity - mean >= COMPLEXITY_MARGIN {
                analysis.recommendations.push(format!(
                    "Complexity {complexity} is well above the recent average of {mean:.1}; \
                     consider splitting the story"
                ));
            }
        }

        let name = label(if context.title.is_empty() {
            description
        } else {
            context.title.as_str()
        });
        self.training
            .record(Category::StoryComplexity, complexity, name.clone());
        for risk in &analysis.risks {
            let weight = risk.severity.map_or(1.0, |s| s.weight());
            self.training
                .record(Category::RiskPatterns, weight, label(&risk.description));
        }
        debug!(story = %name, complexity, "recorded story analysis");
        Ok(analysis)
    }

    async fn prioritize_backlog(
        &self,
        items: &[BacklogItem],
        context: &PlanningContext,
    ) -> Result<Prioritization> {
        self.inner.prioritize_backlog(items, context).await
    }

    async fn analyze_sprint_performance(
        &self,
        snapshot: &SprintSnapshot,
    ) -> Result<SprintPerformance> {
        let mut performance = self.inner.analyze_sprint_performance(snapshot).await?;

        if let Some(trend) = velocity_trend(&snapshot.previous_velocities, performance.velocity) {
            if trend != performance.velocity_trend {
                debug!(
                    sprint_id = snapshot.sprint.id,
                    reported = %performance.velocity_trend,
                    computed = %trend,
                    "overriding velocity trend from history"
                );
            }
            performance.velocity_trend = trend;
        }

        let sprint = label(&snapshot.sprint.name);
        self.training
            .record(Category::Velocity, performance.velocity, sprint.clone());
        self.training.record(
            Category::TeamPerformance,
            snapshot.completion_rate(),
            sprint,
        );
        Ok(performance)
    }

    async fn generate_sprint_report(&self, context: &ReportContext) -> Result<SprintReport> {
        let report = self.inner.generate_sprint_report(context).await?;
        self.training.record(
            Category::SuccessMetrics,
            context.snapshot.completion_rate(),
            label(&context.snapshot.sprint.name),
        );
        Ok(report)
    }

    async fn analyze_feedback(&self, feedback: &[Feedback]) -> Result<FeedbackAnalysis> {
        self.inner.analyze_feedback(feedback).await
    }

    async fn break_down_feature(&self, description: &str) -> Result<Vec<String>> {
        self.inner.break_down_feature(description).await
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use completion_client::{CompletionClient, CompletionOptions};
use tracing::debug;

use super::prompt::{self, SYSTEM_PROMPT};
use super::{
    parse, AnalysisAgent, FeedbackAnalysis, PlanningContext, Prioritization, ReportContext,
    SprintPerformance, SprintReport, SprintSnapshot, StoryAnalysis, StoryContext,
};
use crate::entity::{BacklogItem, Feedback};
use crate::error::Result;

/// Task breakdowns want a more literal list than open-ended analysis.
const BREAKDOWN_TEMPERATURE: f32 = 0.3;

/// One completion per operation, parsed under the contract in [`parse`].
pub struct LlmAnalysisAgent {
    client: Arc<dyn CompletionClient>,
    options: CompletionOptions,
}

impl LlmAnalysisAgent {
    pub fn new(client: Arc<dyn CompletionClient>, options: CompletionOptions) -> Self {
        Self { client, options }
    }

    async fn ask(&self, operation: &str, user_prompt: &str, options: &CompletionOptions) -> Result<String> {
        debug!(
            operation,
            client = self.client.name(),
            prompt_len = user_prompt.len(),
            "requesting completion"
        );
        let text = self.client.complete(SYSTEM_PROMPT, user_prompt, options).await?;
        debug!(operation, response_len = text.len(), "completion received");
        Ok(text)
    }
}

#[async_trait]
impl AnalysisAgent for LlmAnalysisAgent {
    fn name(&self) -> &str {
        "standard"
    }

    async fn analyze_story(
        &self,
        description: &str,
        context: &StoryContext,
    ) -> Result<StoryAnalysis> {
        let user_prompt = prompt::story_analysis(description, context)?;
        let text = self.ask("analyze_story", &user_prompt, &self.options).await?;
        parse::story_analysis(&text)
    }

    async fn prioritize_backlog(
        &self,
        items: &[BacklogItem],
        context: &PlanningContext,
    ) -> Result<Prioritization> {
        if items.is_empty() {
            debug!("empty backlog, nothing to prioritize");
            return Ok(Prioritization::default());
        }
        let user_prompt = prompt::prioritization(items, context)?;
        let text = self.ask("prioritize_backlog", &user_prompt, &self.options).await?;
        parse::prioritization(&text, items)
    }

    async fn analyze_sprint_performance(
        &self,
        snapshot: &SprintSnapshot,
    ) -> Result<SprintPerformance> {
        let user_prompt = prompt::sprint_performance(snapshot)?;
        let text = self
            .ask("analyze_sprint_performance", &user_prompt, &self.options)
            .await?;
        parse::sprint_performance(&text, snapshot.completed_points())
    }

    async fn generate_sprint_report(&self, context: &ReportContext) -> Result<SprintReport> {
        let user_prompt = prompt::sprint_report(context)?;
        let text = self
            .ask("generate_sprint_report", &user_prompt, &self.options)
            .await?;
        parse::sprint_report(&text)
    }

    async fn analyze_feedback(&self, feedback: &[Feedback]) -> Result<FeedbackAnalysis> {
        let user_prompt = prompt::feedback_analysis(feedback)?;
        let text = self.ask("analyze_feedback", &user_prompt, &self.options).await?;
        parse::feedback_analysis(&text)
    }

    async fn break_down_feature(&self, description: &str) -> Result<Vec<String>> {
        let user_prompt = prompt::task_breakdown(description);
        let options = self.options.with_temperature(BREAKDOWN_TEMPERATURE);
        let text = self.ask("break_down_feature", &user_prompt, &options).await?;
        parse::task_list(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;
    use completion_client::ScriptedClient;

    const STORY_REPLY: &str = "## Story Points\n3\n## Risks\n- [low] none major\n\
                               ## Recommendations\n- Validate email format\n\
                               ## Value Score\n7\n## Complexity Score\n3\n";

    fn agent(client: Arc<ScriptedClient>) -> LlmAnalysisAgent {
        LlmAnalysisAgent::new(client, CompletionOptions::default())
    }

    #[tokio::test]
    async fn analyze_story_sends_system_prompt_and_parses() {
        let client = Arc::new(ScriptedClient::fixed(STORY_REPLY));
        let a = agent(client.clone())
            .analyze_story("As a user I can reset my password", &StoryContext::default())
            .await
            .unwrap();
        assert_eq!(a.story_points, 3);
        assert_eq!(a.recommendations, vec!["Validate email format"]);

        let reqs = client.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].system_prompt, SYSTEM_PROMPT);
        assert!(reqs[0].user_prompt.contains("reset my password"));
        assert_eq!(reqs[0].options.max_tokens, 2000);
    }

    #[tokio::test]
    async fn completion_failure_propagates() {
        let client = Arc::new(ScriptedClient::failing(429, "slow down"));
        let err = agent(client)
            .analyze_story("story", &StoryContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Completion);
    }

    #[tokio::test]
    async fn malformed_completion_is_parse_error() {
        let client = Arc::new(ScriptedClient::fixed("I think it is fine."));
        let err = agent(client)
            .analyze_story("story", &StoryContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[tokio::test]
    async fn empty_backlog_skips_completion() {
        let client = Arc::new(ScriptedClient::new());
        let day = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
        let ctx = PlanningContext {
            sprint_name: "S".into(),
            goal: "g".into(),
            start_date: day,
            end_date: day,
            capacity_points: None,
        };
        let p = agent(client.clone()).prioritize_backlog(&[], &ctx).await.unwrap();
        assert!(p.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn breakdown_uses_lower_temperature() {
        let client = Arc::new(ScriptedClient::fixed("- Create table\n- Write endpoint\n"));
        let tasks = agent(client.clone())
            .break_down_feature("Password reset")
            .await
            .unwrap();
        assert_eq!(tasks, vec!["Create table", "Write endpoint"]);
        assert_eq!(client.requests()[0].options.temperature, BREAKDOWN_TEMPERATURE);
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use completion_client::{CompletionOptions, ScriptedClient};

use super::*;
use crate::analysis::{
    FeedbackAnalysis, LlmAnalysisAgent, Prioritization, RankedItem, SprintReport,
    StoryAnalysis, VelocityTrend,
};
use crate::error::ErrorKind;

// ─── CountingAgent ────────────────────────────────────────────────────────

/// Canned results and a call counter per operation.
#[derive(Default)]
struct CountingAgent {
    stories: AtomicUsize,
    prioritizations: AtomicUsize,
    performances: AtomicUsize,
    reports: AtomicUsize,
    feedback: AtomicUsize,
    breakdowns: AtomicUsize,
    last_snapshot: Mutex<Option<SprintSnapshot>>,
}

impl CountingAgent {
    fn performance_calls(&self) -> usize {
        self.performances.load(Ordering::SeqCst)
    }

    fn total_calls(&self) -> usize {
        [
            &self.stories,
            &self.prioritizations,
            &self.performances,
            &self.reports,
            &self.feedback,
            &self.breakdowns,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

#[async_trait]
impl AnalysisAgent for CountingAgent {
    fn name(&self) -> &str {
        "counting"
    }

    async fn analyze_story(&self, _: &str, _: &StoryContext) -> Result<StoryAnalysis> {
        self.stories.fetch_add(1, Ordering::SeqCst);
        Ok(StoryAnalysis {
            story_points: 5,
            risks: vec![],
            recommendations: vec!["Given valid credentials, the user is logged in".into()],
            value_score: 8,
            complexity_score: 4,
            raw: String::new(),
        })
    }

    async fn prioritize_backlog(
        &self,
        items: &[BacklogItem],
        _: &PlanningContext,
    ) -> Result<Prioritization> {
        self.prioritizations.fetch_add(1, Ordering::SeqCst);
        Ok(Prioritization {
            ordered: items
                .iter()
                .enumerate()
                .map(|(i, item)| RankedItem {
                    item_id: item.id,
                    rank: i + 1,
                    justification: None,
                })
                .collect(),
            raw: String::new(),
        })
    }

    async fn analyze_sprint_performance(
        &self,
        snapshot: &SprintSnapshot,
    ) -> Result<SprintPerformance> {
        self.performances.fetch_add(1, Ordering::SeqCst);
        *self.last_snapshot.lock().unwrap() = Some(snapshot.clone());
        Ok(SprintPerformance {
            velocity: 0.0,
            velocity_trend: VelocityTrend::Stable,
            quality_metrics: vec![],
            risk_assessment: vec!["none".into()],
            recommendations: vec!["keep going".into()],
            raw: String::new(),
        })
    }

    async fn generate_sprint_report(&self, _: &ReportContext) -> Result<SprintReport> {
        self.reports.fetch_add(1, Ordering::SeqCst);
        Ok(SprintReport {
            executive_summary: "Good sprint.".into(),
            detailed_analysis: "All done.".into(),
            recommendations: vec!["more of the same".into()],
            next_steps: vec!["plan next sprint".into()],
            raw: String::new(),
        })
    }

    async fn analyze_feedback(&self, _: &[Feedback]) -> Result<FeedbackAnalysis> {
        self.feedback.fetch_add(1, Ordering::SeqCst);
        Ok(FeedbackAnalysis {
            patterns: vec!["login friction".into()],
            impact_assessment: vec!["churn".into()],
            action_items: vec!["add SSO".into()],
            risk_assessment: vec!["scope creep".into()],
            raw: String::new(),
        })
    }

    async fn break_down_feature(&self, _: &str) -> Result<Vec<String>> {
        self.breakdowns.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["schema".into(), "endpoint".into()])
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────

fn setup() -> (ProductOwner, Arc<CountingAgent>) {
    let agent = Arc::new(CountingAgent::default());
    let po = ProductOwner::new(Repositories::in_memory(), agent.clone());
    (po, agent)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
}

fn new_sprint(name: &str) -> NewSprint {
    NewSprint {
        name: name.into(),
        goal: "Ship authentication".into(),
        start_date: day(1),
        end_date: day(14),
        capacity_points: None,
    }
}

async fn sprint_with_story(po: &ProductOwner) -> (Sprint, UserStory) {
    let sprint = po.prioritize_and_plan_sprint(new_sprint("Sprint 1")).await.unwrap().sprint;
    let mut input = NewStory::new("Login", "As a user I can log in");
    input.sprint_id = Some(sprint.id);
    let story = po.create_and_analyze_story(input).await.unwrap().story;
    (sprint, story)
}

async fn seed_backlog(po: &ProductOwner) {
    let mut auth = BacklogItem::new("User Authentication", "Implement user authentication");
    auth.business_value = Some(8);
    auth.complexity = Some(7);
    let mut reset = BacklogItem::new("Password Reset", "Implement password reset");
    reset.business_value = Some(6);
    reset.complexity = Some(5);
    po.repositories().backlog.create(auth).await.unwrap();
    po.repositories().backlog.create(reset).await.unwrap();
}

// ─── Stories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn created_story_is_draft_with_fresh_identity() {
    let (po, _) = setup();
    let a = po
        .create_and_analyze_story(NewStory::new("Login", "As a user I can log in"))
        .await
        .unwrap();
    assert_eq!(a.story.status, StoryStatus::Draft);
    assert_eq!(a.story.id, 1);
    assert_eq!(a.story.story_points, 5);

    po.repositories().stories.delete(a.story.id).await.unwrap();
    let b = po
        .create_and_analyze_story(NewStory::new("Logout", "As a user I can log out"))
        .await
        .unwrap();
    assert_eq!(b.story.status, StoryStatus::Draft);
    assert_eq!(b.story.id, 2);
}

#[tokio::test]
async fn acceptance_criteria_come_from_analysis_unless_supplied() {
    let (po, _) = setup();
    let derived = po
        .create_and_analyze_story(NewStory::new("Login", "As a user I can log in"))
        .await
        .unwrap();
    assert_eq!(derived.story.acceptance_criteria, derived.analysis.recommendations);

    let mut input = NewStory::new("Logout", "As a user I can log out");
    input.acceptance_criteria = vec!["Session cookie is cleared".into()];
    let supplied = po.create_and_analyze_story(input).await.unwrap();
    assert_eq!(supplied.story.acceptance_criteria, vec!["Session cookie is cleared"]);
}

#[tokio::test]
async fn invalid_story_input_is_rejected_before_analysis() {
    let (po, agent) = setup();
    let err = po
        .create_and_analyze_story(NewStory::new("", "description"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(agent.total_calls(), 0);
}

#[tokio::test]
async fn story_for_unknown_sprint_is_not_found() {
    let (po, agent) = setup();
    let mut input = NewStory::new("Login", "As a user I can log in");
    input.sprint_id = Some(42);
    let err = po.create_and_analyze_story(input).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(agent.total_calls(), 0);
}

#[tokio::test]
async fn parse_failure_surfaces_and_persists_nothing() {
    let client = Arc::new(ScriptedClient::fixed("Sounds like a solid story!"));
    let agent = Arc::new(LlmAnalysisAgent::new(client, CompletionOptions::default()));
    let po = ProductOwner::new(Repositories::in_memory(), agent);

    let err = po
        .create_and_analyze_story(NewStory::new("Login", "As a user I can log in"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(po.repositories().stories.get_all(0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn completion_failure_surfaces() {
    let client = Arc::new(ScriptedClient::failing(500, "upstream down"));
    let agent = Arc::new(LlmAnalysisAgent::new(client, CompletionOptions::default()));
    let po = ProductOwner::new(Repositories::in_memory(), agent);

    let err = po
        .create_and_analyze_story(NewStory::new("Login", "As a user I can log in"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Completion);
    assert!(!err.is_client_error());
}

// ─── Status transitions ───────────────────────────────────────────────────

#[tokio::test]
async fn done_with_sprint_analyzes_exactly_once() {
    let (po, agent) = setup();
    let (sprint, story) = sprint_with_story(&po).await;

    po.update_story_status(story.id, StoryStatus::InProgress).await.unwrap();
    assert_eq!(agent.performance_calls(), 0);

    let done = po.update_story_status(story.id, StoryStatus::Done).await.unwrap();
    assert_eq!(done.status, StoryStatus::Done);
    assert_eq!(agent.performance_calls(), 1);

    let snapshot = agent.last_snapshot.lock().unwrap().clone().unwrap();
    assert_eq!(snapshot.sprint.id, sprint.id);
    assert_eq!(snapshot.stories.len(), 1);
    assert!(snapshot.stories[0].is_done());

    let stored = po.repositories().sprints.get_by_id(sprint.id).await.unwrap().unwrap();
    assert_eq!(stored.velocity, 5.0);
}

#[tokio::test]
async fn done_without_sprint_skips_analysis() {
    let (po, agent) = setup();
    let story = po
        .create_and_analyze_story(NewStory::new("Login", "As a user I can log in"))
        .await
        .unwrap()
        .story;
    po.update_story_status(story.id, StoryStatus::InProgress).await.unwrap();
    po.update_story_status(story.id, StoryStatus::Done).await.unwrap();
    assert_eq!(agent.performance_calls(), 0);
}

#[tokio::test]
async fn unknown_story_is_not_found_without_mutation() {
    let (po, agent) = setup();
    let (sprint, story) = sprint_with_story(&po).await;
    let calls_before = agent.total_calls();

    let err = po.update_story_status(999, StoryStatus::Done).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.is_client_error());

    let stories = po.repositories().stories.get_all(0, 10).await.unwrap();
    assert_eq!(stories, vec![story]);
    let stored = po.repositories().sprints.get_by_id(sprint.id).await.unwrap().unwrap();
    assert_eq!(stored, sprint);
    assert_eq!(agent.total_calls(), calls_before);
}

#[tokio::test]
async fn transitions_are_linear() {
    let (po, _) = setup();
    let story = po
        .create_and_analyze_story(NewStory::new("Login", "As a user I can log in"))
        .await
        .unwrap()
        .story;

    let skip = po.update_story_status(story.id, StoryStatus::Done).await.unwrap_err();
    assert!(matches!(skip, PoError::InvalidTransition { .. }));
    assert_eq!(skip.kind(), ErrorKind::Validation);

    let same = po.update_story_status(story.id, StoryStatus::Draft).await.unwrap_err();
    assert!(matches!(same, PoError::InvalidTransition { .. }));

    let stored = po.repositories().stories.get_by_id(story.id).await.unwrap().unwrap();
    assert_eq!(stored.status, StoryStatus::Draft);
    assert_eq!(stored.updated_at, story.updated_at);
}

#[tokio::test]
async fn failed_done_analysis_keeps_story_in_progress_and_retry_succeeds() {
    const STORY: &str = "## Story Points\n5\n## Risks\n- [high] token expiry\n\
        ## Recommendations\n- Login succeeds with valid credentials\n\
        ## Value Score\n8\n## Complexity Score\n4\n";
    const PERFORMANCE: &str = "## Velocity Trend\nstable\n## Quality Metrics\n- defects: 0\n\
        ## Risk Assessment\n- none\n## Recommendations\n- keep going\n";
    let client = Arc::new(
        ScriptedClient::new()
            .then(STORY)
            .then_fail(503, "overloaded")
            .then(PERFORMANCE),
    );
    let agent = Arc::new(LlmAnalysisAgent::new(client.clone(), CompletionOptions::default()));
    let po = ProductOwner::new(Repositories::in_memory(), agent);
    let (sprint, story) = sprint_with_story(&po).await;
    po.update_story_status(story.id, StoryStatus::InProgress).await.unwrap();

    let err = po.update_story_status(story.id, StoryStatus::Done).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Completion);
    let stored = po.repositories().stories.get_by_id(story.id).await.unwrap().unwrap();
    assert_eq!(stored.status, StoryStatus::InProgress);
    let stored = po.repositories().sprints.get_by_id(sprint.id).await.unwrap().unwrap();
    assert_eq!(stored.velocity, 0.0);

    let done = po.update_story_status(story.id, StoryStatus::Done).await.unwrap();
    assert_eq!(done.status, StoryStatus::Done);
    let stored = po.repositories().sprints.get_by_id(sprint.id).await.unwrap().unwrap();
    assert_eq!(stored.velocity, 5.0);
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn assign_story_to_sprint_checks_both_sides() {
    let (po, _) = setup();
    let sprint = po.prioritize_and_plan_sprint(new_sprint("S1")).await.unwrap().sprint;
    let story = po
        .create_and_analyze_story(NewStory::new("Login", "As a user I can log in"))
        .await
        .unwrap()
        .story;

    let assigned = po.assign_story_to_sprint(story.id, sprint.id).await.unwrap();
    assert_eq!(assigned.sprint_id, Some(sprint.id));
    assert_eq!(
        po.assign_story_to_sprint(story.id, 77).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn break_down_story_returns_tasks() {
    let (po, agent) = setup();
    let story = po
        .create_and_analyze_story(NewStory::new("Login", "As a user I can log in"))
        .await
        .unwrap()
        .story;
    let breakdown = po.break_down_story(story.id).await.unwrap();
    assert_eq!(breakdown.tasks, vec!["schema", "endpoint"]);
    assert_eq!(agent.breakdowns.load(Ordering::SeqCst), 1);
    assert!(po.break_down_story(404).await.is_err());
}

// ─── Sprints ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn planned_sprint_starts_with_zero_velocity() {
    let (po, _) = setup();
    seed_backlog(&po).await;
    let plan = po.prioritize_and_plan_sprint(new_sprint("Sprint 1")).await.unwrap();
    assert_eq!(plan.sprint.velocity, 0.0);
    assert_eq!(plan.sprint.status, crate::types::SprintStatus::Planning);
    assert_eq!(plan.prioritization.len(), 2);

    let stored = po.repositories().sprints.get_by_id(plan.sprint.id).await.unwrap().unwrap();
    assert_eq!(stored.velocity, 0.0);
}

#[tokio::test]
async fn invalid_sprint_input_is_rejected() {
    let (po, agent) = setup();
    let mut input = new_sprint("Sprint 1");
    input.end_date = day(1).pred_opt().unwrap();
    let err = po.prioritize_and_plan_sprint(input).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(agent.total_calls(), 0);
    assert!(po.repositories().sprints.get_all(0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn two_item_backlog_prioritizes_deterministically() {
    const CANNED: &str = "\
## Prioritized Items
1. [2] Password Reset is a quick win with lower complexity.
2. [1] User Authentication carries more value but more risk.
";
    let client = Arc::new(ScriptedClient::fixed(CANNED));
    let agent = Arc::new(LlmAnalysisAgent::new(client.clone(), CompletionOptions::default()));
    let po = ProductOwner::new(Repositories::in_memory(), agent);
    seed_backlog(&po).await;

    let first = po.prioritize_and_plan_sprint(new_sprint("Sprint 1")).await.unwrap();
    let second = po.prioritize_and_plan_sprint(new_sprint("Sprint 2")).await.unwrap();

    assert_eq!(first.prioritization.len(), 2);
    assert_eq!(first.prioritization.item_ids(), vec![2, 1]);
    assert_eq!(first.prioritization.item_ids(), second.prioritization.item_ids());
    assert_eq!(first.sprint.velocity, 0.0);
    assert_eq!(client.calls(), 2);
    assert!(client.requests()[0].user_prompt.contains("Password Reset"));
}

#[tokio::test]
async fn unknown_sprint_analysis_is_not_found() {
    let (po, agent) = setup();
    let err = po.analyze_sprint_performance(999).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "sprint not found: 999");
    assert_eq!(agent.performance_calls(), 0);
}

#[tokio::test]
async fn snapshot_carries_previous_velocities() {
    let (po, agent) = setup();
    let (first, story) = sprint_with_story(&po).await;
    po.update_story_status(story.id, StoryStatus::InProgress).await.unwrap();
    po.update_story_status(story.id, StoryStatus::Done).await.unwrap();

    let second = po.prioritize_and_plan_sprint(new_sprint("Sprint 2")).await.unwrap().sprint;
    assert!(second.id > first.id);
    po.analyze_sprint_performance(second.id).await.unwrap();

    let snapshot = agent.last_snapshot.lock().unwrap().clone().unwrap();
    assert_eq!(snapshot.sprint.id, second.id);
    assert_eq!(snapshot.previous_velocities, vec![5.0]);
    assert!(snapshot.stories.is_empty());
}

#[tokio::test]
async fn comprehensive_report_combines_everything() {
    let (po, agent) = setup();
    let (sprint, _) = sprint_with_story(&po).await;
    let ada = po
        .repositories()
        .stakeholders
        .create(Stakeholder::new("Ada", "CTO", "ada@example.com"))
        .await
        .unwrap();
    po.repositories()
        .feedback
        .create(Feedback::new(ada.id, "Login is slow"))
        .await
        .unwrap();

    let report = po.generate_comprehensive_report(sprint.id).await.unwrap();
    assert_eq!(report.sprint.id, sprint.id);
    assert_eq!(report.stakeholders.len(), 1);
    assert_eq!(report.feedback.len(), 1);
    assert!(report.feedback_analysis.is_some());
    assert_eq!(report.report.next_steps, vec!["plan next sprint"]);
    assert_eq!(agent.performance_calls(), 1);
    assert_eq!(agent.reports.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn comprehensive_report_without_feedback_skips_feedback_analysis() {
    let (po, agent) = setup();
    let (sprint, _) = sprint_with_story(&po).await;
    let report = po.generate_comprehensive_report(sprint.id).await.unwrap();
    assert!(report.feedback_analysis.is_none());
    assert_eq!(agent.feedback.load(Ordering::SeqCst), 0);
    assert!(po.generate_comprehensive_report(999).await.is_err());
}

// ─── Feedback ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn stakeholder_feedback_review() {
    let (po, _) = setup();
    assert_eq!(
        po.analyze_stakeholder_feedback().await.unwrap_err().kind(),
        ErrorKind::Validation
    );

    let bob = po
        .repositories()
        .stakeholders
        .create(Stakeholder::new("Bob", "Sales", "bob@example.com"))
        .await
        .unwrap();
    for text in ["Need SSO", "Export to CSV"] {
        po.repositories()
            .feedback
            .create(Feedback::new(bob.id, text))
            .await
            .unwrap();
    }
    let review = po.analyze_stakeholder_feedback().await.unwrap();
    assert_eq!(review.feedback_count, 2);
    assert_eq!(review.stakeholders[0].name, "Bob");
    assert_eq!(review.analysis.action_items, vec!["add SSO"]);
}

//! Prompt text. Every prompt ends with the exact response layout the
//! matching parser in [`super::parse`] expects.

use serde::Serialize;

use super::{PlanningContext, ReportContext, SprintSnapshot, StoryContext};
use crate::entity::{BacklogItem, Feedback};
use crate::error::Result;

pub const SYSTEM_PROMPT: &str = "You are an expert Product Owner with extensive experience in \
agile and scrum, product management, team leadership, stakeholder management, technical \
project management, risk assessment and performance analysis. Your responses are \
professional, data-driven and actionable, and always follow the requested markdown layout \
exactly.";

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn story_analysis(description: &str, context: &StoryContext) -> Result<String> {
    Ok(format!(
        "Analyze the following user story and assess its clarity, technical complexity, \
business value and risks.

User story:
{description}

Context:
{context}

Respond with exactly these markdown sections:

## Story Points
A single integer estimate between 1 and 100.

## Risks
One bullet per risk, each starting with a severity tag: `- [high] ...`, `- [medium] ...` or `- [low] ...`.

## Recommendations
One bullet per recommendation. Phrase each as a testable acceptance criterion where possible.

## Value Score
A single integer from 1 (low) to 10 (high) for business value.

## Complexity Score
A single integer from 1 (trivial) to 10 (very complex) for technical complexity.
",
        context = json(context)?,
    ))
}

#[derive(Serialize)]
struct PromptItem<'a> {
    id: u64,
    title: &'a str,
    description: &'a str,
    priority: crate::types::Priority,
    story_points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    business_value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    complexity: Option<u8>,
}

pub fn prioritization(items: &[BacklogItem], context: &PlanningContext) -> Result<String> {
    let items: Vec<PromptItem<'_>> = items
        .iter()
        .map(|i| PromptItem {
            id: i.id,
            title: &i.title,
            description: &i.description,
            priority: i.priority,
            story_points: i.story_points,
            business_value: i.business_value,
            complexity: i.complexity,
        })
        .collect();
    Ok(format!(
        "Prioritize the following backlog items for the upcoming sprint. Weigh business value, \
implementation complexity, dependencies, risk and team capacity.

Backlog items:
{items}

Sprint:
{context}

Respond with exactly this markdown section:

## Prioritized Items
A numbered list, highest priority first. Each line is the item id in square brackets \
followed by a one-sentence justification, for example:
1. [12] Unblocks every other authentication story.
Rank every item exactly once and use only the ids listed above.
",
        items = json(&items)?,
        context = json(context)?,
    ))
}

pub fn sprint_performance(snapshot: &SprintSnapshot) -> Result<String> {
    Ok(format!(
        "Analyze the performance of the following sprint: velocity, story completion, \
quality and risks.

Sprint data:
{sprint}

Completed story points: {done}
Planned story points: {planned}
Velocity of previous sprints (oldest first): {previous:?}

Respond with exactly these markdown sections:

## Velocity Trend
One word: improving, stable or declining.

## Quality Metrics
One bullet per metric in the form `- name: value`.

## Risk Assessment
One bullet per risk.

## Recommendations
One bullet per recommendation.
",
        sprint = json(snapshot)?,
        done = snapshot.completed_points(),
        planned = snapshot.planned_points(),
        previous = snapshot.previous_velocities,
    ))
}

pub fn sprint_report(context: &ReportContext) -> Result<String> {
    Ok(format!(
        "Write a sprint report for stakeholders from the following data: the sprint, its \
stories, the performance analysis, stakeholders and their feedback.

Report data:
{data}

Respond with exactly these markdown sections:

## Executive Summary
A short paragraph with key achievements, major challenges and critical metrics.

## Detailed Analysis
Prose covering story completion, quality, team performance and process effectiveness.

## Recommendations
One bullet per recommendation.

## Next Steps
One bullet per action item.
",
        data = json(context)?,
    ))
}

pub fn feedback_analysis(feedback: &[Feedback]) -> Result<String> {
    Ok(format!(
        "Analyze the following stakeholder feedback and identify recurring themes, their \
impact on the product and what to do about them.

Feedback:
{feedback}

Respond with exactly these markdown sections:

## Patterns
One bullet per recurring theme.

## Impact Assessment
One bullet per impact on users or the business.

## Action Items
One bullet per concrete action.

## Risk Assessment
One bullet per risk of acting or not acting.
",
        feedback = json(feedback)?,
    ))
}

pub fn task_breakdown(description: &str) -> String {
    format!(
        "Break down the following feature into technical tasks. Respond only with a markdown \
list, one task per line.

Feature:
{description}
"
    )
}

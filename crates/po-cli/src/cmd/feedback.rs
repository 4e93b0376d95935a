use crate::context::{block_on, AppContext};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use po_core::entity::{EntityId, Feedback, Stakeholder};
use po_core::repository::{collect_all, feedback_for_stakeholder, require};
use po_core::types::{FeedbackStatus, FeedbackType, Priority};
use std::path::Path;

#[derive(Subcommand)]
pub enum FeedbackSubcommand {
    /// Record feedback from a stakeholder
    Add {
        /// Stakeholder who gave the feedback
        stakeholder: EntityId,
        #[arg(required = true)]
        content: Vec<String>,
        /// feature_request, bug, improvement or general
        #[arg(long = "type", value_name = "TYPE", default_value = "general")]
        feedback_type: FeedbackType,
        #[arg(long, default_value = "medium")]
        priority: Priority,
    },
    /// List recorded feedback
    List {
        /// Only feedback from this stakeholder
        #[arg(long)]
        stakeholder: Option<EntityId>,
    },
    /// Mark feedback as open, reviewed or resolved
    Status { id: EntityId, status: FeedbackStatus },
    /// Find patterns and action items across all feedback
    Analyze,
}

pub fn run(config: Option<&Path>, subcmd: FeedbackSubcommand, json: bool) -> anyhow::Result<()> {
    let ctx = AppContext::load(config)?;
    match subcmd {
        FeedbackSubcommand::Add {
            stakeholder,
            content,
            feedback_type,
            priority,
        } => {
            let mut feedback = Feedback::new(stakeholder, content.join(" "));
            feedback.feedback_type = feedback_type;
            feedback.priority = priority;
            add(&ctx, feedback, json)
        }
        FeedbackSubcommand::List { stakeholder } => list(&ctx, stakeholder, json),
        FeedbackSubcommand::Status { id, status } => set_status(&ctx, id, status, json),
        FeedbackSubcommand::Analyze => analyze(&ctx, json),
    }
}

fn add(ctx: &AppContext, feedback: Feedback, json: bool) -> anyhow::Result<()> {
    let feedback = block_on(async {
        require::<Stakeholder, _>(ctx.repos.stakeholders.as_ref(), feedback.stakeholder_id)
            .await?;
        ctx.repos.feedback.create(feedback).await
    })??;
    if json {
        return print_json(&feedback);
    }
    println!(
        "Recorded feedback {} from stakeholder {}",
        feedback.id, feedback.stakeholder_id
    );
    Ok(())
}

fn list(ctx: &AppContext, stakeholder: Option<EntityId>, json: bool) -> anyhow::Result<()> {
    let repo = ctx.repos.feedback.as_ref();
    let feedback = match stakeholder {
        Some(id) => block_on(feedback_for_stakeholder(repo, id))??,
        None => block_on(collect_all::<Feedback, _>(repo))??,
    };
    if json {
        return print_json(&feedback);
    }
    if feedback.is_empty() {
        println!("No feedback.");
        return Ok(());
    }
    let rows = feedback
        .iter()
        .map(|f| {
            vec![
                f.id.to_string(),
                f.stakeholder_id.to_string(),
                f.feedback_type.to_string(),
                f.priority.to_string(),
                f.status.to_string(),
                f.content.clone(),
            ]
        })
        .collect();
    print_table(
        &["ID", "STAKEHOLDER", "TYPE", "PRIORITY", "STATUS", "CONTENT"],
        rows,
    );
    Ok(())
}

fn set_status(
    ctx: &AppContext,
    id: EntityId,
    status: FeedbackStatus,
    json: bool,
) -> anyhow::Result<()> {
    let feedback = block_on(async {
        let mut feedback = require::<Feedback, _>(ctx.repos.feedback.as_ref(), id).await?;
        feedback.status = status;
        feedback.updated_at = chrono::Utc::now();
        ctx.repos.feedback.update(feedback).await
    })??;
    if json {
        return print_json(&feedback);
    }
    println!("Feedback {} is now {}", feedback.id, feedback.status);
    Ok(())
}

fn analyze(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let po = ctx.product_owner()?;
    let review = block_on(po.analyze_stakeholder_feedback())??;
    if json {
        return print_json(&review);
    }
    println!(
        "{} feedback item(s) from {} stakeholder(s)",
        review.feedback_count,
        review.stakeholders.len()
    );
    let sections = [
        ("Patterns", &review.analysis.patterns),
        ("Impact", &review.analysis.impact_assessment),
        ("Action items", &review.analysis.action_items),
        ("Risks", &review.analysis.risk_assessment),
    ];
    for (heading, items) in sections {
        if items.is_empty() {
            continue;
        }
        println!("{heading}:");
        for item in items {
            println!("  - {item}");
        }
    }
    Ok(())
}

use crate::context::{block_on, AppContext};
use crate::output::{print_json, print_table};
use chrono::NaiveDate;
use clap::Subcommand;
use po_core::analysis::SprintPerformance;
use po_core::entity::{EntityId, Sprint};
use po_core::orchestrator::NewSprint;
use po_core::repository::{active_sprint, collect_all, require};
use po_core::types::SprintStatus;
use std::path::Path;

#[derive(Subcommand)]
pub enum SprintSubcommand {
    /// Prioritize the backlog and create a new sprint
    Plan {
        #[arg(required = true)]
        name: Vec<String>,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value = "")]
        goal: String,
        /// Story points the team can take on
        #[arg(long)]
        capacity: Option<u32>,
    },
    /// List sprints
    List,
    /// Show the ACTIVE sprint
    Active,
    /// Set a sprint's status: planning, active or completed
    Status { id: EntityId, status: SprintStatus },
    /// Analyze a sprint's performance and record its velocity
    Analyze { id: EntityId },
    /// Full sprint report with stakeholder feedback
    Report { id: EntityId },
}

pub fn run(config: Option<&Path>, subcmd: SprintSubcommand, json: bool) -> anyhow::Result<()> {
    let ctx = AppContext::load(config)?;
    match subcmd {
        SprintSubcommand::Plan {
            name,
            start,
            end,
            goal,
            capacity,
        } => {
            let input = NewSprint {
                name: name.join(" "),
                goal,
                start_date: start,
                end_date: end,
                capacity_points: capacity,
            };
            plan(&ctx, input, json)
        }
        SprintSubcommand::List => list(&ctx, json),
        SprintSubcommand::Active => active(&ctx, json),
        SprintSubcommand::Status { id, status } => set_status(&ctx, id, status, json),
        SprintSubcommand::Analyze { id } => analyze(&ctx, id, json),
        SprintSubcommand::Report { id } => report(&ctx, id, json),
    }
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

fn plan(ctx: &AppContext, input: NewSprint, json: bool) -> anyhow::Result<()> {
    let po = ctx.product_owner()?;
    let plan = block_on(po.prioritize_and_plan_sprint(input))??;
    if json {
        return print_json(&plan);
    }

    let sprint = &plan.sprint;
    println!(
        "Created sprint {} '{}' ({} to {})",
        sprint.id, sprint.name, sprint.start_date, sprint.end_date
    );
    if plan.prioritization.is_empty() {
        println!("Backlog is empty; nothing to prioritize.");
        return Ok(());
    }
    let rows = plan
        .prioritization
        .ordered
        .iter()
        .map(|r| {
            vec![
                r.rank.to_string(),
                r.item_id.to_string(),
                r.justification.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["RANK", "ITEM", "JUSTIFICATION"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// list / active / status
// ---------------------------------------------------------------------------

fn list(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let sprints = block_on(collect_all::<Sprint, _>(ctx.repos.sprints.as_ref()))??;
    if json {
        return print_json(&sprints);
    }
    if sprints.is_empty() {
        println!("No sprints.");
        return Ok(());
    }
    let rows = sprints
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.status.to_string(),
                s.start_date.to_string(),
                s.end_date.to_string(),
                format!("{:.1}", s.velocity),
                s.name.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "START", "END", "VELOCITY", "NAME"], rows);
    Ok(())
}

fn active(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let sprint = block_on(active_sprint(ctx.repos.sprints.as_ref()))??;
    if json {
        return print_json(&sprint);
    }
    match sprint {
        Some(s) => println!("Sprint {} '{}' ({} to {})", s.id, s.name, s.start_date, s.end_date),
        None => println!("No active sprint."),
    }
    Ok(())
}

fn set_status(
    ctx: &AppContext,
    id: EntityId,
    status: SprintStatus,
    json: bool,
) -> anyhow::Result<()> {
    let sprint = block_on(async {
        let mut sprint = require::<Sprint, _>(ctx.repos.sprints.as_ref(), id).await?;
        sprint.status = status;
        sprint.updated_at = chrono::Utc::now();
        ctx.repos.sprints.update(sprint).await
    })??;
    if json {
        return print_json(&sprint);
    }
    println!("Sprint {} is now {}", sprint.id, sprint.status);
    Ok(())
}

// ---------------------------------------------------------------------------
// analyze / report
// ---------------------------------------------------------------------------

fn analyze(ctx: &AppContext, id: EntityId, json: bool) -> anyhow::Result<()> {
    let po = ctx.product_owner()?;
    let performance = block_on(po.analyze_sprint_performance(id))??;
    if json {
        return print_json(&performance);
    }
    print_performance(id, &performance);
    Ok(())
}

fn print_performance(id: EntityId, performance: &SprintPerformance) {
    println!("Sprint {id}");
    println!("Velocity: {:.1}", performance.velocity);
    println!("Trend:    {}", performance.velocity_trend);
    if !performance.quality_metrics.is_empty() {
        println!("Quality metrics:");
        for m in &performance.quality_metrics {
            println!("  {}: {}", m.name, m.value);
        }
    }
    print_list("Risks", &performance.risk_assessment);
    print_list("Recommendations", &performance.recommendations);
}

fn report(ctx: &AppContext, id: EntityId, json: bool) -> anyhow::Result<()> {
    let po = ctx.product_owner()?;
    let report = block_on(po.generate_comprehensive_report(id))??;
    if json {
        return print_json(&report);
    }

    println!("# {}", report.sprint.name);
    println!();
    println!("{}", report.report.executive_summary);
    println!();
    print_performance(id, &report.performance);
    if !report.report.detailed_analysis.is_empty() {
        println!();
        println!("{}", report.report.detailed_analysis);
    }
    print_list("Next steps", &report.report.next_steps);
    if let Some(fa) = &report.feedback_analysis {
        print_list("Feedback patterns", &fa.patterns);
        print_list("Action items", &fa.action_items);
    }
    println!();
    println!(
        "{} stakeholder(s), {} feedback item(s); generated {}",
        report.stakeholders.len(),
        report.feedback.len(),
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

fn print_list(heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{heading}:");
    for item in items {
        println!("  - {item}");
    }
}

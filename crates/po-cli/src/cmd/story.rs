use crate::context::{block_on, AppContext};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use po_core::entity::{EntityId, UserStory};
use po_core::orchestrator::NewStory;
use po_core::repository::{collect_all, require};
use po_core::types::{Priority, StoryStatus};
use std::path::Path;

#[derive(Subcommand)]
pub enum StorySubcommand {
    /// Analyze a new story and save it as DRAFT with estimated points
    Create {
        #[arg(required = true)]
        title: Vec<String>,
        /// What the story delivers, e.g. "As a user I want..."
        #[arg(long, short)]
        description: String,
        /// low, medium, high or critical
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Acceptance criterion (repeatable); omitted → taken from the analysis
        #[arg(long = "criterion")]
        criteria: Vec<String>,
        /// Sprint to assign the story to
        #[arg(long)]
        sprint: Option<EntityId>,
    },
    /// List stories
    List {
        /// Only stories with this status
        #[arg(long)]
        status: Option<StoryStatus>,
        /// Only stories in this sprint
        #[arg(long)]
        sprint: Option<EntityId>,
    },
    /// Show a single story
    Show { id: EntityId },
    /// Move a story to draft, in_progress or done
    Status { id: EntityId, status: StoryStatus },
    /// Assign a story to a sprint
    Assign { id: EntityId, sprint: EntityId },
    /// Split a story into technical tasks
    Breakdown { id: EntityId },
}

pub fn run(config: Option<&Path>, subcmd: StorySubcommand, json: bool) -> anyhow::Result<()> {
    let ctx = AppContext::load(config)?;
    match subcmd {
        StorySubcommand::Create {
            title,
            description,
            priority,
            criteria,
            sprint,
        } => {
            let input = NewStory {
                title: title.join(" "),
                description,
                priority,
                acceptance_criteria: criteria,
                sprint_id: sprint,
            };
            create(&ctx, input, json)
        }
        StorySubcommand::List { status, sprint } => list(&ctx, status, sprint, json),
        StorySubcommand::Show { id } => show(&ctx, id, json),
        StorySubcommand::Status { id, status } => set_status(&ctx, id, status, json),
        StorySubcommand::Assign { id, sprint } => assign(&ctx, id, sprint, json),
        StorySubcommand::Breakdown { id } => breakdown(&ctx, id, json),
    }
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

fn create(ctx: &AppContext, input: NewStory, json: bool) -> anyhow::Result<()> {
    let po = ctx.product_owner()?;
    let created = block_on(po.create_and_analyze_story(input))??;

    if json {
        return print_json(&created);
    }

    let story = &created.story;
    println!("Created story {} '{}'", story.id, story.title);
    println!("Story points: {}", story.story_points);
    println!(
        "Value: {}/10  Complexity: {}/10",
        created.analysis.value_score, created.analysis.complexity_score
    );
    if !created.analysis.risks.is_empty() {
        println!("Risks:");
        for risk in &created.analysis.risks {
            match risk.severity {
                Some(level) => println!("  [{}] {}", level.as_str(), risk.description),
                None => println!("  {}", risk.description),
            }
        }
    }
    if !story.acceptance_criteria.is_empty() {
        println!("Acceptance criteria:");
        for c in &story.acceptance_criteria {
            println!("  - {c}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

fn list(
    ctx: &AppContext,
    status: Option<StoryStatus>,
    sprint: Option<EntityId>,
    json: bool,
) -> anyhow::Result<()> {
    let stories: Vec<UserStory> =
        block_on(collect_all::<UserStory, _>(ctx.repos.stories.as_ref()))??
            .into_iter()
            .filter(|s| status.map_or(true, |st| s.status == st))
            .filter(|s| sprint.is_none() || s.sprint_id == sprint)
            .collect();

    if json {
        return print_json(&stories);
    }
    if stories.is_empty() {
        println!("No stories.");
        return Ok(());
    }

    let rows = stories
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.status.to_string(),
                s.priority.to_string(),
                s.story_points.to_string(),
                s.sprint_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                s.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "PRIORITY", "POINTS", "SPRINT", "TITLE"], rows);
    Ok(())
}

fn show(ctx: &AppContext, id: EntityId, json: bool) -> anyhow::Result<()> {
    let story = block_on(require::<UserStory, _>(ctx.repos.stories.as_ref(), id))??;
    if json {
        return print_json(&story);
    }
    print_story(&story);
    Ok(())
}

fn print_story(story: &UserStory) {
    println!("Story {}: {}", story.id, story.title);
    println!("Status:   {}", story.status);
    println!("Priority: {}", story.priority);
    println!("Points:   {}", story.story_points);
    if let Some(sprint) = story.sprint_id {
        println!("Sprint:   {sprint}");
    }
    println!();
    println!("{}", story.description);
    if !story.acceptance_criteria.is_empty() {
        println!();
        println!("Acceptance criteria:");
        for c in &story.acceptance_criteria {
            println!("  - {c}");
        }
    }
}

// ---------------------------------------------------------------------------
// status / assign
// ---------------------------------------------------------------------------

fn set_status(
    ctx: &AppContext,
    id: EntityId,
    status: StoryStatus,
    json: bool,
) -> anyhow::Result<()> {
    let po = ctx.product_owner()?;
    let story = block_on(po.update_story_status(id, status))??;

    if json {
        return print_json(&story);
    }
    println!("Story {} is now {}", story.id, story.status);
    Ok(())
}

fn assign(ctx: &AppContext, id: EntityId, sprint: EntityId, json: bool) -> anyhow::Result<()> {
    let po = ctx.product_owner()?;
    let story = block_on(po.assign_story_to_sprint(id, sprint))??;
    if json {
        return print_json(&story);
    }
    println!("Story {} assigned to sprint {}", story.id, sprint);
    Ok(())
}

// ---------------------------------------------------------------------------
// breakdown
// ---------------------------------------------------------------------------

fn breakdown(ctx: &AppContext, id: EntityId, json: bool) -> anyhow::Result<()> {
    let po = ctx.product_owner()?;
    let result = block_on(po.break_down_story(id))??;
    if json {
        return print_json(&result);
    }
    println!("Tasks for story {} '{}':", result.story.id, result.story.title);
    for (i, task) in result.tasks.iter().enumerate() {
        println!("  {}. {task}", i + 1);
    }
    Ok(())
}

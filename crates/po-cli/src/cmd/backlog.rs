use crate::context::{block_on, AppContext};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use po_core::entity::{BacklogItem, EntityId, Sprint};
use po_core::repository::{collect_all, require};
use po_core::types::{BacklogStatus, Priority};
use std::path::Path;

#[derive(Subcommand)]
pub enum BacklogSubcommand {
    /// Add an item to the backlog
    Add {
        #[arg(required = true)]
        title: Vec<String>,
        #[arg(long, short, default_value = "")]
        description: String,
        /// low, medium, high or critical
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long, default_value_t = 0)]
        points: u32,
        /// Business value, 1-10
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        value: Option<u8>,
        /// Technical complexity, 1-10
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        complexity: Option<u8>,
    },
    /// List backlog items in insertion order
    List {
        /// Only items with this status
        #[arg(long)]
        status: Option<BacklogStatus>,
    },
    /// Change fields of an existing backlog item
    Update {
        id: EntityId,
        /// new, ready, in_sprint or done
        #[arg(long)]
        status: Option<BacklogStatus>,
        /// Sprint the item is scheduled into
        #[arg(long, conflicts_with = "unassign")]
        sprint: Option<EntityId>,
        /// Take the item out of its sprint
        #[arg(long)]
        unassign: bool,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        points: Option<u32>,
        /// Business value, 1-10
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        value: Option<u8>,
        /// Technical complexity, 1-10
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        complexity: Option<u8>,
    },
    /// Remove an item from the backlog
    Remove { id: EntityId },
}

/// Field changes for `backlog update`; `None` leaves a field as it is.
#[derive(Default)]
struct ItemChanges {
    status: Option<BacklogStatus>,
    sprint: Option<Option<EntityId>>,
    priority: Option<Priority>,
    points: Option<u32>,
    value: Option<u8>,
    complexity: Option<u8>,
}

impl ItemChanges {
    fn apply(self, item: &mut BacklogItem) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(sprint) = self.sprint {
            item.sprint_id = sprint;
        }
        if let Some(priority) = self.priority {
            item.priority = priority;
        }
        if let Some(points) = self.points {
            item.story_points = points;
        }
        if let Some(value) = self.value {
            item.business_value = Some(value);
        }
        if let Some(complexity) = self.complexity {
            item.complexity = Some(complexity);
        }
        item.updated_at = chrono::Utc::now();
    }
}

pub fn run(config: Option<&Path>, subcmd: BacklogSubcommand, json: bool) -> anyhow::Result<()> {
    let ctx = AppContext::load(config)?;
    match subcmd {
        BacklogSubcommand::Add {
            title,
            description,
            priority,
            points,
            value,
            complexity,
        } => {
            let mut item = BacklogItem::new(title.join(" "), description);
            item.priority = priority;
            item.story_points = points;
            item.business_value = value;
            item.complexity = complexity;
            add(&ctx, item, json)
        }
        BacklogSubcommand::List { status } => list(&ctx, status, json),
        BacklogSubcommand::Update {
            id,
            status,
            sprint,
            unassign,
            priority,
            points,
            value,
            complexity,
        } => {
            let changes = ItemChanges {
                status,
                sprint: if unassign { Some(None) } else { sprint.map(Some) },
                priority,
                points,
                value,
                complexity,
            };
            update(&ctx, id, changes, json)
        }
        BacklogSubcommand::Remove { id } => remove(&ctx, id, json),
    }
}

fn add(ctx: &AppContext, item: BacklogItem, json: bool) -> anyhow::Result<()> {
    let item = block_on(ctx.repos.backlog.create(item))?.context("failed to add backlog item")?;
    if json {
        return print_json(&item);
    }
    println!("Added backlog item {} '{}'", item.id, item.title);
    Ok(())
}

fn list(ctx: &AppContext, status: Option<BacklogStatus>, json: bool) -> anyhow::Result<()> {
    let items: Vec<BacklogItem> =
        block_on(collect_all::<BacklogItem, _>(ctx.repos.backlog.as_ref()))??
            .into_iter()
            .filter(|i| status.map_or(true, |st| i.status == st))
            .collect();

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("Backlog is empty.");
        return Ok(());
    }

    let score = |v: Option<u8>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
    let rows = items
        .iter()
        .map(|i| {
            vec![
                i.id.to_string(),
                i.status.to_string(),
                i.priority.to_string(),
                i.story_points.to_string(),
                score(i.business_value),
                score(i.complexity),
                i.title.clone(),
            ]
        })
        .collect();
    print_table(
        &["ID", "STATUS", "PRIORITY", "POINTS", "VALUE", "COMPLEXITY", "TITLE"],
        rows,
    );
    Ok(())
}

fn update(ctx: &AppContext, id: EntityId, changes: ItemChanges, json: bool) -> anyhow::Result<()> {
    let item = block_on(async {
        let mut item = require::<BacklogItem, _>(ctx.repos.backlog.as_ref(), id).await?;
        if let Some(Some(sprint_id)) = changes.sprint {
            require::<Sprint, _>(ctx.repos.sprints.as_ref(), sprint_id).await?;
        }
        changes.apply(&mut item);
        ctx.repos.backlog.update(item).await
    })??;
    if json {
        return print_json(&item);
    }
    println!(
        "Updated backlog item {} '{}' ({}, {} points)",
        item.id, item.title, item.status, item.story_points
    );
    Ok(())
}

fn remove(ctx: &AppContext, id: EntityId, json: bool) -> anyhow::Result<()> {
    let removed = block_on(ctx.repos.backlog.delete(id))??;
    if json {
        return print_json(&serde_json::json!({ "id": id, "removed": removed }));
    }
    if removed {
        println!("Removed backlog item {id}");
    } else {
        println!("Backlog item {id} does not exist");
    }
    Ok(())
}

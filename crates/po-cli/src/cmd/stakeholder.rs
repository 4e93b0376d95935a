use crate::context::{block_on, AppContext};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use po_core::entity::Stakeholder;
use po_core::repository::collect_all;
use std::path::Path;

#[derive(Subcommand)]
pub enum StakeholderSubcommand {
    /// Register a stakeholder
    Add {
        name: String,
        #[arg(long)]
        role: String,
        /// Email or other contact detail
        #[arg(long, default_value = "")]
        contact: String,
    },
    /// List stakeholders
    List,
}

pub fn run(
    config: Option<&Path>,
    subcmd: StakeholderSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = AppContext::load(config)?;
    match subcmd {
        StakeholderSubcommand::Add {
            name,
            role,
            contact,
        } => {
            if name.trim().is_empty() {
                anyhow::bail!("stakeholder name is empty");
            }
            let stakeholder =
                block_on(ctx.repos.stakeholders.create(Stakeholder::new(name, role, contact)))??;
            if json {
                return print_json(&stakeholder);
            }
            println!("Added stakeholder {} '{}'", stakeholder.id, stakeholder.name);
            Ok(())
        }
        StakeholderSubcommand::List => {
            let all = block_on(collect_all::<Stakeholder, _>(ctx.repos.stakeholders.as_ref()))??;
            if json {
                return print_json(&all);
            }
            if all.is_empty() {
                println!("No stakeholders.");
                return Ok(());
            }
            let rows = all
                .iter()
                .map(|s| vec![s.id.to_string(), s.name.clone(), s.role.clone(), s.contact.clone()])
                .collect();
            print_table(&["ID", "NAME", "ROLE", "CONTACT"], rows);
            Ok(())
        }
    }
}

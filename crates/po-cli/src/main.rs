mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    backlog::BacklogSubcommand, config::ConfigSubcommand, feedback::FeedbackSubcommand,
    sprint::SprintSubcommand, stakeholder::StakeholderSubcommand, story::StorySubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "po",
    about = "AI product owner: analyze stories, plan sprints, review performance and feedback",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./po.yaml)
    #[arg(long, global = true, env = "PO_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, analyze and move user stories
    Story {
        #[command(subcommand)]
        subcommand: StorySubcommand,
    },

    /// Manage the product backlog
    Backlog {
        #[command(subcommand)]
        subcommand: BacklogSubcommand,
    },

    /// Plan sprints and analyze their performance
    Sprint {
        #[command(subcommand)]
        subcommand: SprintSubcommand,
    },

    /// Manage stakeholders
    Stakeholder {
        #[command(subcommand)]
        subcommand: StakeholderSubcommand,
    },

    /// Record and analyze stakeholder feedback
    Feedback {
        #[command(subcommand)]
        subcommand: FeedbackSubcommand,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Story { subcommand } => cmd::story::run(config, subcommand, cli.json),
        Commands::Backlog { subcommand } => cmd::backlog::run(config, subcommand, cli.json),
        Commands::Sprint { subcommand } => cmd::sprint::run(config, subcommand, cli.json),
        Commands::Stakeholder { subcommand } => {
            cmd::stakeholder::run(config, subcommand, cli.json)
        }
        Commands::Feedback { subcommand } => cmd::feedback::run(config, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

mod cmd;
mod output;
mod root;
mod signals;

use clap::{Parser, Subcommand};
use cmd::{plan::PlanSubcommand, specs::SpecsSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "workhooks",
    about = "Agent hooks for WIP squashing, work-completion gating and living specs",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .git/)
    #[arg(long, global = true, env = "WORKHOOKS_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pre-tool-use hook: squash WIP commits before a push to a protected branch
    PrePush,

    /// Post-tool-use hook: delete recent backup tags after a successful push
    PostPush,

    /// Stop hook: block while the active plan has TODO scenarios
    Stop,

    /// Prompt-submit hook: shrink pasted images over the size limit
    ResizeImages,

    /// Living specification tools
    Specs {
        #[command(subcommand)]
        subcommand: SpecsSubcommand,
    },

    /// Plan file tools
    Plan {
        #[command(subcommand)]
        subcommand: PlanSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if debug_requested() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    // Hooks answer on stdout; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::PrePush => cmd::pre_push::run(&root),
        Commands::PostPush => cmd::post_push::run(&root),
        Commands::Stop => cmd::stop::run(),
        Commands::ResizeImages => cmd::resize_images::run(&root),
        Commands::Specs { subcommand } => cmd::specs::run(&root, subcommand, cli.json),
        Commands::Plan { subcommand } => cmd::plan::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn debug_requested() -> bool {
    std::env::var("CLAUDE_DEBUG").is_ok_and(|v| v.eq_ignore_ascii_case("true"))
}

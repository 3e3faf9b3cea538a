use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use std::path::{Path, PathBuf};
use workhooks_core::plan::{self, Completion, PlanCategory, PlanMetadata};

#[derive(Subcommand)]
pub enum PlanSubcommand {
    /// Summarize a plan for review: metadata, progress and system categories
    Review {
        /// Plan markdown file
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct Review {
    file: String,
    #[serde(flatten)]
    metadata: PlanMetadata,
    completion: u32,
    categories: Vec<PlanCategory>,
}

pub fn run(root: &Path, subcmd: PlanSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PlanSubcommand::Review { file } => review(root, &file, json),
    }
}

fn review(root: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let path = if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    };
    let content = plan::load_plan(&path).context("failed to load plan")?;
    let metadata = plan::extract_metadata(&content);
    let completion = Completion {
        todo_count: metadata.todo_count,
        done_count: metadata.done_count,
    };
    let review = Review {
        file: path.display().to_string(),
        completion: completion.percentage(),
        categories: plan::detect_plan_context(&content),
        metadata,
    };

    if json {
        return print_json(&review);
    }
    println!("Plan:     {}", review.file);
    println!(
        "Goal:     {}",
        review.metadata.goal.as_deref().unwrap_or("(none)")
    );
    if let Some(created) = &review.metadata.created {
        println!("Created:  {created}");
    }
    println!(
        "Progress: {}/{} scenarios done ({}%)",
        completion.done_count,
        completion.total(),
        review.completion
    );
    let categories: Vec<String> = review
        .categories
        .iter()
        .map(|c| serde_json::to_value(c).map(|v| v.as_str().unwrap_or_default().to_string()))
        .collect::<Result<_, _>>()?;
    println!(
        "Context:  {}",
        if categories.is_empty() {
            "(none detected)".to_string()
        } else {
            categories.join(", ")
        }
    );
    Ok(())
}

use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use workhooks_core::gherkin::{self, docs, feature, migrate, similarity, DocFormat, SpecAction};
use workhooks_core::paths;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum SpecsSubcommand {
    /// List every scenario in specs/
    List,

    /// Find scenarios whose name resembles a query
    Similar {
        /// Scenario name to look for
        query: String,
        #[arg(long, default_value_t = feature::DEFAULT_MATCH_THRESHOLD)]
        threshold: f64,
    },

    /// Score two Gherkin scenarios for similarity
    Compare {
        first: String,
        second: String,
        #[arg(long, default_value_t = similarity::DEFAULT_SCENARIO_THRESHOLD)]
        threshold: f64,
    },

    /// Apply an edit to a .feature file
    Update {
        /// Feature file to edit
        file: PathBuf,
        /// creates, replaces, extends, removes or deprecates
        action: String,
        /// Scenario to act on
        #[arg(long, default_value = "")]
        name: String,
        /// Full scenario text (creates, replaces)
        #[arg(long, default_value = "")]
        text: String,
        /// Steps to append (extends)
        #[arg(long, default_value = "")]
        steps: String,
        /// Deprecation note (deprecates)
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Convert plans/*.md into specs/*.feature
    Migrate {
        #[arg(long, default_value_t = migrate::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Generate documentation from tagged scenarios
    Docs {
        /// Output file
        #[arg(long, short)]
        output: PathBuf,
        /// Tags to include, comma-separated
        #[arg(long, value_delimiter = ',', default_value = "@user")]
        tags: Vec<String>,
        /// markdown or html
        #[arg(long, default_value = "markdown")]
        format: String,
        /// Keep the existing document's non-feature sections (markdown only)
        #[arg(long)]
        incremental: bool,
    },

    /// Report which scenarios are mentioned in test files
    Coverage {
        /// Directory to search for tests (default: project root)
        #[arg(long)]
        project: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: SpecsSubcommand, json: bool) -> anyhow::Result<()> {
    let specs_dir = paths::specs_dir(root);
    match subcmd {
        SpecsSubcommand::List => list(&specs_dir, json),
        SpecsSubcommand::Similar { query, threshold } => {
            similar(&specs_dir, &query, threshold, json)
        }
        SpecsSubcommand::Compare {
            first,
            second,
            threshold,
        } => compare(&first, &second, threshold, json),
        SpecsSubcommand::Update {
            file,
            action,
            name,
            text,
            steps,
            note,
        } => {
            let action = SpecAction::from_parts(&action, &name, &text, &steps, &note)?;
            let file = if file.is_absolute() { file } else { root.join(file) };
            gherkin::apply_action(&file, &action)
                .with_context(|| format!("failed to update {}", file.display()))?;
            if json {
                print_json(&serde_json::json!({ "file": file, "action": action.verb() }))?;
            } else {
                println!("Applied '{}' to {}", action.verb(), file.display());
            }
            Ok(())
        }
        SpecsSubcommand::Migrate { batch_size } => migrate_plans(root, batch_size, json),
        SpecsSubcommand::Docs {
            output,
            tags,
            format,
            incremental,
        } => generate(root, &specs_dir, &output, &tags, &format, incremental, json),
        SpecsSubcommand::Coverage { project } => {
            let project = project.unwrap_or_else(|| root.to_path_buf());
            coverage(&specs_dir, &project, json)
        }
    }
}

// ---------------------------------------------------------------------------
// list / similar / compare
// ---------------------------------------------------------------------------

fn list(specs_dir: &Path, json: bool) -> anyhow::Result<()> {
    let features = gherkin::load_feature_files(specs_dir).context("failed to load specs")?;
    if json {
        return print_json(&features);
    }
    let rows = features
        .iter()
        .flat_map(|(file, f)| {
            f.scenarios.iter().map(move |s| {
                vec![
                    file.clone(),
                    f.name.clone(),
                    s.name.clone(),
                    s.tags.join(" "),
                ]
            })
        })
        .collect::<Vec<_>>();
    if rows.is_empty() {
        println!("No scenarios in {}", specs_dir.display());
        return Ok(());
    }
    print_table(&["FILE", "FEATURE", "SCENARIO", "TAGS"], rows);
    Ok(())
}

fn similar(specs_dir: &Path, query: &str, threshold: f64, json: bool) -> anyhow::Result<()> {
    let features = gherkin::load_feature_files(specs_dir).context("failed to load specs")?;
    let index = gherkin::build_scenario_index(&features);
    let matches = gherkin::find_similar_scenarios(query, &index, threshold);
    if json {
        return print_json(&matches);
    }
    if matches.is_empty() {
        println!("No similar scenarios.");
        return Ok(());
    }
    let rows = matches
        .iter()
        .map(|m| {
            vec![
                format!("{:.2}", m.similarity),
                m.name.clone(),
                m.scenario.file.clone(),
            ]
        })
        .collect();
    print_table(&["SCORE", "SCENARIO", "FILE"], rows);
    Ok(())
}

fn compare(first: &str, second: &str, threshold: f64, json: bool) -> anyhow::Result<()> {
    let score = gherkin::scenario_similarity(first, second);
    let similar = score >= threshold;
    if json {
        return print_json(&serde_json::json!({ "similarity": score, "similar": similar }));
    }
    println!(
        "{score:.2} ({})",
        if similar { "similar" } else { "different" }
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// migrate
// ---------------------------------------------------------------------------

fn migrate_plans(root: &Path, batch_size: usize, json: bool) -> anyhow::Result<()> {
    let summary = gherkin::migrate_project(root, batch_size, &mut |p| {
        if !json {
            eprintln!("batch {}: {}/{} plans", p.batch, p.current, p.total);
        }
    })
    .context("migration failed")?;

    if json {
        return print_json(&summary);
    }
    println!(
        "Migrated {}/{} plans ({} failed)",
        summary.successes, summary.total_plans, summary.failures
    );
    for written in &summary.written {
        println!("  wrote {written}");
    }
    for err in &summary.errors {
        println!("  ✗ {}: {}", err.file, err.error);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// docs / coverage
// ---------------------------------------------------------------------------

fn generate(
    root: &Path,
    specs_dir: &Path,
    output: &Path,
    tags: &[String],
    format: &str,
    incremental: bool,
    json: bool,
) -> anyhow::Result<()> {
    let format: DocFormat = format.parse()?;
    let output = if output.is_absolute() {
        output.to_path_buf()
    } else {
        root.join(output)
    };

    let count = if incremental {
        if format != DocFormat::Markdown {
            anyhow::bail!("--incremental only supports markdown output");
        }
        gherkin::generate_docs_incremental(specs_dir, &output, tags)?.scenarios_count
    } else {
        docs::generate_docs(specs_dir, &output, tags, format)?
    };

    if json {
        print_json(&serde_json::json!({ "output": output, "scenarios": count }))?;
    } else {
        println!("Documented {count} scenarios in {}", output.display());
    }
    Ok(())
}

fn coverage(specs_dir: &Path, project: &Path, json: bool) -> anyhow::Result<()> {
    let report = gherkin::analyze_coverage(specs_dir, project).context("coverage analysis failed")?;
    if json {
        return print_json(&report);
    }
    println!("Total scenarios: {}", report.total);
    println!("Tested: {}", report.tested);
    println!("Coverage: {:.1}%", report.percentage);
    let untested: Vec<_> = report.untested().collect();
    if !untested.is_empty() {
        println!("\nScenarios without tests:");
        for s in untested {
            println!("  ✗ {} ({})", s.name, s.file);
        }
    }
    Ok(())
}

//! Living-specification tooling: `.feature` parsing and search, scenario
//! similarity, in-place spec edits, plan migration and generated docs.

pub mod docs;
pub mod feature;
pub mod migrate;
pub mod similarity;
pub mod updater;

pub use docs::{analyze_coverage, generate_docs, generate_docs_incremental, DocFormat};
pub use feature::{
    build_scenario_index, find_similar_scenarios, load_feature_files, parse_feature, Feature,
    Scenario,
};
pub use migrate::migrate_project;
pub use similarity::{are_scenarios_similar, scenario_similarity};
pub use updater::{apply_action, SpecAction};

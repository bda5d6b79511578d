pub mod classify;
pub mod config;
pub mod data;
pub mod label;
pub mod reconcile;
pub mod render;
pub mod types;

use crate::classify::{Category, LEGEND_ORDER};
use crate::types::MapLayers;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the archive status map
    Render {
        /// TOML config; built-in paths and tables are used when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Overrides `output.image` (".svg" writes the vector scene)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print the derived status category of every row without drawing
    Classify {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Also print the map annotation for each matched region
        #[arg(long)]
        labels: bool,
    },
}

/// Load both inputs and join them. Any load failure aborts before output is touched.
fn build_layers(app_config: &config::AppConfig) -> anyhow::Result<MapLayers> {
    let records = data::load_status_table(&app_config.input)?;
    let geometries = data::load_geometry(&app_config.input)?;
    Ok(reconcile::reconcile(&app_config.aliases, records, geometries))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config, output } => {
            let mut app_config = config::AppConfig::load(config.as_deref())?;
            if let Some(output) = output {
                app_config.output.image = output.clone();
            }
            info!(
                "Rendering with inputs {:?} and {:?}",
                app_config.input.status_csv, app_config.input.geometry
            );

            let layers = build_layers(&app_config)?;
            render::render(&app_config, &layers)?;

            println!("\nMap generated successfully!");
            println!("\nAll {} states/UTs displayed", layers.regions.len());
        }
        Commands::Classify { config, labels } => {
            let app_config = config::AppConfig::load(config.as_deref())?;
            let layers = build_layers(&app_config)?;
            print_classification(&layers, *labels);
        }
    }

    Ok(())
}

fn print_classification(layers: &MapLayers, with_labels: bool) {
    let mut tally: BTreeMap<Category, usize> = BTreeMap::new();
    for region in &layers.regions {
        *tally.entry(region.category).or_default() += 1;
        println!("{:<40} {}", region.record.region_name, region.category);
        if with_labels {
            for line in label::label_lines(region) {
                println!("    {}", line);
            }
        }
    }
    for record in &layers.excluded {
        let category = classify::classify(
            &record.assembly_status,
            &record.council_status,
            &record.council_website_note,
        );
        println!("{:<40} {} (not on map)", record.region_name, category);
    }

    println!();
    for category in LEGEND_ORDER {
        if let Some(count) = tally.get(&category) {
            println!("{:<40} {}", category, count);
        }
    }
    println!("{} regions matched, {} excluded", layers.regions.len(), layers.excluded.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::square_feature;
    use crate::label::label_lines;
    use std::fs;
    use std::path::Path;

    const TRACKER: &str = "\
State / UT,Assembly Mirror Status,Council Mirror Status,Council Website,Notes
Kerala,Completed on 2023-01-01,No sitting council,No sitting council,
Karnataka,Completed,Started,,Kannada PDFs
Bihar,Metadata pending,Metadata pending,,
Union Territory of Ladakh,,,,
Atlantis,Started,,,not a state
";

    fn feature(name: &str, x: f64, y: f64) -> String {
        square_feature(name, x, y, 2.0)
    }

    fn write_inputs(dir: &Path) -> config::AppConfig {
        let csv = dir.join("tracker.csv");
        let geometry = dir.join("states.geojsonl");
        fs::write(&csv, TRACKER).unwrap();
        let features = [
            feature("Kerala", 76.0, 8.0),
            feature("Karnataka", 74.0, 12.0),
            feature("Bihar", 84.0, 25.0),
            feature("Ladakh", 76.0, 33.0),
            feature("Goa", 73.0, 15.0),
        ];
        fs::write(&geometry, features.join("\n")).unwrap();

        let mut app_config = config::AppConfig::default();
        app_config.input.status_csv = csv;
        app_config.input.geometry = geometry;
        app_config.output.image = dir.join("status_map.svg");
        app_config.output.width = 600;
        app_config.output.height = 700;
        app_config
    }

    #[test]
    fn pipeline_counts_only_matched_regions() {
        let dir = tempfile::tempdir().unwrap();
        let app_config = write_inputs(dir.path());
        let layers = build_layers(&app_config).unwrap();

        let matched: Vec<_> = layers.regions.iter().map(|r| r.canonical_name.as_str()).collect();
        assert_eq!(matched, ["Kerala", "Karnataka", "Bihar", "Ladakh"]);
        assert_eq!(layers.excluded.len(), 1);
        assert_eq!(layers.unmatched.len(), 1);

        let categories: Vec<_> = layers.regions.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            [
                Category::AssemblyCompleted,
                Category::AssemblyDoneCouncilPending,
                Category::BothNeedUpdate,
                Category::NoData,
            ]
        );

        render::render(&app_config, &layers).unwrap();
        assert!(app_config.output.image.exists());
    }

    #[test]
    fn pipeline_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let app_config = write_inputs(dir.path());

        let summarize = |layers: &MapLayers| -> Vec<(String, Category, String)> {
            layers
                .regions
                .iter()
                .map(|r| (r.canonical_name.clone(), r.category, label_lines(r).join("\n")))
                .collect()
        };
        let first = build_layers(&app_config).unwrap();
        let second = build_layers(&app_config).unwrap();
        assert_eq!(summarize(&first), summarize(&second));
        assert_eq!(
            render::build_svg(&app_config, &first).unwrap(),
            render::build_svg(&app_config, &second).unwrap()
        );
    }

    #[test]
    fn missing_geometry_aborts_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut app_config = write_inputs(dir.path());
        app_config.input.geometry = dir.path().join("missing.geojsonl");
        assert!(build_layers(&app_config).is_err());
        assert!(!app_config.output.image.exists());
    }
}

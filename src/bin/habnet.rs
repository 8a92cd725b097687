//! habnet - Habitat Network Construction CLI
//!
//! Command-line interface for building taxon co-occurrence networks from
//! strain relation exports.

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use habnet::data::StrainTable;
use habnet::error::Result;
use habnet::pipeline::{Pipeline, PipelineConfig};
use habnet::profile::{count_support, filter_by_support_with_stats, Axis};
use habnet::similarity::SimilarityMode;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// CLI-friendly similarity kernel enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSimilarityMode {
    /// Dot product of fraction-normalized profiles
    Fraction,
    /// Exponential decay over count dissimilarity
    ExpDissimilarity,
}

impl From<CliSimilarityMode> for SimilarityMode {
    fn from(mode: CliSimilarityMode) -> Self {
        match mode {
            CliSimilarityMode::Fraction => SimilarityMode::Fraction,
            CliSimilarityMode::ExpDissimilarity => SimilarityMode::ExpDissimilarity,
        }
    }
}

/// Habitat network construction from strain relation exports
#[derive(Parser)]
#[command(name = "habnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write network artifacts
    Run {
        /// Path to the strain relation TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for the artifact files
        #[arg(short, long)]
        output: PathBuf,

        /// Optional pipeline configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the minimum support on both axes
        #[arg(long)]
        min_support: Option<usize>,

        /// Override the similarity kernel
        #[arg(long, value_enum)]
        mode: Option<CliSimilarityMode>,

        /// Override the similarity threshold
        #[arg(long)]
        min_similarity: Option<f64>,

        /// Keep only the k strongest similarities per row
        #[arg(long)]
        top_k: Option<usize>,

        /// Override the Louvain shuffle seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarize a relation file without building the network
    Profile {
        /// Path to the strain relation TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "habnet.yaml")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            config,
            min_support,
            mode,
            min_similarity,
            top_k,
            seed,
        } => cmd_run(
            &input,
            &output,
            config.as_ref(),
            min_support,
            mode,
            min_similarity,
            top_k,
            seed,
        ),

        Commands::Profile { input, format } => cmd_profile(&input, &format),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run the full pipeline and write artifacts
#[allow(clippy::too_many_arguments)]
fn cmd_run(
    input_path: &PathBuf,
    output_dir: &PathBuf,
    config_path: Option<&PathBuf>,
    min_support: Option<usize>,
    mode: Option<CliSimilarityMode>,
    min_similarity: Option<f64>,
    top_k: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => {
            eprintln!("Loading pipeline configuration from {:?}...", path);
            PipelineConfig::from_yaml_file(path)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(min) = min_support {
        config.taxon_min_support = min;
        config.habitat_min_support = min;
    }
    if let Some(mode) = mode {
        config.similarity = mode.into();
    }
    if let Some(threshold) = min_similarity {
        config.min_similarity = threshold;
    }
    if top_k.is_some() {
        config.top_k = top_k;
    }
    if let Some(seed) = seed {
        config.louvain_seed = seed;
    }

    eprintln!("Running pipeline on {:?}...", input_path);
    let pipeline = Pipeline::from_config(config);
    let output = pipeline.run_file(input_path)?;

    eprintln!("Writing artifacts to {:?}...", output_dir);
    output.write_artifacts(output_dir)?;

    eprintln!(
        "Done! {} taxa, {} edges ({} after sparsification)",
        output.graph.n_nodes(),
        output.graph.n_edges(),
        output.sparsified.n_edges()
    );
    eprintln!(
        "  {} communities, modularity {:.4}",
        output.communities.n_communities, output.communities.modularity
    );

    Ok(())
}

/// Summarize parse and support statistics for a relation file
fn cmd_profile(input_path: &PathBuf, format: &str) -> Result<()> {
    eprintln!("Loading relation file...");
    let config = PipelineConfig::default();
    let file = File::open(input_path)?;
    let (mut table, parse) =
        StrainTable::from_reader_with_stats(BufReader::new(file), &config.schema)?;

    let lineage_exclude: BTreeSet<String> = config.lineage_exclude.iter().cloned().collect();
    let n_foreign = table.exclude_by_lineage(&lineage_exclude);

    let taxon_counts = count_support(&table, Axis::Taxon);
    let habitat_counts = count_support(&table, Axis::Habitat);

    let taxon_exclude: BTreeSet<String> = config.taxon_exclude.iter().cloned().collect();
    let habitat_exclude: BTreeSet<String> = config.habitat_exclude.iter().cloned().collect();
    let (_, taxon_stats) = filter_by_support_with_stats(
        &taxon_counts,
        Axis::Taxon,
        config.taxon_min_support,
        &taxon_exclude,
    )?;
    let (_, habitat_stats) = filter_by_support_with_stats(
        &habitat_counts,
        Axis::Habitat,
        config.habitat_min_support,
        &habitat_exclude,
    )?;

    match format {
        "json" => {
            let profile = serde_json::json!({
                "parse": parse,
                "lineage_excluded": n_foreign,
                "taxon": taxon_stats,
                "habitat": habitat_stats
            });
            println!("{}", serde_json::to_string_pretty(&profile).unwrap());
        }
        _ => {
            println!("{}", parse);
            println!("Foreign lineage: {} strains removed", n_foreign);
            println!();
            println!("{}", taxon_stats);
            println!("{}", habitat_stats);
        }
    }

    Ok(())
}

/// Generate example pipeline configuration
fn cmd_example(output_path: &PathBuf) -> Result<()> {
    let config = PipelineConfig::default();
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}

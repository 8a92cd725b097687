//! Basic example demonstrating habitat network construction.
//!
//! This example shows how to:
//! 1. Create a synthetic strain relation export
//! 2. Profile the parsed strains
//! 3. Run the full pipeline
//! 4. Examine the resulting network

use habnet::prelude::*;
use std::io::Cursor;

fn main() -> Result<()> {
    println!("=== Habitat Network Example ===\n");

    // Create a synthetic relation export
    let data = create_example_data();

    // Profile the parsed strains
    println!("=== Strain Profiling ===\n");

    let (strains, summary) =
        StrainTable::from_reader_with_stats(Cursor::new(data.as_str()), &RecordSchema::default())?;
    println!("{}", summary);

    let taxon_counts = count_support(&strains, Axis::Taxon);
    let habitat_counts = count_support(&strains, Axis::Habitat);
    println!("Distinct taxa: {}", taxon_counts.len());
    println!("Distinct habitats: {}", habitat_counts.len());
    println!();

    // Run the pipeline
    println!("=== Running Pipeline ===\n");

    let config = PipelineConfig {
        min_similarity: 0.20,
        ..PipelineConfig::default()
    };

    let pipeline = Pipeline::from_config(config);
    let output = pipeline.run(Cursor::new(data.as_str()))?;

    println!("Pipeline complete!");
    println!(
        "  Profile: {} taxa x {} habitats ({} entries)",
        output.profile.n_rows(),
        output.profile.n_cols(),
        output.profile.nnz()
    );
    println!(
        "  Graph: {} nodes, {} edges ({} after sparsification)",
        output.graph.n_nodes(),
        output.graph.n_edges(),
        output.sparsified.n_edges()
    );
    println!();

    // Communities
    println!("=== Communities ===\n");
    println!(
        "{} communities, modularity {:.4}",
        output.communities.n_communities, output.communities.modularity
    );
    for community in 0..output.communities.n_communities {
        let members: Vec<&str> = output
            .artifact
            .labels
            .iter()
            .zip(&output.artifact.communities)
            .filter(|&(_, &assigned)| assigned == community)
            .map(|(label, _)| label.as_str())
            .collect();
        println!("  community {}: {}", community, members.join(", "));
    }

    // Top nodes by betweenness
    let mut rows = output.metrics.rows().to_vec();
    rows.sort_by(|a, b| b.betweenness.partial_cmp(&a.betweenness).unwrap());

    println!("\n=== Top 5 Nodes (by betweenness) ===\n");
    println!(
        "{:<10} {:>12} {:>12}",
        "Taxon", "Betweenness", "Clustering"
    );
    println!("{}", "-".repeat(36));
    for row in rows.iter().take(5) {
        println!(
            "{:<10} {:>12.4} {:>12.4}",
            row.node, row.betweenness, row.clustering
        );
    }

    // Write artifacts to a scratch directory
    let staging = tempfile::tempdir().unwrap();
    output.write_artifacts(staging.path())?;

    let mut names: Vec<String> = std::fs::read_dir(staging.path())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    println!("\n=== Artifacts ===\n");
    for name in &names {
        println!("  {}", name);
    }

    println!("\n=== Pipeline Configuration (YAML) ===\n");
    println!("{}", output.config.to_yaml()?);

    Ok(())
}

/// Create a relation export with two habitat guilds and two bridging taxa.
fn create_example_data() -> String {
    let soil = ["100001", "100002", "100003", "100004"];
    let water = ["200001", "200002", "200003", "200004"];

    let mut seed = 12345u64;
    let rand_uniform = |s: &mut u64| -> f64 {
        *s = s.wrapping_mul(1103515245).wrapping_add(12345);
        ((*s >> 16) & 0x7FFF) as f64 / 32768.0
    };

    let mut lines = Vec::new();
    for taxon in 0..12 {
        for strain in 0..6 {
            // Taxa 0-4 are soil specialists, 5-9 water specialists, the
            // rest range over both pools and bridge the guilds.
            let pool: Vec<&str> = match taxon {
                0..=4 => soil.to_vec(),
                5..=9 => water.to_vec(),
                _ => soil.iter().chain(water.iter()).copied().collect(),
            };

            let n_habitats = 2 + (rand_uniform(&mut seed) > 0.5) as usize;
            let mut paths = Vec::new();
            for _ in 0..n_habitats {
                let pick = (rand_uniform(&mut seed) * pool.len() as f64) as usize;
                paths.push(format!("#Environment/OBT:000000/OBT:{}", pool[pick]));
            }

            lines.push(format!(
                "r{}\t-\t-\tncbi:131567/ncbi:{}\t-\t-\t-\t{}\tRS{:03}",
                taxon * 6 + strain,
                1000 + taxon,
                paths.join(","),
                taxon * 6 + strain
            ));
        }
    }
    lines.join("\n")
}

//! Pipeline runner executing the full relation-to-network sequence.

use crate::data::{LabelConfig, ProfileMatrix, RecordSchema, StrainTable};
use crate::error::{HabnetError, Result};
use crate::graph::{
    betweenness_approx, clustering_coefficients, louvain_communities, weighted_degrees,
    write_community_sizes, write_degrees_csv, CommunityStructure, GraphArtifact, NodeMetricsTable,
    SimilarityGraph,
};
use crate::profile::{
    build_profile, count_support, filter_by_support_with_stats, summarize_profile, Axis,
    Normalization,
};
use crate::similarity::{compute_similarity, SimilarityMatrix, SimilarityMode};
use crate::sparsify::{mutual_sparsify_with_stats, top_k_similarity, MutualSparsifyConfig};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

/// Habitat codes dropped regardless of support. These are the catch-all
/// top-of-ontology codes that would connect almost every taxon.
fn default_habitat_exclude() -> Vec<String> {
    [
        "000001", "000006", "000009", "000010", "000013", "000014", "000039", "000047", "000089",
        "000158", "000193", "000490",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Full parameter set for one pipeline run, YAML-loadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Field layout of the relation file.
    pub schema: RecordSchema,
    /// Lineage codes whose presence excludes the whole strain.
    pub lineage_exclude: Vec<String>,
    /// Minimum distinct strains per taxon.
    pub taxon_min_support: usize,
    /// Minimum distinct strains per habitat.
    pub habitat_min_support: usize,
    /// Taxon codes dropped regardless of support.
    pub taxon_exclude: Vec<String>,
    /// Habitat codes dropped regardless of support.
    pub habitat_exclude: Vec<String>,
    /// Similarity kernel.
    pub similarity: SimilarityMode,
    /// Similarity entries below this are dropped.
    pub min_similarity: f64,
    /// Optional per-row cap on similarity entries before graph build.
    pub top_k: Option<usize>,
    /// Mutual sparsification parameters.
    pub mutual: MutualSparsifyConfig,
    /// Communities below this size stay out of the size report.
    pub community_min_size: usize,
    /// Seed for Louvain node shuffling.
    pub louvain_seed: u64,
    /// Betweenness source sample count.
    pub betweenness_samples: usize,
    /// Seed for betweenness source sampling.
    pub betweenness_seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema: RecordSchema::default(),
            lineage_exclude: vec!["4751".to_string()],
            taxon_min_support: 2,
            habitat_min_support: 2,
            taxon_exclude: vec!["1".to_string()],
            habitat_exclude: default_habitat_exclude(),
            similarity: SimilarityMode::ExpDissimilarity,
            min_similarity: 0.10,
            top_k: None,
            mutual: MutualSparsifyConfig::default(),
            community_min_size: 2,
            louvain_seed: 42,
            betweenness_samples: 800,
            betweenness_seed: 42,
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML string; absent fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(HabnetError::from)
    }

    /// Serialize to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(HabnetError::from)
    }

    /// Load from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

/// Everything a finished run produces, ready to be written out.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub config: PipelineConfig,
    pub labels: LabelConfig,
    pub profile: ProfileMatrix,
    pub similarity: SimilarityMatrix,
    pub graph: SimilarityGraph,
    pub degrees_initial: Vec<f64>,
    pub communities: CommunityStructure,
    pub betweenness: Vec<f64>,
    pub sparsified: SimilarityGraph,
    pub degrees_sparsified: Vec<f64>,
    pub clustering: Vec<f64>,
    pub artifact: GraphArtifact,
    pub metrics: NodeMetricsTable,
}

impl PipelineOutput {
    /// Write every artifact into `dir`, creating it if needed.
    ///
    /// Files: `labels.json`, `similarity_coo.tsv`, `degrees_initial.csv`,
    /// `degrees_sparsified.csv`, `graph_layout.json`, `node_metrics.tsv`,
    /// `community_sizes.csv`.
    pub fn write_artifacts<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        self.labels.to_json(dir.join("labels.json"))?;
        self.similarity.to_coo_tsv(dir.join("similarity_coo.tsv"))?;
        write_degrees_csv(&self.degrees_initial, dir.join("degrees_initial.csv"))?;
        write_degrees_csv(&self.degrees_sparsified, dir.join("degrees_sparsified.csv"))?;
        self.artifact.to_json(dir.join("graph_layout.json"))?;
        self.metrics.to_tsv(dir.join("node_metrics.tsv"))?;
        write_community_sizes(
            &self.communities,
            self.config.community_min_size,
            dir.join("community_sizes.csv"),
        )?;

        info!("artifacts written to {}", dir.display());
        Ok(())
    }
}

/// Runs the fixed stage sequence: parse, support filtering, profile,
/// similarity, graph, community detection, betweenness, mutual
/// sparsification, clustering, metrics assembly.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Pipeline with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline with explicit parameters.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run on a relation file.
    pub fn run_file<P: AsRef<Path>>(&self, path: P) -> Result<PipelineOutput> {
        let file = File::open(path)?;
        self.run(BufReader::new(file))
    }

    /// Run on any line-oriented reader of relation records.
    pub fn run<R: BufRead>(&self, reader: R) -> Result<PipelineOutput> {
        let config = &self.config;

        let strains = stage(1, "parse", || {
            let (mut table, _) = StrainTable::from_reader_with_stats(reader, &config.schema)?;
            let markers: BTreeSet<String> = config.lineage_exclude.iter().cloned().collect();
            let excluded = table.exclude_by_lineage(&markers);
            if excluded > 0 {
                info!("excluded {} strains by lineage marker", excluded);
            }
            Ok(table)
        })?;

        let (taxa, habitats) = stage(2, "support", || {
            let taxon_counts = count_support(&strains, Axis::Taxon);
            let habitat_counts = count_support(&strains, Axis::Habitat);
            let taxon_excluded: BTreeSet<String> = config.taxon_exclude.iter().cloned().collect();
            let habitat_excluded: BTreeSet<String> =
                config.habitat_exclude.iter().cloned().collect();

            let (taxa, taxon_stats) = filter_by_support_with_stats(
                &taxon_counts,
                Axis::Taxon,
                config.taxon_min_support,
                &taxon_excluded,
            )?;
            debug!("{}", taxon_stats);
            let (habitats, habitat_stats) = filter_by_support_with_stats(
                &habitat_counts,
                Axis::Habitat,
                config.habitat_min_support,
                &habitat_excluded,
            )?;
            debug!("{}", habitat_stats);
            Ok((taxa, habitats))
        })?;

        let profile = stage(3, "profile", || {
            let normalization = match config.similarity {
                SimilarityMode::Fraction => Normalization::Fraction,
                SimilarityMode::ExpDissimilarity => Normalization::Count,
            };
            let profile = build_profile(&strains, taxa, habitats, normalization)?;
            debug!("{}", summarize_profile(&profile));
            Ok(profile)
        })?;
        let labels = LabelConfig::new(profile.row_index(), profile.col_index());

        let similarity = stage(4, "similarity", || {
            let mut similarity =
                compute_similarity(&profile, config.similarity, config.min_similarity)?;
            if let Some(k) = config.top_k {
                similarity = top_k_similarity(&similarity, k)?;
            }
            Ok(similarity)
        })?;

        let (graph, degrees_initial) = stage(5, "graph", || {
            let graph =
                SimilarityGraph::from_similarity(&similarity, profile.row_labels().to_vec())?;
            let degrees = weighted_degrees(&graph);
            Ok((graph, degrees))
        })?;

        let communities = stage(6, "community", || {
            Ok(louvain_communities(&graph, config.louvain_seed))
        })?;

        let betweenness = stage(7, "betweenness", || {
            betweenness_approx(&graph, config.betweenness_samples, config.betweenness_seed)
        })?;

        let (sparsified, degrees_sparsified) = stage(8, "sparsify", || {
            let (sparsified, stats) = mutual_sparsify_with_stats(&graph, &config.mutual)?;
            debug!("{}", stats);
            let degrees = weighted_degrees(&sparsified);
            Ok((sparsified, degrees))
        })?;

        let clustering = stage(9, "clustering", || Ok(clustering_coefficients(&sparsified)))?;

        let (artifact, metrics) = stage(10, "metrics", || {
            let artifact = GraphArtifact::new(&graph, &communities)?;
            let metrics = NodeMetricsTable::new(graph.labels(), &betweenness, &clustering)?;
            Ok((artifact, metrics))
        })?;

        Ok(PipelineOutput {
            config: config.clone(),
            labels,
            profile,
            similarity,
            graph,
            degrees_initial,
            communities,
            betweenness,
            sparsified,
            degrees_sparsified,
            clustering,
            artifact,
            metrics,
        })
    }
}

/// Run one stage, wrapping failures with the stage number and name and
/// logging how long it took.
fn stage<T, F: FnOnce() -> Result<T>>(index: usize, name: &str, f: F) -> Result<T> {
    let started = Instant::now();
    let value = f().map_err(|e| match e {
        HabnetError::Pipeline(_) => e,
        other => HabnetError::Pipeline(format!("stage {} ({}) failed: {}", index, name, other)),
    })?;
    info!(
        "stage {} ({}) finished in {:.2?}",
        index,
        name,
        started.elapsed()
    );
    Ok(value)
}

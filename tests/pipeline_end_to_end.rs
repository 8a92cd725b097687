//! Integration tests for the full relation-to-network pipeline.

use approx::assert_relative_eq;
use habnet::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// One export line: nine tab-separated fields with the lineage path in
/// field 3, the habitat paths in field 7 and the strain id in field 8.
fn relation_line_full(id: &str, lineage: &str, habitats: &[&str]) -> String {
    let paths: Vec<String> = habitats
        .iter()
        .map(|h| format!("#Environment/OBT:000000/OBT:{}", h))
        .collect();
    let mut fields = vec![String::new(); 9];
    fields[3] = lineage.to_string();
    fields[7] = paths.join(",");
    fields[8] = id.to_string();
    fields.join("\t")
}

fn relation_line(id: &str, taxon: &str, habitats: &[&str]) -> String {
    relation_line_full(id, &format!("ncbi:131567/ncbi:{}", taxon), habitats)
}

/// Two blocks of three taxa each with disjoint habitat support.
///
/// Count profiles over (ha1, ha2, ha3): t1 = [3, 2, 1], t2 = [3, 3, 1],
/// t3 = [3, 2, 2]; the u block mirrors them over (hb1, hb2, hb3). L1
/// distances are 1 or 2 within a block and 12 to 14 across blocks, and the
/// median over all ordered pairs (diagonal included) is 7. The decay
/// therefore maps within-block pairs to 2^(-1/7) or 2^(-2/7) and
/// cross-block pairs to at most 2^(-12/7), about 0.30.
fn two_block_lines() -> Vec<String> {
    let strains: [(&str, &str, &[&str]); 18] = [
        ("A1", "t1", &["ha1", "ha2", "ha3"]),
        ("A2", "t1", &["ha1", "ha2"]),
        ("A3", "t1", &["ha1"]),
        ("A4", "t2", &["ha1", "ha2", "ha3"]),
        ("A5", "t2", &["ha1", "ha2"]),
        ("A6", "t2", &["ha1", "ha2"]),
        ("A7", "t3", &["ha1", "ha2", "ha3"]),
        ("A8", "t3", &["ha1", "ha2", "ha3"]),
        ("A9", "t3", &["ha1"]),
        ("B1", "u1", &["hb1", "hb2", "hb3"]),
        ("B2", "u1", &["hb1", "hb2"]),
        ("B3", "u1", &["hb1"]),
        ("B4", "u2", &["hb1", "hb2", "hb3"]),
        ("B5", "u2", &["hb1", "hb2"]),
        ("B6", "u2", &["hb1", "hb2"]),
        ("B7", "u3", &["hb1", "hb2", "hb3"]),
        ("B8", "u3", &["hb1", "hb2", "hb3"]),
        ("B9", "u3", &["hb1"]),
    ];
    strains
        .iter()
        .map(|(id, taxon, habitats)| relation_line(id, taxon, habitats))
        .collect()
}

fn write_relations(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn two_block_relations() -> NamedTempFile {
    write_relations(&two_block_lines())
}

/// Raise the similarity threshold so only within-block pairs survive,
/// leaving two disconnected triangles; keep every nomination in the
/// mutual pass so the triangles stay intact.
fn blocked_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.min_similarity = 0.6;
    config.mutual.percent = 1.0;
    config
}

#[test]
fn test_two_block_graph() {
    let file = two_block_relations();
    let output = Pipeline::from_config(blocked_config())
        .run_file(file.path())
        .unwrap();

    assert_eq!(output.graph.labels(), vec!["t1", "t2", "t3", "u1", "u2", "u3"]);
    assert_eq!(output.graph.n_nodes(), 6);
    assert_eq!(output.graph.n_edges(), 6);

    let w1 = 2f64.powf(-1.0 / 7.0);
    let w2 = 2f64.powf(-2.0 / 7.0);
    assert_relative_eq!(output.graph.edge_weight(0, 1).unwrap(), w1, epsilon = 1e-12);
    assert_relative_eq!(output.graph.edge_weight(0, 2).unwrap(), w1, epsilon = 1e-12);
    assert_relative_eq!(output.graph.edge_weight(1, 2).unwrap(), w2, epsilon = 1e-12);
    // the threshold severs every cross-block pair
    assert!(output.graph.edge_weight(0, 3).is_none());
    assert!(output.graph.edge_weight(2, 5).is_none());
}

#[test]
fn test_two_block_communities() {
    let file = two_block_relations();
    let output = Pipeline::from_config(blocked_config())
        .run_file(file.path())
        .unwrap();

    assert_eq!(output.communities.n_communities, 2);
    assert_eq!(output.communities.assignments, vec![0, 0, 0, 1, 1, 1]);
    // two symmetric components holding half the weight each
    assert_relative_eq!(output.communities.modularity, 0.5, epsilon = 1e-9);
}

#[test]
fn test_two_block_node_metrics() {
    let file = two_block_relations();
    let output = Pipeline::from_config(blocked_config())
        .run_file(file.path())
        .unwrap();

    // every shortest path inside a triangle is a direct edge
    for &b in &output.betweenness {
        assert_eq!(b, 0.0);
    }

    // uniform triangles: c = cbrt(1 * 1 * 2^(-1/7)) at every corner
    let expected = 2f64.powf(-1.0 / 21.0);
    for &c in &output.clustering {
        assert_relative_eq!(c, expected, epsilon = 1e-12);
    }

    let w1 = 2f64.powf(-1.0 / 7.0);
    let w2 = 2f64.powf(-2.0 / 7.0);
    assert_relative_eq!(output.degrees_initial[0], 2.0 * w1, epsilon = 1e-12);
    assert_relative_eq!(output.degrees_initial[1], w1 + w2, epsilon = 1e-12);
    assert_relative_eq!(output.degrees_initial[2], w1 + w2, epsilon = 1e-12);

    // full-percent nominations keep both triangles whole
    assert_eq!(output.sparsified.n_edges(), 6);
    assert_eq!(output.degrees_sparsified, output.degrees_initial);
}

#[test]
fn test_default_threshold_keeps_blocks_connected() {
    let file = two_block_relations();
    let output = Pipeline::new().run_file(file.path()).unwrap();

    // cross-block similarities sit around 0.25-0.30, above the 0.10 floor
    assert_eq!(output.graph.n_edges(), 15);
    assert_eq!(output.communities.n_communities, 2);
    assert_eq!(output.communities.assignments, vec![0, 0, 0, 1, 1, 1]);

    // degree 5 gives an allowance of four nominations per node; the
    // mutual pass keeps the six block edges plus four cross edges
    assert_eq!(output.sparsified.n_edges(), 10);

    assert_eq!(output.betweenness.len(), 6);
    assert!(output.betweenness.iter().all(|&b| b.is_finite() && b >= 0.0));
    // cheap cross-block edges shortcut within-block paths
    assert!(output.betweenness.iter().any(|&b| b > 0.0));
    assert_eq!(output.clustering.len(), 6);
}

#[test]
fn test_artifact_files_roundtrip() {
    let file = two_block_relations();
    let output = Pipeline::from_config(blocked_config())
        .run_file(file.path())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    output.write_artifacts(dir.path()).unwrap();

    for name in [
        "labels.json",
        "similarity_coo.tsv",
        "degrees_initial.csv",
        "degrees_sparsified.csv",
        "graph_layout.json",
        "node_metrics.tsv",
        "community_sizes.csv",
    ] {
        assert!(dir.path().join(name).exists(), "missing artifact {}", name);
    }

    let labels = LabelConfig::from_json(dir.path().join("labels.json")).unwrap();
    assert_eq!(labels.row_labels, output.labels.row_labels);
    assert_eq!(
        labels.column_labels,
        vec!["ha1", "ha2", "ha3", "hb1", "hb2", "hb3"]
    );

    let artifact = GraphArtifact::from_json(dir.path().join("graph_layout.json")).unwrap();
    assert_eq!(artifact.labels.as_slice(), output.graph.labels());
    assert_eq!(artifact.communities, output.communities.assignments);
    assert_eq!(artifact.unique_comms, vec![0, 1]);
    assert_eq!(artifact.pos3.len(), 6);

    let metrics = fs::read_to_string(dir.path().join("node_metrics.tsv")).unwrap();
    let lines: Vec<&str> = metrics.lines().collect();
    assert_eq!(lines[0], "node\tbetweenness\tclustering");
    assert_eq!(lines.len(), 7);
    assert!(lines[1].starts_with("t1\t0\t"));

    let sizes = fs::read_to_string(dir.path().join("community_sizes.csv")).unwrap();
    let lines: Vec<&str> = sizes.lines().collect();
    assert_eq!(lines, vec!["community_id,size", "0,3", "1,3"]);

    let coo = fs::read_to_string(dir.path().join("similarity_coo.tsv")).unwrap();
    assert_eq!(coo.lines().next().unwrap(), "row\tcol\tvalue");
    // six diagonal entries plus both orientations of six block pairs
    assert_eq!(coo.lines().count(), 1 + output.similarity.nnz());
    assert_eq!(output.similarity.nnz(), 18);
}

#[test]
fn test_repeat_runs_byte_identical() {
    let file = two_block_relations();
    let pipeline = Pipeline::from_config(blocked_config());
    let first = pipeline.run_file(file.path()).unwrap();
    let second = pipeline.run_file(file.path()).unwrap();

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    first.write_artifacts(dir_a.path()).unwrap();
    second.write_artifacts(dir_b.path()).unwrap();

    for name in [
        "labels.json",
        "similarity_coo.tsv",
        "degrees_initial.csv",
        "degrees_sparsified.csv",
        "graph_layout.json",
        "node_metrics.tsv",
        "community_sizes.csv",
    ] {
        let a = fs::read(dir_a.path().join(name)).unwrap();
        let b = fs::read(dir_b.path().join(name)).unwrap();
        assert_eq!(a, b, "artifact {} differs between runs", name);
    }
}

#[test]
fn test_low_support_axis_dropped() {
    let mut lines = two_block_lines();
    // a single strain cannot carry its taxon or its habitat past min support
    lines.push(relation_line("X1", "v1", &["hc1"]));
    let file = write_relations(&lines);

    let output = Pipeline::from_config(blocked_config())
        .run_file(file.path())
        .unwrap();

    assert_eq!(output.graph.labels(), vec!["t1", "t2", "t3", "u1", "u2", "u3"]);
    assert_eq!(
        output.labels.column_labels,
        vec!["ha1", "ha2", "ha3", "hb1", "hb2", "hb3"]
    );
}

#[test]
fn test_foreign_clade_excluded() {
    let mut lines = two_block_lines();
    // two strains under the excluded clade would otherwise pass support
    lines.push(relation_line_full(
        "F1",
        "ncbi:131567/ncbi:4751/ncbi:f9",
        &["ha1"],
    ));
    lines.push(relation_line_full(
        "F2",
        "ncbi:131567/ncbi:4751/ncbi:f9",
        &["ha1"],
    ));
    let file = write_relations(&lines);

    let output = Pipeline::from_config(blocked_config())
        .run_file(file.path())
        .unwrap();

    assert_eq!(output.graph.labels(), vec!["t1", "t2", "t3", "u1", "u2", "u3"]);
}

#[test]
fn test_config_file_roundtrip() {
    let config = blocked_config();
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config.to_yaml().unwrap().as_bytes()).unwrap();
    file.flush().unwrap();

    let loaded = PipelineConfig::from_yaml_file(file.path()).unwrap();
    assert_relative_eq!(loaded.min_similarity, 0.6);
    assert_relative_eq!(loaded.mutual.percent, 1.0);
    assert_eq!(loaded.louvain_seed, config.louvain_seed);
    assert_eq!(loaded.betweenness_samples, config.betweenness_samples);
}

//! Score a clustering against hand-labelled headlines.
//!
//! Ground truth maps each headline title to the narrative it belongs to.
//! Pairwise precision counts only headlines that landed in a valid
//! narrative; recall is measured against every same-label pair in the
//! ground truth, so headlines the clustering left out cost recall.

use std::collections::HashMap;
use std::path::Path;
use indexmap::IndexMap;
use nc_core::{Error, NarrativeSet, Result};
use serde::Serialize;
use tracing::warn;

/// Label given to ground-truth headlines outside every valid narrative.
pub const UNCLUSTERED: &str = "Unclustered";

pub type GroundTruth = HashMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClusterScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Over all ground-truth headlines, unclustered ones sharing one label.
    pub adjusted_rand_index: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub narratives: usize,
    pub clustered: usize,
}

/// Read a JSON object of `{"headline title": "narrative label"}`.
pub fn load_ground_truth(path: &Path) -> Result<GroundTruth> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("cannot read ground truth {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        Error::Configuration(format!("invalid ground truth {}: {}", path.display(), e))
    })
}

pub fn evaluate(set: &NarrativeSet, ground_truth: &GroundTruth) -> ClusterScores {
    let mut predicted: IndexMap<&str, &str> = IndexMap::new();
    for (category, narrative) in &set.valid_narratives {
        for article in &narrative.articles {
            if ground_truth.contains_key(&article.title) {
                predicted.insert(&article.title, category);
            } else {
                warn!(title = %article.title, "Clustered headline has no ground-truth label, skipping");
            }
        }
    }

    let mut scores = ClusterScores {
        narratives: set.valid_narratives.len(),
        clustered: predicted.len(),
        adjusted_rand_index: adjusted_rand_index(&predicted, ground_truth),
        ..ClusterScores::default()
    };
    if predicted.is_empty() {
        return scores;
    }

    let titles: Vec<(&str, &str)> = predicted.iter().map(|(t, c)| (*t, *c)).collect();
    for (i, (title_a, cluster_a)) in titles.iter().enumerate() {
        for (title_b, cluster_b) in &titles[i + 1..] {
            let same_truth = ground_truth[*title_a] == ground_truth[*title_b];
            match (same_truth, cluster_a == cluster_b) {
                (true, true) => scores.true_positives += 1,
                (false, true) => scores.false_positives += 1,
                (true, false) => scores.false_negatives += 1,
                (false, false) => {}
            }
        }
    }

    let mut group_sizes: HashMap<&str, u64> = HashMap::new();
    for label in ground_truth.values() {
        *group_sizes.entry(label).or_default() += 1;
    }
    let positive_pairs: u64 = group_sizes.values().map(|&n| pairs(n)).sum();

    let predicted_pairs = scores.true_positives + scores.false_positives;
    scores.precision = ratio(scores.true_positives as u64, predicted_pairs as u64);
    scores.recall = ratio(scores.true_positives as u64, positive_pairs);
    if scores.precision + scores.recall > 0.0 {
        scores.f1 = 2.0 * scores.precision * scores.recall / (scores.precision + scores.recall);
    }
    scores
}

fn pairs(n: u64) -> u64 {
    n * n.saturating_sub(1) / 2
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn adjusted_rand_index(predicted: &IndexMap<&str, &str>, ground_truth: &GroundTruth) -> f64 {
    let mut cells: HashMap<(&str, &str), u64> = HashMap::new();
    let mut truth_sizes: HashMap<&str, u64> = HashMap::new();
    let mut predicted_sizes: HashMap<&str, u64> = HashMap::new();
    for (title, label) in ground_truth {
        let cluster = predicted.get(title.as_str()).copied().unwrap_or(UNCLUSTERED);
        *cells.entry((label.as_str(), cluster)).or_default() += 1;
        *truth_sizes.entry(label).or_default() += 1;
        *predicted_sizes.entry(cluster).or_default() += 1;
    }

    let total = pairs(ground_truth.len() as u64) as f64;
    if total == 0.0 {
        return 1.0;
    }
    let index: f64 = cells.values().map(|&n| pairs(n) as f64).sum();
    let truth: f64 = truth_sizes.values().map(|&n| pairs(n) as f64).sum();
    let clusters: f64 = predicted_sizes.values().map(|&n| pairs(n) as f64).sum();
    let expected = truth * clusters / total;
    let max = (truth + clusters) / 2.0;
    if max == expected {
        // identical trivial partitions
        return 1.0;
    }
    (index - expected) / (max - expected)
}

//! Greedy keyword-overlap clustering.
//!
//! Articles are visited once, in input order. Each unassigned article seeds a
//! cluster, and a single forward scan pulls in every later unassigned article
//! sharing a keyword with the cluster. The cluster keyword set grows during
//! that scan, so an article can join through words contributed by a member
//! added moments earlier, while an article the scan already passed never gets
//! a second look. Results therefore depend on input order.

use std::collections::HashSet;
use indexmap::IndexMap;
use nc_core::{Article, Narrative, NarrativeSet, EXCLUDED_REASON};
use tracing::{debug, info};
use crate::keywords::{keywords, qualifying_words};

/// Name of the bucket holding articles no cluster claimed.
pub const OTHER_CATEGORY: &str = "other";

/// What to do when two clusters compute the same category name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Later clusters get `_2`, `_3`, ... appended.
    #[default]
    Suffix,
    /// Later clusters replace the earlier entry.
    Overwrite,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterOptions {
    pub collisions: CollisionPolicy,
}

pub fn cluster(articles: &[Article]) -> NarrativeSet {
    cluster_with(articles, &ClusterOptions::default())
}

pub fn cluster_with(articles: &[Article], options: &ClusterOptions) -> NarrativeSet {
    let keyword_sets: Vec<HashSet<String>> = articles.iter().map(|a| keywords(&a.title)).collect();
    let mut assigned = vec![false; articles.len()];
    let mut clusters: Vec<(String, Vec<Article>)> = Vec::new();

    for i in 0..articles.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut members = vec![i];
        let mut cluster_keywords = keyword_sets[i].clone();

        for j in (i + 1)..articles.len() {
            if assigned[j] {
                continue;
            }
            if !cluster_keywords.is_empty() && !keyword_sets[j].is_disjoint(&cluster_keywords) {
                members.push(j);
                cluster_keywords.extend(keyword_sets[j].iter().cloned());
                assigned[j] = true;
            }
        }

        let name = category_name(
            members.iter().map(|&m| articles[m].title.as_str()),
            clusters.len(),
        );
        debug!(category = %name, size = members.len(), "Formed cluster");
        clusters.push((name, members.into_iter().map(|m| articles[m].clone()).collect()));
    }

    // Every article seeds or joins a cluster above, so this bucket only
    // fills if the loop is ever changed to skip seeds.
    let leftovers: Vec<Article> = articles
        .iter()
        .zip(&assigned)
        .filter(|(_, used)| !**used)
        .map(|(article, _)| article.clone())
        .collect();
    if !leftovers.is_empty() {
        clusters.push((OTHER_CATEGORY.to_string(), leftovers));
    }

    let named = assign_names(clusters, options.collisions);
    let set = split(named);
    info!(
        articles = articles.len(),
        valid = set.valid_narratives.len(),
        excluded = set.excluded_narratives.len(),
        "Clustered articles into narratives"
    );
    set
}

/// Top two qualifying words across `titles`, by descending count with ties
/// going to the word seen first, joined with `_`.
fn category_name<'a>(titles: impl Iterator<Item = &'a str>, index: usize) -> String {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for title in titles {
        for word in qualifying_words(title) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // stable sort keeps first-encounter order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top: Vec<String> = ranked.into_iter().take(2).map(|(word, _)| word).collect();

    if top.is_empty() {
        format!("cluster_{}", index)
    } else {
        top.join("_")
    }
}

fn assign_names(
    clusters: Vec<(String, Vec<Article>)>,
    policy: CollisionPolicy,
) -> IndexMap<String, Vec<Article>> {
    let mut named: IndexMap<String, Vec<Article>> = IndexMap::with_capacity(clusters.len());
    for (name, members) in clusters {
        let name = match policy {
            CollisionPolicy::Overwrite => {
                if named.contains_key(&name) {
                    debug!(category = %name, "Category collision, replacing earlier cluster");
                }
                name
            }
            CollisionPolicy::Suffix => {
                let mut candidate = name.clone();
                let mut n = 2;
                while named.contains_key(&candidate) {
                    candidate = format!("{}_{}", name, n);
                    n += 1;
                }
                candidate
            }
        };
        named.insert(name, members);
    }
    named
}

fn split(named: IndexMap<String, Vec<Article>>) -> NarrativeSet {
    let mut set = NarrativeSet::default();
    for (name, members) in named {
        let mut narrative = Narrative::new(members);
        if narrative.is_valid() {
            set.valid_narratives.insert(name, narrative);
        } else {
            narrative.reason = Some(EXCLUDED_REASON.to_string());
            set.excluded_narratives.insert(name, narrative);
        }
    }
    set
}

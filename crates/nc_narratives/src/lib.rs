//! Headline keyword extraction, keyword-overlap narrative clustering and
//! scoring of a clustering against labelled headlines.

pub mod cluster;
pub mod evaluate;
pub mod keywords;

pub use cluster::{cluster, cluster_with, ClusterOptions, CollisionPolicy};
pub use evaluate::{evaluate, load_ground_truth, ClusterScores, GroundTruth};
pub use keywords::{keywords, qualifying_words};

pub mod prelude {
    pub use super::cluster::{cluster, cluster_with, ClusterOptions, CollisionPolicy};
    pub use super::evaluate::{evaluate, ClusterScores};
    pub use nc_core::{Article, Narrative, NarrativeSet};
}

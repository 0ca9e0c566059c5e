pub mod alignment;
pub mod ballot;
pub mod flow;

use serde::Serialize;

// How closely one respondent's votes match a single opinion cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAlignment {
    pub cluster: String,
    pub alignment: u8,                  // 0-100
    pub votes: usize,                   // Votes cast on this cluster's statements
    pub matching_statements: Vec<usize>, // Statement indices, in topic order
}

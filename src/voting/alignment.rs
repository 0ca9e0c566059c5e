use crate::models::{Topic, Vote, VoteResponse};
use crate::voting::ClusterAlignment;

// Weight range [0, 2] is scaled onto [0, 100]
const ALIGNMENT_SCALE: f64 = 50.0;

pub fn vote_weight(response: VoteResponse) -> u32 {
    match response {
        VoteResponse::Agree => 2,
        VoteResponse::Disagree => 0,
        // Skip is neutral and still counts toward the average
        VoteResponse::Skip => 1,
    }
}

pub fn calculate_alignments(topic: &Topic, votes: &[Vote]) -> Vec<ClusterAlignment> {
    let mut alignments: Vec<ClusterAlignment> = topic
        .expected_clusters
        .iter()
        .map(|cluster| {
            // Statements pointing at an unknown cluster never match any name here
            let matching_statements: Vec<usize> = topic
                .statements
                .iter()
                .enumerate()
                .filter(|(_, statement)| statement.expected_cluster == cluster.name)
                .map(|(index, _)| index)
                .collect();

            let cluster_votes: Vec<&Vote> = votes
                .iter()
                .filter(|vote| matching_statements.contains(&vote.statement_index))
                .collect();

            let total_weight: u32 = cluster_votes
                .iter()
                .map(|vote| vote_weight(vote.response))
                .sum();

            let alignment = if cluster_votes.is_empty() {
                0
            } else {
                let average = total_weight as f64 / cluster_votes.len() as f64;
                (average * ALIGNMENT_SCALE).round() as u8
            };

            ClusterAlignment {
                cluster: cluster.name.clone(),
                alignment,
                votes: cluster_votes.len(),
                matching_statements,
            }
        })
        .collect();

    // sort_by is stable, so ties keep the declared cluster order
    alignments.sort_by(|a, b| b.alignment.cmp(&a.alignment));
    alignments
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentLevel {
    Strong,
    Good,
    Moderate,
    Weak,
    None,
}

impl AlignmentLevel {
    pub fn from_score(alignment: u8) -> Self {
        match alignment {
            80.. => AlignmentLevel::Strong,
            60..=79 => AlignmentLevel::Good,
            40..=59 => AlignmentLevel::Moderate,
            20..=39 => AlignmentLevel::Weak,
            _ => AlignmentLevel::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlignmentLevel::Strong => "Strong Alignment",
            AlignmentLevel::Good => "Good Alignment",
            AlignmentLevel::Moderate => "Moderate Alignment",
            AlignmentLevel::Weak => "Weak Alignment",
            AlignmentLevel::None => "No Alignment",
        }
    }
}

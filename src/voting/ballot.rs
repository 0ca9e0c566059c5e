use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{ResponseTally, Vote, VoteResponse};

/// One respondent's working votes, holding at most one vote per statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VoteList(Vec<Vote>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

impl VoteList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the vote for `statement_index` in place, or appends it.
    pub fn upsert(&mut self, statement_index: usize, response: VoteResponse) -> Upsert {
        let vote = Vote {
            statement_index,
            response,
        };
        match self
            .0
            .iter_mut()
            .find(|existing| existing.statement_index == statement_index)
        {
            Some(existing) => {
                *existing = vote;
                Upsert::Replaced
            }
            None => {
                self.0.push(vote);
                Upsert::Inserted
            }
        }
    }

    pub fn get(&self, statement_index: usize) -> Option<VoteResponse> {
        self.0
            .iter()
            .find(|vote| vote.statement_index == statement_index)
            .map(|vote| vote.response)
    }

    pub fn as_slice(&self) -> &[Vote] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn tally(&self) -> ResponseTally {
        let mut tally = ResponseTally::default();
        for vote in &self.0 {
            tally.record(vote.response);
        }
        tally
    }
}

impl FromIterator<Vote> for VoteList {
    // Later votes for the same statement win, as if they had been cast in order
    fn from_iter<I: IntoIterator<Item = Vote>>(iter: I) -> Self {
        let mut list = VoteList::new();
        for vote in iter {
            list.upsert(vote.statement_index, vote.response);
        }
        list
    }
}

impl From<Vec<Vote>> for VoteList {
    fn from(votes: Vec<Vote>) -> Self {
        votes.into_iter().collect()
    }
}

impl<'de> Deserialize<'de> for VoteList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<Vote>::deserialize(deserializer).map(VoteList::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserting_new_index_appends() {
        let mut votes = VoteList::new();
        assert_eq!(votes.upsert(0, VoteResponse::Agree), Upsert::Inserted);
        assert_eq!(votes.upsert(2, VoteResponse::Skip), Upsert::Inserted);
        assert_eq!(votes.len(), 2);
        assert_eq!(votes.get(2), Some(VoteResponse::Skip));
        assert_eq!(votes.get(1), None);
    }

    #[test]
    fn replacing_keeps_length_and_position() {
        let mut votes = VoteList::new();
        votes.upsert(4, VoteResponse::Agree);
        votes.upsert(1, VoteResponse::Agree);
        votes.upsert(7, VoteResponse::Agree);

        assert_eq!(votes.upsert(1, VoteResponse::Disagree), Upsert::Replaced);
        assert_eq!(votes.len(), 3);
        let indices: Vec<usize> = votes.as_slice().iter().map(|v| v.statement_index).collect();
        assert_eq!(indices, vec![4, 1, 7]);
        assert_eq!(votes.as_slice()[1].response, VoteResponse::Disagree);
    }

    #[test]
    fn repeated_identical_vote_is_idempotent() {
        let mut once = VoteList::new();
        once.upsert(0, VoteResponse::Skip);
        once.upsert(3, VoteResponse::Agree);

        let mut twice = once.clone();
        twice.upsert(3, VoteResponse::Agree);
        assert_eq!(once, twice);
    }

    #[test]
    fn stored_duplicates_collapse_on_load() {
        let json = r#"[
            {"statementIndex": 0, "response": "agree"},
            {"statementIndex": 1, "response": "skip"},
            {"statementIndex": 0, "response": "disagree"}
        ]"#;
        let votes: VoteList = serde_json::from_str(json).unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes.get(0), Some(VoteResponse::Disagree));
        assert_eq!(votes.as_slice()[0].statement_index, 0);
    }

    #[test]
    fn tally_counts_each_response() {
        let votes: VoteList = vec![
            Vote { statement_index: 0, response: VoteResponse::Agree },
            Vote { statement_index: 1, response: VoteResponse::Agree },
            Vote { statement_index: 2, response: VoteResponse::Skip },
        ]
        .into();
        let tally = votes.tally();
        assert_eq!((tally.agree, tally.disagree, tally.skip), (2, 0, 1));
        assert_eq!(tally.total(), 3);
    }
}

use crate::models::VoteResponse;
use crate::voting::ballot::VoteList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    AwaitingName,
    Voting { position: usize },
    Complete,
}

/// What a user action did to the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    MovedTo(usize),
    Completed,
    Ignored,
}

/// Walks one respondent through a topic's statements in order.
#[derive(Debug, Clone)]
pub struct VotingFlow {
    state: FlowState,
    statement_count: usize,
    votes: VoteList,
    user_name: String,
}

impl VotingFlow {
    pub fn new(statement_count: usize) -> Self {
        Self {
            state: FlowState::AwaitingName,
            statement_count,
            votes: VoteList::new(),
            user_name: String::new(),
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn position(&self) -> Option<usize> {
        match self.state {
            FlowState::Voting { position } => Some(position),
            _ => None,
        }
    }

    pub fn statement_count(&self) -> usize {
        self.statement_count
    }

    pub fn votes(&self) -> &VoteList {
        &self.votes
    }

    pub fn into_votes(self) -> VoteList {
        self.votes
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// An empty name is accepted and means the respondent stays anonymous.
    pub fn confirm_name(&mut self, name: &str) -> Transition {
        if self.state != FlowState::AwaitingName {
            return Transition::Ignored;
        }
        self.user_name = name.trim().to_string();
        if self.statement_count == 0 {
            self.state = FlowState::Complete;
            return Transition::Completed;
        }
        self.state = FlowState::Voting { position: 0 };
        Transition::MovedTo(0)
    }

    pub fn current_vote(&self) -> Option<VoteResponse> {
        self.position().and_then(|position| self.votes.get(position))
    }

    /// Records a vote at the current position and advances, completing the
    /// flow after the last statement.
    pub fn vote(&mut self, response: VoteResponse) -> Transition {
        let Some(position) = self.position() else {
            return Transition::Ignored;
        };
        self.votes.upsert(position, response);

        if position + 1 < self.statement_count {
            self.state = FlowState::Voting {
                position: position + 1,
            };
            Transition::MovedTo(position + 1)
        } else {
            self.state = FlowState::Complete;
            Transition::Completed
        }
    }

    pub fn back(&mut self) -> Transition {
        match self.position() {
            Some(position) if position > 0 => self.move_to(position - 1),
            _ => Transition::Ignored,
        }
    }

    pub fn forward(&mut self) -> Transition {
        match self.position() {
            Some(position) if position + 1 < self.statement_count => self.move_to(position + 1),
            _ => Transition::Ignored,
        }
    }

    /// Drops every vote and starts over at the first statement.
    pub fn restart(&mut self) -> Transition {
        if self.position().is_none() {
            return Transition::Ignored;
        }
        self.votes.clear();
        self.move_to(0)
    }

    fn move_to(&mut self, position: usize) -> Transition {
        self.state = FlowState::Voting { position };
        Transition::MovedTo(position)
    }
}

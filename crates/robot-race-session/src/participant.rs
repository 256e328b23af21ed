//! A joined player and their score.

use robot_race_protocol::ParticipantId;
use serde::{Deserialize, Serialize};

/// One participant in a session.
///
/// Identity, name, and privilege are fixed when the participant joins;
/// only the score changes afterwards, and only through the owning
/// [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    id: ParticipantId,
    name: String,
    privileged: bool,
    score: u32,
}

impl Participant {
    pub(crate) fn new(name: String, privileged: bool) -> Self {
        Self {
            id: ParticipantId::new(),
            name,
            privileged,
            score: 0,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` for the first joiner, who may start and reset races.
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Adds one point and returns the new score.
    pub(crate) fn add_point(&mut self) -> u32 {
        self.score = self.score.saturating_add(1);
        self.score
    }

    pub(crate) fn clear_score(&mut self) {
        self.score = 0;
    }
}

/// A leaderboard row: a participant and their total wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub participant: Participant,
    pub win_count: u32,
}

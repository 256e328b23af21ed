//! The race session: participants, scores, and the round state machine.
//!
//! A `Session` is plain data with `&mut self` operations. It is NOT
//! thread-safe by itself; the hub owns each session behind its own lock,
//! which is what makes every operation here atomic with respect to
//! concurrent callers (two joins can't both pass the capacity check, and a
//! score racing a reset sees either the whole pre-reset or the whole
//! post-reset session).

use std::collections::HashMap;

use robot_race_protocol::{ParticipantId, SessionId};
use serde::{Deserialize, Serialize};

use crate::{LeaderboardEntry, Participant, SessionConfig, SessionError, SessionState};

/// One race and its scoreboard.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ join()* ──→ start_countdown() ──→ decrement_countdown()* ──→ score_point()*
///               ↑                                                              │
///               └──────────────────────────── reset() ←── [Finished] ←────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,

    /// The configuration the session was created with. Never changes;
    /// `reset` restores the round-scoped fields from it.
    config: SessionConfig,

    target_score: u32,
    countdown_remaining: u32,

    /// Join order is significant: it decides privilege (first joiner) and
    /// breaks ties on the leaderboard.
    participants: Vec<Participant>,

    state: SessionState,

    /// Completed-round wins per participant, carried across resets.
    win_history: HashMap<ParticipantId, u32>,
}

impl Session {
    /// Creates a session in Setup with no participants.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_id(SessionId::new(), config)
    }

    /// Creates a session with a caller-chosen identifier.
    pub fn with_id(id: SessionId, config: SessionConfig) -> Self {
        let config = config.validated();
        Self {
            id,
            config,
            target_score: config.target_score,
            countdown_remaining: config.countdown,
            participants: Vec::new(),
            state: SessionState::Setup,
            win_history: HashMap::new(),
        }
    }

    // -- Accessors ---------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target_score(&self) -> u32 {
        self.target_score
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    /// Participants in join order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    pub fn win_history(&self) -> &HashMap<ParticipantId, u32> {
        &self.win_history
    }

    /// Completed-round wins recorded for a participant (0 if none).
    pub fn wins(&self, id: ParticipantId) -> u32 {
        self.win_history.get(&id).copied().unwrap_or(0)
    }

    // -- Operations --------------------------------------------------------

    /// Adds a participant. The first successful joiner is privileged.
    ///
    /// # Errors
    /// - [`SessionError::SessionInProgress`] if the session is not in Setup.
    /// - [`SessionError::SessionFull`] if every slot is taken.
    pub fn join(&mut self, name: impl Into<String>) -> Result<&Participant, SessionError> {
        if !self.state.is_joinable() {
            return Err(SessionError::SessionInProgress(self.id));
        }
        if self.participants.len() >= self.config.max_participants {
            return Err(SessionError::SessionFull {
                session_id: self.id,
                max: self.config.max_participants,
            });
        }

        let privileged = self.participants.is_empty();
        let participant = Participant::new(name.into(), privileged);
        tracing::info!(
            session_id = %self.id,
            participant_id = %participant.id(),
            privileged,
            participants = self.participants.len() + 1,
            "participant joined"
        );
        self.participants.push(participant);

        // Non-empty: we just pushed.
        Ok(&self.participants[self.participants.len() - 1])
    }

    /// Awards one point to a participant.
    ///
    /// Returns `false` (and changes nothing) unless the race is Playing and
    /// `id` names a known participant. Reaching the target score finishes
    /// the round on this very call.
    pub fn score_point(&mut self, id: ParticipantId) -> bool {
        if self.state != SessionState::Playing {
            return false;
        }
        let Some(participant) = self.participants.iter_mut().find(|p| p.id() == id) else {
            return false;
        };

        let score = participant.add_point();
        if score >= self.target_score {
            self.state = SessionState::Finished;
            tracing::info!(
                session_id = %self.id,
                winner = %id,
                score,
                "round finished"
            );
        }
        true
    }

    /// Moves Setup → CountingDown. Returns `false` from any other state.
    pub fn start_countdown(&mut self) -> bool {
        if self.state != SessionState::Setup {
            return false;
        }
        self.state = SessionState::CountingDown;
        tracing::info!(
            session_id = %self.id,
            countdown = self.countdown_remaining,
            "countdown started"
        );
        true
    }

    /// One countdown tick. Decrements the remaining count and moves to
    /// Playing once it reaches zero.
    ///
    /// Returns the resulting state so a ticker knows when to stop. Outside
    /// CountingDown this is a no-op that just reports the current state.
    pub fn decrement_countdown(&mut self) -> SessionState {
        if self.state != SessionState::CountingDown {
            return self.state;
        }

        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining == 0 {
            self.state = SessionState::Playing;
            tracing::info!(session_id = %self.id, "race started");
        } else {
            tracing::debug!(
                session_id = %self.id,
                remaining = self.countdown_remaining,
                "countdown tick"
            );
        }
        self.state
    }

    /// The participant with the highest score. Ties go to whoever joined
    /// first; `None` only when nobody has joined.
    pub fn current_leader(&self) -> Option<&Participant> {
        let mut participants = self.participants.iter();
        let first = participants.next()?;
        Some(participants.fold(first, |leader, p| {
            if p.score() > leader.score() { p } else { leader }
        }))
    }

    /// Participants with their total wins, most wins first.
    ///
    /// A finished round counts for its leader before the reset records it,
    /// so the standings shown on the results screen already include it.
    /// Ties keep join order (`sort_by` is stable).
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let pending_winner = match self.state {
            SessionState::Finished => self.current_leader().map(Participant::id),
            _ => None,
        };

        let mut entries: Vec<LeaderboardEntry> = self
            .participants
            .iter()
            .map(|p| {
                let bonus = u32::from(pending_winner == Some(p.id()));
                LeaderboardEntry {
                    participant: p.clone(),
                    win_count: self.wins(p.id()) + bonus,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.win_count.cmp(&a.win_count));
        entries
    }

    /// Finished → Setup for another round.
    ///
    /// Credits the round's leader in the win history, zeroes every score,
    /// and restores target score and countdown length from the original
    /// config. Only meaningful once a round is over: from any other state
    /// this is a no-op returning `false`.
    pub fn reset(&mut self) -> bool {
        if self.state != SessionState::Finished {
            return false;
        }

        if let Some(winner) = self.current_leader().map(Participant::id) {
            *self.win_history.entry(winner).or_insert(0) += 1;
        }
        for participant in &mut self.participants {
            participant.clear_score();
        }
        self.target_score = self.config.target_score;
        self.countdown_remaining = self.config.countdown;
        self.state = SessionState::Setup;

        tracing::info!(session_id = %self.id, "session reset for another round");
        true
    }

    /// `true` iff `id` is the session's privileged (first) participant.
    pub fn is_privileged(&self, id: ParticipantId) -> bool {
        self.participant(id).is_some_and(Participant::is_privileged)
    }

    // -- Snapshots ---------------------------------------------------------

    /// Captures the full current state for broadcast or caching.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            target_score: self.target_score,
            max_participants: self.config.max_participants,
            countdown_remaining: self.countdown_remaining,
            participants: self.participants.clone(),
            state: self.state,
            win_history: self.win_history.clone(),
            config: self.config,
        }
    }

    /// Rebuilds a session from a snapshot, e.g. one read back from the
    /// replication cache by an instance that has never seen it.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            id: snapshot.id,
            config: snapshot.config,
            target_score: snapshot.target_score,
            countdown_remaining: snapshot.countdown_remaining,
            participants: snapshot.participants,
            state: snapshot.state,
            win_history: snapshot.win_history,
        }
    }
}

/// The full serialized state of a session. Sent to clients on every
/// update and stored in the replication cache; never a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub target_score: u32,
    pub max_participants: usize,
    pub countdown_remaining: u32,
    pub participants: Vec<Participant>,
    pub state: SessionState,
    pub win_history: HashMap<ParticipantId, u32>,
    /// Original configuration, so a rehydrated session resets correctly.
    pub config: SessionConfig,
}

// =========================================================================
// Tests
// =========================================================================

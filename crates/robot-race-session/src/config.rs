//! Session configuration and state machine states.

use robot_race_protocol::SessionOverrides;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for one session, fixed at creation.
///
/// A session keeps the config it was created with for its whole life and
/// restores the round-scoped values (target score, countdown length) from
/// it on every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Score a participant must reach to win the round.
    pub target_score: u32,

    /// Minimum participants expected for a race. Informational: the
    /// privileged participant decides when to start.
    pub min_participants: usize,

    /// Maximum participants allowed to join.
    pub max_participants: usize,

    /// Countdown length in ticks (one tick per second by default).
    pub countdown: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_score: 25,
            min_participants: 2,
            max_participants: 10,
            countdown: 3,
        }
    }
}

impl SessionConfig {
    /// Returns a copy with any client-supplied overrides applied on top.
    pub fn with_overrides(self, overrides: &SessionOverrides) -> Self {
        Self {
            target_score: overrides.target_score.unwrap_or(self.target_score),
            max_participants: overrides
                .max_participants
                .unwrap_or(self.max_participants),
            countdown: overrides.countdown.unwrap_or(self.countdown),
            ..self
        }
        .validated()
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Rules:
    /// - `target_score` is at least 1 (a target of 0 would be won before
    ///   anyone scored).
    /// - `max_participants` is at least 1.
    /// - `min_participants` is forced into `1..=max_participants`.
    pub fn validated(mut self) -> Self {
        if self.target_score == 0 {
            tracing::warn!("target_score of 0 is not playable, using 1");
            self.target_score = 1;
        }
        if self.max_participants == 0 {
            tracing::warn!("max_participants of 0 is not playable, using 1");
            self.max_participants = 1;
        }
        self.min_participants = self.min_participants.clamp(1, self.max_participants);
        self
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
/// Setup ──start──→ CountingDown ──(reaches 0)──→ Playing ──(target hit)──→ Finished
///   ↑                                                                          │
///   └──────────────────────────────── reset ───────────────────────────────────┘
/// ```
///
/// There is no terminal state: a finished race goes back to Setup on
/// reset, keeping its participants and win history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Setup,
    CountingDown,
    Playing,
    Finished,
}

impl SessionState {
    /// Returns `true` if the session accepts new participants.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Setup)
    }

    /// The wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::CountingDown => "counting_down",
            Self::Playing => "playing",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

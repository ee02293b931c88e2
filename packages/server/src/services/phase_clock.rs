use std::time::Duration;
use tokio::time::Instant;

use crate::error::GameError;
use crate::models::game::Phase;

/// Owns the phase, the round counter and the deadline of the running phase.
///
/// `round` counts Night/Day pairs: Night 1, Day 1, Night 2, ... while `transition`
/// increases on every phase change. Deadlines are checked, never awaited, so a
/// session with no pending input still advances when the scheduler looks at it.
#[derive(Debug, Clone)]
pub struct PhaseClock {
    phase: Phase,
    round: u32,
    transition: u32,
    deadline: Option<Instant>,
    round_timeout: Duration,
}

impl PhaseClock {
    pub fn new(round_timeout: Duration) -> Self {
        Self {
            phase: Phase::Lobby,
            round: 0,
            transition: 0,
            deadline: None,
            round_timeout,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn transition(&self) -> u32 {
        self.transition
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn round_timeout(&self) -> Duration {
        self.round_timeout
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.phase, Phase::Night | Phase::Day)
            && self.deadline.map(|d| now >= d).unwrap_or(false)
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Whether moving to `to` is a legal transition. Changes nothing.
    pub fn check(&self, to: Phase) -> Result<(), GameError> {
        match (self.phase, to) {
            (Phase::Lobby, Phase::Night)
            | (Phase::Night, Phase::Day)
            | (Phase::Day, Phase::Night)
            | (Phase::Night, Phase::Ended)
            | (Phase::Day, Phase::Ended) => Ok(()),
            (from, to) => Err(GameError::IllegalTransition { from, to }),
        }
    }

    /// Moves to `to`, returning the phase left behind.
    pub fn advance(&mut self, to: Phase, now: Instant) -> Result<Phase, GameError> {
        self.check(to)?;
        Ok(self.apply(to, now))
    }

    /// Moves to `to` without checking; callers have run `check` first.
    pub(crate) fn apply(&mut self, to: Phase, now: Instant) -> Phase {
        let from = self.phase;
        match (from, to) {
            (Phase::Lobby, Phase::Night) => self.round = 1,
            (Phase::Day, Phase::Night) => self.round += 1,
            _ => {}
        }

        self.phase = to;
        self.transition += 1;
        self.deadline = match to {
            Phase::Night | Phase::Day => Some(now + self.round_timeout),
            _ => None,
        };
        from
    }
}

use std::collections::{BTreeMap, HashSet};

use crate::error::GameError;
use crate::models::game::{GameSession, Phase, Vote};
use crate::models::player::PlayerId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteOutcome {
    pub tally: BTreeMap<PlayerId, usize>,
    /// `None` on a tie for first place or when nobody voted.
    pub eliminated: Option<PlayerId>,
}

pub fn validate(session: &GameSession, vote: &Vote) -> Result<(), GameError> {
    if session.phase() != Phase::Day {
        return Err(GameError::WrongPhase(session.phase()));
    }
    let voter = session.player(&vote.voter)?;
    if !voter.alive {
        return Err(GameError::ActorDead(vote.voter.clone()));
    }
    if vote.voter == vote.target {
        return Err(GameError::SelfVote);
    }
    if !session.is_alive(&vote.target) {
        return Err(GameError::InvalidTarget(vote.target.clone()));
    }
    Ok(())
}

/// Strict plurality among votes cast by, and for, living players.
pub fn tally<'a>(votes: impl IntoIterator<Item = &'a Vote>, living: &HashSet<PlayerId>) -> VoteOutcome {
    let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
    for vote in votes {
        if vote.voter == vote.target
            || !living.contains(&vote.voter)
            || !living.contains(&vote.target)
        {
            continue;
        }
        *counts.entry(vote.target.clone()).or_default() += 1;
    }

    let top = counts.values().copied().max().unwrap_or(0);
    let mut leaders = counts.iter().filter(|(_, c)| **c == top).map(|(id, _)| id);
    let eliminated = match (leaders.next(), leaders.next()) {
        (Some(only), None) if top > 0 => Some(only.clone()),
        _ => None,
    };

    VoteOutcome {
        tally: counts,
        eliminated,
    }
}

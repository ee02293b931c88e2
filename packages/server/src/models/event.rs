use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::game::Phase;
use super::player::PlayerId;
use super::role::{Role, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationCause {
    /// Any death resolved at the end of a night; kill, poison and retaliation share it.
    Night,
    Vote,
    Retaliation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    SessionCreated {
        dealer_commitment: String,
    },
    PlayerJoined {
        player: PlayerId,
    },
    RolesAssigned {
        player_count: usize,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    NightResolved {
        deaths: Vec<PlayerId>,
    },
    VoteResolved {
        tally: BTreeMap<PlayerId, usize>,
        eliminated: Option<PlayerId>,
    },
    PlayerEliminated {
        player: PlayerId,
        cause: EliminationCause,
    },
    RoleRevealed {
        player: PlayerId,
        role: Role,
    },
    GameEnded {
        winner: Team,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub seq: u64,
    pub round: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Append-only, gap-free event sequence for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, round: u32, kind: EventKind) -> GameEvent {
        let event = GameEvent {
            seq: self.events.len() as u64,
            round,
            timestamp: Utc::now(),
            kind,
        };
        self.events.push(event.clone());
        event
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn since(&self, seq: u64) -> &[GameEvent] {
        let start = (seq as usize).min(self.events.len());
        &self.events[start..]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers_are_gap_free() {
        let mut log = EventLog::new();
        log.append(0, EventKind::PlayerJoined { player: "a".to_string() });
        log.append(0, EventKind::PlayerJoined { player: "b".to_string() });
        let last = log.append(1, EventKind::NightResolved { deaths: vec![] });

        assert_eq!(last.seq, 2);
        let seqs: Vec<u64> = log.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(log.since(1).len(), 2);
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn test_event_serializes_flat() {
        let mut log = EventLog::new();
        let event = log.append(
            2,
            EventKind::PlayerEliminated {
                player: "p3".to_string(),
                cause: EliminationCause::Vote,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "player_eliminated");
        assert_eq!(json["player"], "p3");
        assert_eq!(json["round"], 2);
    }
}

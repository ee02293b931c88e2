use role_vault::{ConcealedHandle, SealedEnvelope};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::event::{EventKind, EventLog, GameEvent};
use super::player::{Player, PlayerId, PlayerSummary};
use super::role::{ActionKind, Team};
use super::rule::GameConfig;
use crate::error::GameError;
use crate::services::phase_clock::PhaseClock;

pub type SessionId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Lobby,
    Night,
    Day,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightAction {
    pub actor: PlayerId,
    pub kind: ActionKind,
    pub target: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: PlayerId,
    pub target: PlayerId,
}

/// An investigation result only the seer can open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateResult {
    pub round: u32,
    pub target: PlayerId,
    pub sealed_role: SealedEnvelope,
}

/// The aggregate root. Only `SessionManager` holds one, behind a lock.
pub struct GameSession {
    pub id: SessionId,
    pub config: GameConfig,
    pub players: Vec<Player>,
    pub clock: PhaseClock,
    pub winner: Option<Team>,
    /// Current night, one slot per actor.
    pub night_actions: HashMap<PlayerId, NightAction>,
    /// Current day, one slot per voter.
    pub votes: HashMap<PlayerId, Vote>,
    /// Hunter designations that stay armed until the round closes.
    pub retaliations: HashMap<PlayerId, PlayerId>,
    pub private_results: HashMap<PlayerId, Vec<PrivateResult>>,
    pub dealer_nonce: Option<[u8; 32]>,
    pub dealer_commitment: String,
    pub roles_assigned: bool,
    pub log: EventLog,
    events_tx: broadcast::Sender<GameEvent>,
}

impl GameSession {
    pub fn new(
        id: SessionId,
        config: GameConfig,
        clock: PhaseClock,
        dealer_nonce: [u8; 32],
        dealer_commitment: String,
        events_tx: broadcast::Sender<GameEvent>,
    ) -> Self {
        Self {
            id,
            config,
            players: Vec::new(),
            clock,
            winner: None,
            night_actions: HashMap::new(),
            votes: HashMap::new(),
            retaliations: HashMap::new(),
            private_results: HashMap::new(),
            dealer_nonce: Some(dealer_nonce),
            dealer_commitment,
            roles_assigned: false,
            log: EventLog::new(),
            events_tx,
        }
    }

    pub fn phase(&self) -> Phase {
        self.clock.phase()
    }

    /// Appends to the log and publishes to live subscribers.
    pub fn emit(&mut self, kind: EventKind) {
        let event = self.log.append(self.clock.round(), kind);
        // No subscribers is fine; the log is the record.
        let _ = self.events_tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events_tx.subscribe()
    }

    pub fn index_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn player(&self, player_id: &str) -> Result<&Player, GameError> {
        self.players
            .iter()
            .find(|p| p.id == player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.to_string()))
    }

    pub fn player_mut(&mut self, player_id: &str) -> Result<&mut Player, GameError> {
        self.players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.to_string()))
    }

    pub fn is_alive(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id && p.alive)
    }

    pub fn living(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    pub fn living_handles(&self) -> Vec<ConcealedHandle> {
        self.living().filter_map(|p| p.handle.clone()).collect()
    }

    /// Player ids in join order paired with their `alive` flag.
    pub fn roster(&self) -> Vec<(PlayerId, bool)> {
        self.players.iter().map(|p| (p.id.clone(), p.alive)).collect()
    }

    pub fn handle_of(&self, player_id: &str) -> Result<ConcealedHandle, GameError> {
        self.player(player_id)?
            .handle
            .clone()
            .ok_or(GameError::WrongPhase(self.phase()))
    }

    pub fn snapshot(&self, now: Instant) -> GameStateView {
        let roster: Vec<PlayerSummary> = self.players.iter().map(Player::summary).collect();
        GameStateView {
            session_id: self.id.clone(),
            phase: self.phase(),
            round: self.clock.round(),
            transition: self.clock.transition(),
            seconds_remaining: self.clock.remaining(now).map(|d| d.as_secs()),
            living: roster.iter().filter(|p| p.alive).map(|p| p.id.clone()).collect(),
            eliminated: roster.iter().filter(|p| !p.alive).map(|p| p.id.clone()).collect(),
            roster,
            winner: self.winner,
            config: self.config.clone(),
            dealer_commitment: self.dealer_commitment.clone(),
            event_count: self.log.len(),
        }
    }
}

/// Public session state. Carries no concealed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateView {
    pub session_id: SessionId,
    pub phase: Phase,
    pub round: u32,
    pub transition: u32,
    pub seconds_remaining: Option<u64>,
    pub roster: Vec<PlayerSummary>,
    pub living: Vec<PlayerId>,
    pub eliminated: Vec<PlayerId>,
    pub winner: Option<Team>,
    pub config: GameConfig,
    pub dealer_commitment: String,
    pub event_count: usize,
}

use role_vault::{ConfidentialValueAdapter, RevealProof, SealedEnvelope};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::GameError;
use crate::models::event::{EliminationCause, EventKind, GameEvent};
use crate::models::game::{
    GameSession, GameStateView, NightAction, Phase, PrivateResult, SessionId, Vote,
};
use crate::models::player::{Player, PlayerId};
use crate::models::role::{ActionKind, Role, Team};
use crate::models::rule::GameConfig;
use crate::services::{action_resolver, role_assigner, vote_tally, win_evaluator};
use crate::services::phase_clock::PhaseClock;

type SessionCell = Arc<RwLock<GameSession>>;

/// Owns every session and serializes writes per session.
///
/// Each session sits behind its own lock, so sessions never contend with each other.
/// Reads take the read side and see a whole transition or none of it.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, SessionCell>>,
    adapter: Arc<dyn ConfidentialValueAdapter>,
    round_timeout: Duration,
    event_channel_capacity: usize,
}

impl SessionManager {
    pub fn new(
        adapter: Arc<dyn ConfidentialValueAdapter>,
        round_timeout: Duration,
        event_channel_capacity: usize,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            adapter,
            round_timeout,
            event_channel_capacity: event_channel_capacity.max(1),
        }
    }

    async fn cell(&self, session_id: &str) -> Result<SessionCell, GameError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))
    }

    pub async fn create_session(&self, config: GameConfig) -> Result<SessionId, GameError> {
        config.validate()?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let nonce = role_assigner::new_dealer_nonce();
        let commitment = role_assigner::dealer_commitment(&nonce);
        let (tx, _) = broadcast::channel(self.event_channel_capacity);

        let mut session = GameSession::new(
            session_id.clone(),
            config,
            PhaseClock::new(self.round_timeout),
            nonce,
            commitment.clone(),
            tx,
        );
        session.emit(EventKind::SessionCreated {
            dealer_commitment: commitment,
        });

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(RwLock::new(session)));
        info!("Created session {}", session_id);
        Ok(session_id)
    }

    pub async fn join(&self, session_id: &str, player_id: &str) -> Result<(), GameError> {
        self.join_with_entropy(session_id, player_id, None).await
    }

    /// Adds a player; the last seat triggers role assignment and the first night.
    pub async fn join_with_entropy(
        &self,
        session_id: &str,
        player_id: &str,
        entropy: Option<[u8; 32]>,
    ) -> Result<(), GameError> {
        let cell = self.cell(session_id).await?;
        let mut session = cell.write().await;

        if session.index_of(player_id).is_some() {
            return Err(GameError::AlreadyJoined(player_id.to_string()));
        }
        if session.players.len() >= session.config.player_count {
            return Err(GameError::SessionFull);
        }
        if session.phase() != Phase::Lobby {
            return Err(GameError::SessionNotInLobby);
        }

        session.players.push(Player::new(player_id.to_string(), entropy));

        if session.players.len() == session.config.player_count {
            if let Err(e) = role_assigner::assign(&mut session, self.adapter.as_ref()).await {
                session.players.pop();
                warn!("Role assignment failed in session {}: {}", session_id, e);
                return Err(e);
            }
            session.emit(EventKind::PlayerJoined {
                player: player_id.to_string(),
            });
            let player_count = session.players.len();
            session.emit(EventKind::RolesAssigned { player_count });
            self.enter(&mut session, Phase::Night, Instant::now());
        } else {
            session.emit(EventKind::PlayerJoined {
                player: player_id.to_string(),
            });
        }

        debug!("Player {} joined session {}", player_id, session_id);
        Ok(())
    }

    pub async fn submit_night_action(
        &self,
        session_id: &str,
        player_id: &str,
        kind: ActionKind,
        target: &str,
    ) -> Result<(), GameError> {
        let cell = self.cell(session_id).await?;
        let mut session = cell.write().await;
        self.catch_up(&mut session, Instant::now()).await?;

        let action = NightAction {
            actor: player_id.to_string(),
            kind,
            target: target.to_string(),
        };
        action_resolver::validate(&session, self.adapter.as_ref(), &action).await?;
        let eligible = action_resolver::eligible_actor_count(&session, self.adapter.as_ref()).await?;

        // Resubmitting replaces the actor's earlier action.
        let previous = session.night_actions.insert(player_id.to_string(), action);
        debug!("Accepted {:?} from {} in session {}", kind, player_id, session_id);

        if session.night_actions.len() >= eligible {
            if let Err(e) = self.close_night(&mut session, Instant::now()).await {
                match previous {
                    Some(previous) => session.night_actions.insert(player_id.to_string(), previous),
                    None => session.night_actions.remove(player_id),
                };
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn submit_vote(
        &self,
        session_id: &str,
        player_id: &str,
        target: &str,
    ) -> Result<(), GameError> {
        let cell = self.cell(session_id).await?;
        let mut session = cell.write().await;
        self.catch_up(&mut session, Instant::now()).await?;

        let vote = Vote {
            voter: player_id.to_string(),
            target: target.to_string(),
        };
        vote_tally::validate(&session, &vote)?;
        let previous = session.votes.insert(player_id.to_string(), vote);
        debug!("Accepted vote from {} in session {}", player_id, session_id);

        if session.votes.len() >= session.living().count() {
            if let Err(e) = self.close_day(&mut session, Instant::now()).await {
                match previous {
                    Some(previous) => session.votes.insert(player_id.to_string(), previous),
                    None => session.votes.remove(player_id),
                };
                return Err(e);
            }
        }
        Ok(())
    }

    /// Verifies a role claim. The adapter call runs without the session lock held.
    pub async fn reveal_role(
        &self,
        session_id: &str,
        player_id: &str,
        claimed: Role,
        proof: &RevealProof,
    ) -> Result<Role, GameError> {
        let cell = self.cell(session_id).await?;

        let handle = {
            let session = cell.read().await;
            if session.player(player_id)?.is_revealed() {
                return Err(GameError::AlreadyRevealed(player_id.to_string()));
            }
            session.handle_of(player_id)?
        };

        let plaintext = match self
            .adapter
            .verify_and_decrypt(&handle, &claimed.encode(), proof)
            .await
        {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!("Rejected reveal by {} in session {}: {}", player_id, session_id, e);
                return Err(e.into());
            }
        };
        let role = Role::decode(&plaintext).ok_or(GameError::InvalidRole)?;

        let mut session = cell.write().await;
        let player = session.player_mut(player_id)?;
        if player.is_revealed() {
            return Err(GameError::AlreadyRevealed(player_id.to_string()));
        }
        player.revealed = Some(role);
        session.emit(EventKind::RoleRevealed {
            player: player_id.to_string(),
            role,
        });
        info!("Player {} revealed as {} in session {}", player_id, role, session_id);
        Ok(role)
    }

    pub async fn get_state(&self, session_id: &str) -> Result<GameStateView, GameError> {
        let cell = self.cell(session_id).await?;
        let session = cell.read().await;
        Ok(session.snapshot(Instant::now()))
    }

    pub async fn list_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn events(&self, session_id: &str, since: u64) -> Result<Vec<GameEvent>, GameError> {
        let cell = self.cell(session_id).await?;
        let session = cell.read().await;
        Ok(session.log.since(since).to_vec())
    }

    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<broadcast::Receiver<GameEvent>, GameError> {
        let cell = self.cell(session_id).await?;
        let session = cell.read().await;
        Ok(session.subscribe())
    }

    /// The player's own role opening, sealed to their key.
    pub async fn role_envelope(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<SealedEnvelope, GameError> {
        let cell = self.cell(session_id).await?;
        let session = cell.read().await;
        Ok(session.handle_of(player_id)?.envelope)
    }

    pub async fn private_results(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<Vec<PrivateResult>, GameError> {
        let cell = self.cell(session_id).await?;
        let session = cell.read().await;
        session.player(player_id)?;
        Ok(session
            .private_results
            .get(player_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Drops an ended session and releases its concealed roles.
    ///
    /// Sessions stay registered after the game ends so players can still reveal;
    /// this is the only way one leaves the registry.
    pub async fn remove_session(&self, session_id: &str) -> Result<(), GameError> {
        let mut sessions = self.sessions.write().await;
        let handles = {
            let cell = sessions
                .get(session_id)
                .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;
            let session = cell.read().await;
            if session.phase() != Phase::Ended {
                return Err(GameError::WrongPhase(session.phase()));
            }
            session
                .players
                .iter()
                .filter_map(|p| p.handle.clone())
                .collect::<Vec<_>>()
        };
        self.adapter.release(&handles).await?;
        sessions.remove(session_id);
        info!("Removed session {}", session_id);
        Ok(())
    }

    /// Forces every session whose deadline has passed through its transition.
    ///
    /// Returns how many sessions advanced.
    pub async fn expire_deadlines(&self) -> usize {
        let cells: Vec<(SessionId, SessionCell)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, cell)| (id.clone(), cell.clone()))
            .collect();

        let mut advanced = 0;
        for (session_id, cell) in cells {
            let mut session = cell.write().await;
            match self.catch_up(&mut session, Instant::now()).await {
                Ok(true) => advanced += 1,
                Ok(false) => {}
                Err(e) => warn!("Forced transition failed in session {}: {}", session_id, e),
            }
        }
        advanced
    }

    /// Closes the running phase if its deadline has passed, with whatever was submitted.
    async fn catch_up(&self, session: &mut GameSession, now: Instant) -> Result<bool, GameError> {
        if !session.clock.is_expired(now) {
            return Ok(false);
        }
        info!(
            "Deadline elapsed for {:?} in session {}",
            session.phase(),
            session.id
        );
        match session.phase() {
            Phase::Night => self.close_night(session, now).await?,
            Phase::Day => self.close_day(session, now).await?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Applies a transition already accepted by `PhaseClock::check`.
    fn enter(&self, session: &mut GameSession, to: Phase, now: Instant) {
        let from = session.clock.apply(to, now);
        match to {
            Phase::Night => {
                session.night_actions.clear();
                session.votes.clear();
                session.retaliations.clear();
            }
            Phase::Day => session.votes.clear(),
            _ => {}
        }
        session.emit(EventKind::PhaseChanged { from, to });
        info!(
            "Session {} entered {:?} (round {})",
            session.id,
            to,
            session.clock.round()
        );
    }

    /// Resolves the night in full or not at all.
    ///
    /// Sealing, the win check and the transition check all run first; nothing
    /// after the first write can fail.
    async fn close_night(&self, session: &mut GameSession, now: Instant) -> Result<(), GameError> {
        let actions: Vec<NightAction> = session.night_actions.values().cloned().collect();
        let outcome = action_resolver::resolve(&session.roster(), &actions);

        let mut sealed = Vec::with_capacity(outcome.investigations.len());
        for (seer, target) in &outcome.investigations {
            let handle = session.handle_of(target)?;
            let envelope = self.adapter.seal_for(&handle, seer).await?;
            sealed.push((seer.clone(), target.clone(), envelope));
        }

        let winner =
            win_evaluator::check_after(session, self.adapter.as_ref(), &outcome.deaths).await?;
        session.clock.check(next_phase(winner, Phase::Day))?;

        let round = session.clock.round();
        for (seer, target, sealed_role) in sealed {
            session
                .private_results
                .entry(seer)
                .or_default()
                .push(PrivateResult {
                    round,
                    target,
                    sealed_role,
                });
        }

        session.retaliations = outcome.retaliations;
        session.night_actions.clear();
        mark_dead(session, &outcome.deaths);
        session.emit(EventKind::NightResolved {
            deaths: outcome.deaths.clone(),
        });
        for dead in &outcome.deaths {
            session.emit(EventKind::PlayerEliminated {
                player: dead.clone(),
                cause: EliminationCause::Night,
            });
        }

        match winner {
            Some(winner) => self.finish(session, winner, now),
            None => self.enter(session, Phase::Day, now),
        }
        Ok(())
    }

    /// Resolves the day in full or not at all, like `close_night`.
    async fn close_day(&self, session: &mut GameSession, now: Instant) -> Result<(), GameError> {
        let living: HashSet<PlayerId> = session.living().map(|p| p.id.clone()).collect();
        let outcome = vote_tally::tally(session.votes.values(), &living);

        // The voted-out player first, then whoever their retaliation takes along.
        let mut dying: Vec<PlayerId> = Vec::new();
        if let Some(target) = &outcome.eliminated {
            dying.push(target.clone());
            dying.extend(action_resolver::chain_retaliations(
                &session.retaliations,
                vec![target.clone()],
                |id| session.is_alive(id),
            ));
        }

        let winner = win_evaluator::check_after(session, self.adapter.as_ref(), &dying).await?;
        session.clock.check(next_phase(winner, Phase::Night))?;

        session.emit(EventKind::VoteResolved {
            tally: outcome.tally,
            eliminated: outcome.eliminated,
        });
        mark_dead(session, &dying);
        for (i, victim) in dying.into_iter().enumerate() {
            let cause = if i == 0 {
                EliminationCause::Vote
            } else {
                EliminationCause::Retaliation
            };
            session.emit(EventKind::PlayerEliminated {
                player: victim,
                cause,
            });
        }
        session.votes.clear();

        match winner {
            Some(winner) => self.finish(session, winner, now),
            None => self.enter(session, Phase::Night, now),
        }
        Ok(())
    }

    fn finish(&self, session: &mut GameSession, winner: Team, now: Instant) {
        self.enter(session, Phase::Ended, now);
        session.winner = Some(winner);
        session.emit(EventKind::GameEnded { winner });
        info!("Session {} ended: {:?} win", session.id, winner);
    }
}

fn next_phase(winner: Option<Team>, otherwise: Phase) -> Phase {
    if winner.is_some() {
        Phase::Ended
    } else {
        otherwise
    }
}

fn mark_dead(session: &mut GameSession, dying: &[PlayerId]) {
    for player in session.players.iter_mut() {
        if dying.contains(&player.id) {
            player.alive = false;
        }
    }
}

/// Periodically forces expired phases forward.
pub fn spawn_deadline_scheduler(manager: Arc<SessionManager>, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let advanced = manager.expire_deadlines().await;
            if advanced > 0 {
                debug!("Scheduler advanced {} session(s)", advanced);
            }
        }
    })
}

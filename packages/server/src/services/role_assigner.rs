use rand::{rngs::StdRng, seq::SliceRandom, RngCore, SeedableRng};
use role_vault::ConfidentialValueAdapter;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::GameError;
use crate::models::game::GameSession;
use crate::models::player::Player;
use crate::models::role::Role;
use crate::models::rule::GameConfig;

const DEALER_DOMAIN: &[u8] = b"WEREWOLF_DEALER_NONCE_V1";
const SEED_DOMAIN: &[u8] = b"WEREWOLF_ROLE_SEED_V1";

pub fn new_dealer_nonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Published at session creation so the dealer cannot re-pick its nonce later.
pub fn dealer_commitment(nonce: &[u8; 32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(DEALER_DOMAIN);
    hasher.update(nonce);
    hex::encode(hasher.finalize())
}

/// Shuffle seed mixing the dealer nonce with every player's contribution, in join order.
pub fn derive_seed(dealer_nonce: &[u8; 32], session_id: &str, players: &[Player]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SEED_DOMAIN);
    hasher.update(dealer_nonce);
    hasher.update((session_id.len() as u64).to_le_bytes());
    hasher.update(session_id.as_bytes());
    for player in players {
        hasher.update((player.id.len() as u64).to_le_bytes());
        hasher.update(player.id.as_bytes());
        hasher.update(player.entropy);
    }
    hasher.finalize().into()
}

/// Role tokens permuted by `seed`; index i belongs to the i-th joined player.
pub fn deal(config: &GameConfig, seed: [u8; 32]) -> Vec<Role> {
    let mut tokens = config.role_tokens();
    let mut rng = StdRng::from_seed(seed);
    tokens.shuffle(&mut rng);
    tokens
}

/// Commits one concealed role per player. The permutation does not outlive this call.
///
/// Nothing on the session changes unless every commit succeeds.
pub async fn assign(
    session: &mut GameSession,
    adapter: &dyn ConfidentialValueAdapter,
) -> Result<(), GameError> {
    if session.roles_assigned {
        return Err(GameError::AssignmentAlreadyDone);
    }
    let nonce = session.dealer_nonce.ok_or(GameError::AssignmentAlreadyDone)?;
    if session.players.len() != session.config.player_count {
        return Err(GameError::InvalidConfig(format!(
            "roster has {} of {} players",
            session.players.len(),
            session.config.player_count
        )));
    }

    let seed = derive_seed(&nonce, &session.id, &session.players);
    let tokens = deal(&session.config, seed);

    let mut handles = Vec::with_capacity(tokens.len());
    for (player, role) in session.players.iter().zip(tokens.iter()) {
        handles.push(adapter.commit(&player.id, &role.encode()).await?);
    }
    drop(tokens);

    for (player, handle) in session.players.iter_mut().zip(handles) {
        player.handle = Some(handle);
    }
    session.dealer_nonce = None;
    session.roles_assigned = true;

    info!(
        "Assigned {} concealed roles in session {}",
        session.players.len(),
        session.id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::Phase;
    use crate::services::phase_clock::PhaseClock;
    use role_vault::{Opening, RecipientKeys, RevealProof, RoleVault};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn config() -> GameConfig {
        GameConfig {
            player_count: 7,
            werewolf_count: 2,
            seer_count: 1,
            witch_count: 1,
            hunter_count: 0,
            guard_count: 1,
        }
    }

    fn session(config: GameConfig) -> GameSession {
        let nonce = [9u8; 32];
        let (tx, _) = broadcast::channel(16);
        let mut session = GameSession::new(
            "s1".to_string(),
            config.clone(),
            PhaseClock::new(Duration::from_secs(30)),
            nonce,
            dealer_commitment(&nonce),
            tx,
        );
        for i in 0..config.player_count {
            session.players.push(Player::new(format!("p{}", i), None));
        }
        session
    }

    async fn vault_for(session: &GameSession) -> (RoleVault, HashMap<String, RecipientKeys>) {
        let vault = RoleVault::new();
        let mut keys = HashMap::new();
        for p in &session.players {
            let k = RecipientKeys::generate();
            vault.register_recipient(&p.id, &k.public_key).await.unwrap();
            keys.insert(p.id.clone(), k);
        }
        (vault, keys)
    }

    #[test]
    fn test_deal_is_a_permutation_of_the_config() {
        let config = config();
        let dealt = deal(&config, [1u8; 32]);
        let mut sorted = dealt.clone();
        sorted.sort();
        let mut expected = config.role_tokens();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_deal_depends_only_on_seed() {
        let config = config();
        assert_eq!(deal(&config, [1u8; 32]), deal(&config, [1u8; 32]));
    }

    #[test]
    fn test_seed_depends_on_every_contribution() {
        let session = session(config());
        let base = derive_seed(&[0u8; 32], "s1", &session.players);

        let mut players = session.players.clone();
        players[6].entropy = [1u8; 32];
        assert_ne!(base, derive_seed(&[0u8; 32], "s1", &players));
        assert_ne!(base, derive_seed(&[1u8; 32], "s1", &session.players));
        assert_ne!(base, derive_seed(&[0u8; 32], "s2", &session.players));
    }

    #[tokio::test]
    async fn test_assignment_is_a_bijection_once_revealed() {
        let mut session = session(config());
        let (vault, keys) = vault_for(&session).await;

        assign(&mut session, &vault).await.unwrap();
        assert!(session.dealer_nonce.is_none());
        assert_eq!(session.phase(), Phase::Lobby);

        let mut revealed = Vec::new();
        for p in &session.players {
            let handle = p.handle.clone().unwrap();
            let opening: Opening = keys[&p.id].open(&handle.envelope).unwrap();
            let bytes = vault
                .verify_and_decrypt(&handle, &opening.plaintext, &RevealProof::from(&opening))
                .await
                .unwrap();
            revealed.push(Role::decode(&bytes).unwrap());
        }
        revealed.sort();
        let mut expected = config().role_tokens();
        expected.sort();
        assert_eq!(revealed, expected);
    }

    #[tokio::test]
    async fn test_second_assignment_fails() {
        let mut session = session(config());
        let (vault, _) = vault_for(&session).await;
        assign(&mut session, &vault).await.unwrap();
        assert_eq!(
            assign(&mut session, &vault).await,
            Err(GameError::AssignmentAlreadyDone)
        );
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_session_untouched() {
        let mut session = session(config());
        let vault = RoleVault::new();
        let result = assign(&mut session, &vault).await;
        assert!(matches!(result, Err(GameError::Adapter(_))));
        assert!(!session.roles_assigned);
        assert!(session.dealer_nonce.is_some());
        assert!(session.players.iter().all(|p| p.handle.is_none()));
    }
}

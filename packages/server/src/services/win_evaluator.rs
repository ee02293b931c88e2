use role_vault::{ConcealedHandle, ConfidentialValueAdapter};

use crate::error::GameError;
use crate::models::game::GameSession;
use crate::models::player::PlayerId;
use crate::models::role::{Role, Team};

/// Living population split by team. Only the aggregate ever leaves the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamCounts {
    pub werewolves: usize,
    pub others: usize,
}

pub fn evaluate(counts: TeamCounts) -> Option<Team> {
    if counts.werewolves == 0 {
        Some(Team::Villagers)
    } else if counts.werewolves >= counts.others {
        Some(Team::Werewolves)
    } else {
        None
    }
}

/// Counts as they will stand once `dying` are dead. Reads the session only.
pub async fn team_counts_without(
    session: &GameSession,
    adapter: &dyn ConfidentialValueAdapter,
    dying: &[PlayerId],
) -> Result<TeamCounts, GameError> {
    let handles: Vec<ConcealedHandle> = session
        .living()
        .filter(|p| !dying.contains(&p.id))
        .filter_map(|p| p.handle.clone())
        .collect();
    let werewolves = adapter
        .count_matching(&handles, &[Role::Werewolf.encode()])
        .await?;
    Ok(TeamCounts {
        werewolves,
        others: handles.len() - werewolves,
    })
}

/// Winner once `dying` are dead; `None` without asking the adapter when nobody dies.
pub async fn check_after(
    session: &GameSession,
    adapter: &dyn ConfidentialValueAdapter,
    dying: &[PlayerId],
) -> Result<Option<Team>, GameError> {
    if dying.is_empty() {
        return Ok(None);
    }
    Ok(evaluate(team_counts_without(session, adapter, dying).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(werewolves: usize, others: usize) -> TeamCounts {
        TeamCounts { werewolves, others }
    }

    #[test]
    fn test_no_werewolves_is_villager_win() {
        assert_eq!(evaluate(counts(0, 3)), Some(Team::Villagers));
        assert_eq!(evaluate(counts(0, 0)), Some(Team::Villagers));
    }

    #[test]
    fn test_parity_is_werewolf_win() {
        assert_eq!(evaluate(counts(1, 1)), Some(Team::Werewolves));
        assert_eq!(evaluate(counts(2, 1)), Some(Team::Werewolves));
    }

    #[test]
    fn test_otherwise_continue() {
        assert_eq!(evaluate(counts(1, 3)), None);
        assert_eq!(evaluate(counts(2, 3)), None);
    }

    #[tokio::test]
    async fn test_check_after_counts_without_the_dying() {
        use crate::models::game::GameSession;
        use crate::models::player::Player;
        use crate::models::rule::GameConfig;
        use crate::services::phase_clock::PhaseClock;
        use role_vault::{RecipientKeys, RoleVault};
        use std::time::Duration;
        use tokio::sync::broadcast;

        let config = GameConfig {
            player_count: 5,
            werewolf_count: 1,
            seer_count: 0,
            witch_count: 0,
            hunter_count: 0,
            guard_count: 0,
        };
        let (tx, _) = broadcast::channel(4);
        let mut session = GameSession::new(
            "s".to_string(),
            config,
            PhaseClock::new(Duration::from_secs(30)),
            [0u8; 32],
            String::new(),
            tx,
        );
        let vault = RoleVault::new();
        let roles = [Role::Werewolf, Role::Villager, Role::Villager, Role::Villager];
        for (i, role) in roles.iter().enumerate() {
            let id = format!("p{}", i);
            let keys = RecipientKeys::generate();
            vault.register_recipient(&id, &keys.public_key).await.unwrap();
            let mut player = Player::new(id.clone(), None);
            player.handle = Some(vault.commit(&id, &role.encode()).await.unwrap());
            session.players.push(player);
        }

        assert_eq!(check_after(&session, &vault, &[]).await, Ok(None));
        assert_eq!(
            check_after(&session, &vault, &["p1".to_string()]).await,
            Ok(None)
        );
        assert_eq!(
            check_after(&session, &vault, &["p1".to_string(), "p2".to_string()]).await,
            Ok(Some(Team::Werewolves))
        );
        assert_eq!(
            check_after(&session, &vault, &["p0".to_string()]).await,
            Ok(Some(Team::Villagers))
        );
        // Nothing was applied.
        assert_eq!(session.living().count(), 4);
    }
}

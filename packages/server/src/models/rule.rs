use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::error::GameError;

pub const MIN_PLAYERS: usize = 5;

/// Role balance for one session. Villagers fill whatever the named roles leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub player_count: usize,
    pub werewolf_count: usize,
    #[serde(default)]
    pub seer_count: usize,
    #[serde(default)]
    pub witch_count: usize,
    #[serde(default)]
    pub hunter_count: usize,
    #[serde(default)]
    pub guard_count: usize,
}

impl GameConfig {
    fn named_counts(&self) -> [usize; 5] {
        [
            self.werewolf_count,
            self.seer_count,
            self.witch_count,
            self.hunter_count,
            self.guard_count,
        ]
    }

    /// `None` when the counts overflow `usize`.
    pub fn checked_named_role_count(&self) -> Option<usize> {
        self.named_counts()
            .iter()
            .try_fold(0usize, |sum, count| sum.checked_add(*count))
    }

    pub fn named_role_count(&self) -> usize {
        self.checked_named_role_count().unwrap_or(usize::MAX)
    }

    pub fn villager_count(&self) -> usize {
        self.player_count.saturating_sub(self.named_role_count())
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.player_count < MIN_PLAYERS {
            return Err(GameError::InvalidConfig(format!(
                "at least {} players are required, got {}",
                MIN_PLAYERS, self.player_count
            )));
        }
        if self.named_counts().iter().any(|count| *count >= self.player_count) {
            return Err(GameError::InvalidConfig(format!(
                "a single role count must stay below {} players",
                self.player_count
            )));
        }
        let named = self.checked_named_role_count().ok_or_else(|| {
            GameError::InvalidConfig("role counts overflow".to_string())
        })?;
        if named >= self.player_count {
            return Err(GameError::InvalidConfig(format!(
                "{} named roles leave no villager among {} players",
                named, self.player_count
            )));
        }
        if self.werewolf_count == 0 {
            return Err(GameError::InvalidConfig(
                "at least one werewolf is required".to_string(),
            ));
        }
        Ok(())
    }

    /// One token per seat, grouped by role in a fixed order.
    ///
    /// Never longer than `player_count`, even for a config that failed `validate`.
    pub fn role_tokens(&self) -> Vec<Role> {
        let mut tokens = Vec::with_capacity(self.player_count);
        for (role, count) in [
            (Role::Werewolf, self.werewolf_count),
            (Role::Seer, self.seer_count),
            (Role::Witch, self.witch_count),
            (Role::Hunter, self.hunter_count),
            (Role::Guard, self.guard_count),
            (Role::Villager, self.villager_count()),
        ] {
            let room = self.player_count - tokens.len();
            tokens.extend(std::iter::repeat(role).take(count.min(room)));
        }
        tokens
    }

    pub fn count_of(&self, role: Role) -> usize {
        match role {
            Role::Villager => self.villager_count(),
            Role::Werewolf => self.werewolf_count,
            Role::Seer => self.seer_count,
            Role::Witch => self.witch_count,
            Role::Hunter => self.hunter_count,
            Role::Guard => self.guard_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(player_count: usize, werewolf_count: usize, seer_count: usize) -> GameConfig {
        GameConfig {
            player_count,
            werewolf_count,
            seer_count,
            witch_count: 0,
            hunter_count: 0,
            guard_count: 0,
        }
    }

    #[test]
    fn test_validate() {
        assert!(config(5, 1, 1).validate().is_ok());
        assert!(config(4, 1, 1).validate().is_err());
        assert!(config(5, 3, 2).validate().is_err());
        assert!(config(5, 4, 0).validate().is_ok());
        assert!(config(6, 0, 1).validate().is_err());
    }

    #[test]
    fn test_overflowing_counts_are_rejected() {
        let huge = config(5, usize::MAX, 2);
        assert!(matches!(huge.validate(), Err(GameError::InvalidConfig(_))));
        assert_eq!(huge.checked_named_role_count(), None);
        assert_eq!(huge.villager_count(), 0);
        assert_eq!(huge.role_tokens().len(), 5);

        let wrapping = GameConfig {
            player_count: 5,
            werewolf_count: 1,
            seer_count: usize::MAX,
            witch_count: 1,
            hunter_count: 0,
            guard_count: 0,
        };
        assert!(matches!(wrapping.validate(), Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_single_count_must_leave_room() {
        assert!(config(5, 5, 0).validate().is_err());
        assert!(config(5, 1, 5).validate().is_err());
    }

    #[test]
    fn test_role_tokens_match_counts() {
        let config = GameConfig {
            player_count: 9,
            werewolf_count: 2,
            seer_count: 1,
            witch_count: 1,
            hunter_count: 1,
            guard_count: 1,
        };
        let tokens = config.role_tokens();
        assert_eq!(tokens.len(), 9);
        for role in Role::ALL {
            assert_eq!(
                tokens.iter().filter(|t| **t == role).count(),
                config.count_of(role)
            );
        }
        assert_eq!(config.villager_count(), 3);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Werewolf,
    Seer,
    Witch,
    Hunter,
    Guard,
}

/// The night action a role may submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Kill,
    Protect,
    Heal,
    Poison,
    Investigate,
    Retaliate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Villagers,
    Werewolves,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Villager,
        Role::Werewolf,
        Role::Seer,
        Role::Witch,
        Role::Hunter,
        Role::Guard,
    ];

    pub fn capabilities(self) -> &'static [ActionKind] {
        match self {
            Role::Villager => &[],
            Role::Werewolf => &[ActionKind::Kill],
            Role::Seer => &[ActionKind::Investigate],
            Role::Witch => &[ActionKind::Heal, ActionKind::Poison],
            Role::Hunter => &[ActionKind::Retaliate],
            Role::Guard => &[ActionKind::Protect],
        }
    }

    pub fn team(self) -> Team {
        match self {
            Role::Werewolf => Team::Werewolves,
            _ => Team::Villagers,
        }
    }

    /// Byte plaintext handed to the confidential-value adapter.
    pub fn encode(self) -> Vec<u8> {
        let code = match self {
            Role::Villager => 0,
            Role::Werewolf => 1,
            Role::Seer => 2,
            Role::Witch => 3,
            Role::Hunter => 4,
            Role::Guard => 5,
        };
        vec![code]
    }

    pub fn decode(bytes: &[u8]) -> Option<Role> {
        match bytes {
            [0] => Some(Role::Villager),
            [1] => Some(Role::Werewolf),
            [2] => Some(Role::Seer),
            [3] => Some(Role::Witch),
            [4] => Some(Role::Hunter),
            [5] => Some(Role::Guard),
            _ => None,
        }
    }

    /// Encoded plaintexts of every role holding a night capability.
    pub fn encoded_capable() -> Vec<Vec<u8>> {
        Role::ALL
            .iter()
            .filter(|r| !r.capabilities().is_empty())
            .map(|r| r.encode())
            .collect()
    }
}

impl ActionKind {
    pub fn granted_by(self) -> Role {
        match self {
            ActionKind::Kill => Role::Werewolf,
            ActionKind::Protect => Role::Guard,
            ActionKind::Heal | ActionKind::Poison => Role::Witch,
            ActionKind::Investigate => Role::Seer,
            ActionKind::Retaliate => Role::Hunter,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Villager => write!(f, "Villager"),
            Role::Werewolf => write!(f, "Werewolf"),
            Role::Seer => write!(f, "Seer"),
            Role::Witch => write!(f, "Witch"),
            Role::Hunter => write!(f, "Hunter"),
            Role::Guard => write!(f, "Guard"),
        }
    }
}

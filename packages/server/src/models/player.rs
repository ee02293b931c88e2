use role_vault::ConcealedHandle;
use serde::{Deserialize, Serialize};

use super::role::Role;

pub type PlayerId = String;

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    /// Contributed to the role-assignment seed.
    pub entropy: [u8; 32],
    pub handle: Option<ConcealedHandle>,
    pub alive: bool,
    pub revealed: Option<Role>,
}

impl Player {
    pub fn new(id: PlayerId, entropy: Option<[u8; 32]>) -> Self {
        Self {
            id,
            entropy: entropy.unwrap_or([0u8; 32]),
            handle: None,
            alive: true,
            revealed: None,
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed.is_some()
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            alive: self.alive,
            revealed: self.is_revealed(),
            revealed_role: self.revealed,
        }
    }
}

/// Public view of a player; nothing concealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub alive: bool,
    pub revealed: bool,
    pub revealed_role: Option<Role>,
}

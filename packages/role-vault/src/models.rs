use serde::{Deserialize, Serialize};

/// Opaque reference to a committed plaintext.
///
/// Safe to publish: `digest` is a hiding commitment and `envelope` can only be
/// opened by the owner's secret key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcealedHandle {
    pub id: String,
    pub owner: String,
    /// Hex-encoded SHA-256 commitment.
    pub digest: String,
    /// The [`Opening`] sealed to `owner`.
    pub envelope: SealedEnvelope,
}

/// Payload encrypted to a single recipient with an ephemeral sender key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    pub recipient: String,
    pub ciphertext: String,    // Base64
    pub nonce: String,         // Base64
    pub ephemeral_key: String, // Base64
}

/// Everything the owner needs to prove what a handle commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    pub plaintext: Vec<u8>,
    /// Hex-encoded 32-byte blinding factor.
    pub blinding: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealProof {
    pub blinding: String,
}

impl From<&Opening> for RevealProof {
    fn from(opening: &Opening) -> Self {
        Self {
            blinding: opening.blinding.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Verified,
    Rejected,
}

/// One verification attempt against a handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub handle_id: String,
    pub owner: String,
    pub outcome: AuditOutcome,
}

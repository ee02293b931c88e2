use async_trait::async_trait;

use crate::{ConcealedHandle, RevealProof, SealedEnvelope, VaultError};

/// Capability contract for a confidential-value backend.
///
/// Implementations may be threshold MPC nodes, an enclave, or a trusted dealer. The
/// caller never assumes a scheme: it hands over plaintext exactly once in `commit`
/// and afterwards only sees handles, attestations, aggregates and sealed envelopes.
#[async_trait]
pub trait ConfidentialValueAdapter: Send + Sync {
    /// Conceals `plaintext` for `owner`.
    ///
    /// The returned handle carries the opening sealed to the owner, so the owner (and
    /// nobody else) can later produce a reveal proof.
    async fn commit(&self, owner: &str, plaintext: &[u8]) -> Result<ConcealedHandle, VaultError>;

    /// Checks `claimed` and `proof` against `handle`, returning the plaintext on success.
    ///
    /// May be slow. Callers must not hold exclusive locks while awaiting it.
    async fn verify_and_decrypt(
        &self,
        handle: &ConcealedHandle,
        claimed: &[u8],
        proof: &RevealProof,
    ) -> Result<Vec<u8>, VaultError>;

    /// Whether the concealed plaintext is one of `candidates`.
    async fn matches_any(
        &self,
        handle: &ConcealedHandle,
        candidates: &[Vec<u8>],
    ) -> Result<bool, VaultError>;

    /// How many of `handles` conceal a plaintext in `candidates`.
    async fn count_matching(
        &self,
        handles: &[ConcealedHandle],
        candidates: &[Vec<u8>],
    ) -> Result<usize, VaultError>;

    /// Re-encrypts the concealed plaintext of `handle` to `recipient`.
    async fn seal_for(
        &self,
        handle: &ConcealedHandle,
        recipient: &str,
    ) -> Result<SealedEnvelope, VaultError>;

    /// Drops whatever the backend keeps for `handles`. Later queries on them fail
    /// with `UnknownHandle`.
    async fn release(&self, handles: &[ConcealedHandle]) -> Result<(), VaultError>;
}

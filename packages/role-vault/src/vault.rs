use async_trait::async_trait;
use crypto_box::PublicKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::crypto::{commitment_digest, decode_blinding, parse_public_key, random_blinding, seal};
use crate::{
    AuditOutcome, AuditRecord, ConcealedHandle, ConfidentialValueAdapter, Opening, RevealProof,
    SealedEnvelope, VaultError,
};

struct Entry {
    owner: String,
    plaintext: Vec<u8>,
    digest: [u8; 32],
}

/// Trusted-dealer backend.
///
/// Holds plaintexts behind handle ids and answers attestation queries without
/// returning them. Every verification attempt lands in the audit trail, which
/// lives as long as the vault; entries go away only through `release`.
#[derive(Clone, Default)]
pub struct RoleVault {
    recipients: Arc<RwLock<HashMap<String, PublicKey>>>,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    audit: Arc<RwLock<Vec<AuditRecord>>>,
}

impl RoleVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the Base64 X25519 key envelopes for `owner` are sealed to.
    pub async fn register_recipient(&self, owner: &str, public_key: &str) -> Result<(), VaultError> {
        let key = parse_public_key(public_key)?;
        self.recipients.write().await.insert(owner.to_string(), key);
        debug!("Registered recipient key for {}", owner);
        Ok(())
    }

    pub async fn audit_trail(&self) -> Vec<AuditRecord> {
        self.audit.read().await.clone()
    }

    async fn recipient_key(&self, owner: &str) -> Result<PublicKey, VaultError> {
        self.recipients
            .read()
            .await
            .get(owner)
            .cloned()
            .ok_or_else(|| VaultError::UnknownRecipient(owner.to_string()))
    }

    async fn record(&self, handle: &ConcealedHandle, outcome: AuditOutcome) {
        self.audit.write().await.push(AuditRecord {
            handle_id: handle.id.clone(),
            owner: handle.owner.clone(),
            outcome,
        });
    }
}

#[async_trait]
impl ConfidentialValueAdapter for RoleVault {
    async fn commit(&self, owner: &str, plaintext: &[u8]) -> Result<ConcealedHandle, VaultError> {
        let recipient_key = self.recipient_key(owner).await?;

        let blinding = random_blinding();
        let digest = commitment_digest(owner, plaintext, &blinding);
        let opening = Opening {
            plaintext: plaintext.to_vec(),
            blinding: hex::encode(blinding),
        };
        let envelope = seal(owner, &recipient_key, &opening)?;

        let handle = ConcealedHandle {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            digest: hex::encode(digest),
            envelope,
        };

        self.entries.write().await.insert(
            handle.id.clone(),
            Entry {
                owner: owner.to_string(),
                plaintext: plaintext.to_vec(),
                digest,
            },
        );

        Ok(handle)
    }

    async fn verify_and_decrypt(
        &self,
        handle: &ConcealedHandle,
        claimed: &[u8],
        proof: &RevealProof,
    ) -> Result<Vec<u8>, VaultError> {
        let issued = {
            let entries = self.entries.read().await;
            let entry = entries
                .get(&handle.id)
                .ok_or_else(|| VaultError::UnknownHandle(handle.id.clone()))?;
            entry.owner == handle.owner && hex::encode(entry.digest) == handle.digest
        };

        let opens = issued
            && decode_blinding(&proof.blinding)
                .map(|blinding| {
                    hex::encode(commitment_digest(&handle.owner, claimed, &blinding))
                        == handle.digest
                })
                .unwrap_or(false);

        if opens {
            self.record(handle, AuditOutcome::Verified).await;
            info!("Verified opening of handle {} for {}", handle.id, handle.owner);
            Ok(claimed.to_vec())
        } else {
            self.record(handle, AuditOutcome::Rejected).await;
            warn!("Rejected opening of handle {} for {}", handle.id, handle.owner);
            Err(VaultError::ProofInvalid)
        }
    }

    async fn matches_any(
        &self,
        handle: &ConcealedHandle,
        candidates: &[Vec<u8>],
    ) -> Result<bool, VaultError> {
        let entries = self.entries.read().await;
        let entry = entries
            .get(&handle.id)
            .ok_or_else(|| VaultError::UnknownHandle(handle.id.clone()))?;
        Ok(candidates.iter().any(|c| *c == entry.plaintext))
    }

    async fn count_matching(
        &self,
        handles: &[ConcealedHandle],
        candidates: &[Vec<u8>],
    ) -> Result<usize, VaultError> {
        let entries = self.entries.read().await;
        let mut count = 0;
        for handle in handles {
            let entry = entries
                .get(&handle.id)
                .ok_or_else(|| VaultError::UnknownHandle(handle.id.clone()))?;
            if candidates.iter().any(|c| *c == entry.plaintext) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn seal_for(
        &self,
        handle: &ConcealedHandle,
        recipient: &str,
    ) -> Result<SealedEnvelope, VaultError> {
        let recipient_key = self.recipient_key(recipient).await?;
        let plaintext = {
            let entries = self.entries.read().await;
            entries
                .get(&handle.id)
                .map(|entry| entry.plaintext.clone())
                .ok_or_else(|| VaultError::UnknownHandle(handle.id.clone()))?
        };
        seal(recipient, &recipient_key, &plaintext)
    }

    async fn release(&self, handles: &[ConcealedHandle]) -> Result<(), VaultError> {
        let mut entries = self.entries.write().await;
        for handle in handles {
            entries.remove(&handle.id);
        }
        debug!("Released {} handles", handles.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecipientKeys;

    async fn vault_with(owners: &[&str]) -> (RoleVault, HashMap<String, RecipientKeys>) {
        let vault = RoleVault::new();
        let mut keys = HashMap::new();
        for owner in owners {
            let k = RecipientKeys::generate();
            vault.register_recipient(owner, &k.public_key).await.unwrap();
            keys.insert(owner.to_string(), k);
        }
        (vault, keys)
    }

    #[tokio::test]
    async fn test_commit_requires_registered_recipient() {
        let vault = RoleVault::new();
        let result = vault.commit("ghost", &[1]).await;
        assert_eq!(result, Err(VaultError::UnknownRecipient("ghost".to_string())));
    }

    #[tokio::test]
    async fn test_owner_can_open_and_reveal() {
        let (vault, keys) = vault_with(&["alice"]).await;
        let handle = vault.commit("alice", &[4]).await.unwrap();

        let opening: Opening = keys["alice"].open(&handle.envelope).unwrap();
        assert_eq!(opening.plaintext, vec![4]);

        let revealed = vault
            .verify_and_decrypt(&handle, &opening.plaintext, &RevealProof::from(&opening))
            .await
            .unwrap();
        assert_eq!(revealed, vec![4]);
    }

    #[tokio::test]
    async fn test_wrong_claim_is_rejected_and_audited() {
        let (vault, keys) = vault_with(&["alice"]).await;
        let handle = vault.commit("alice", &[4]).await.unwrap();
        let opening: Opening = keys["alice"].open(&handle.envelope).unwrap();

        let result = vault
            .verify_and_decrypt(&handle, &[1], &RevealProof::from(&opening))
            .await;
        assert_eq!(result, Err(VaultError::ProofInvalid));

        let garbage = RevealProof {
            blinding: "not-hex".to_string(),
        };
        let result = vault.verify_and_decrypt(&handle, &[4], &garbage).await;
        assert_eq!(result, Err(VaultError::ProofInvalid));

        let trail = vault.audit_trail().await;
        assert_eq!(trail.len(), 2);
        assert!(trail.iter().all(|r| r.outcome == AuditOutcome::Rejected));
    }

    #[tokio::test]
    async fn test_forged_handle_is_rejected() {
        let (vault, keys) = vault_with(&["alice", "bob"]).await;
        let handle = vault.commit("alice", &[4]).await.unwrap();
        let opening: Opening = keys["alice"].open(&handle.envelope).unwrap();

        // Same handle id, re-pointed at another owner.
        let mut forged = handle.clone();
        forged.owner = "bob".to_string();
        let result = vault
            .verify_and_decrypt(&forged, &[4], &RevealProof::from(&opening))
            .await;
        assert_eq!(result, Err(VaultError::ProofInvalid));
    }

    #[tokio::test]
    async fn test_attestations() {
        let (vault, keys) = vault_with(&["alice", "bob", "carol"]).await;
        let a = vault.commit("alice", &[1]).await.unwrap();
        let b = vault.commit("bob", &[2]).await.unwrap();
        let c = vault.commit("carol", &[1]).await.unwrap();

        assert!(vault.matches_any(&a, &[vec![1], vec![3]]).await.unwrap());
        assert!(!vault.matches_any(&b, &[vec![1]]).await.unwrap());

        let handles = vec![a.clone(), b, c];
        assert_eq!(vault.count_matching(&handles, &[vec![1]]).await.unwrap(), 2);
        assert_eq!(vault.count_matching(&handles, &[]).await.unwrap(), 0);

        let sealed = vault.seal_for(&a, "bob").await.unwrap();
        let seen: Vec<u8> = keys["bob"].open(&sealed).unwrap();
        assert_eq!(seen, vec![1]);
        assert!(keys["carol"].open::<Vec<u8>>(&sealed).is_err());
    }

    #[tokio::test]
    async fn test_released_handles_are_forgotten() {
        let (vault, keys) = vault_with(&["alice"]).await;
        let handle = vault.commit("alice", &[4]).await.unwrap();
        let opening: Opening = keys["alice"].open(&handle.envelope).unwrap();

        vault.release(std::slice::from_ref(&handle)).await.unwrap();
        assert_eq!(
            vault.matches_any(&handle, &[vec![4]]).await,
            Err(VaultError::UnknownHandle(handle.id.clone()))
        );
        assert_eq!(
            vault
                .verify_and_decrypt(&handle, &[4], &RevealProof::from(&opening))
                .await,
            Err(VaultError::UnknownHandle(handle.id.clone()))
        );
    }
}

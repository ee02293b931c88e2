use base64::{decode, encode};
use crypto_box::{
    aead::{Aead, AeadCore},
    PublicKey, SalsaBox, SecretKey,
};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{SealedEnvelope, VaultError};

const COMMITMENT_DOMAIN: &[u8] = b"ROLE_VAULT_COMMIT_V1";

/// A recipient keypair, Base64 encoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipientKeys {
    pub public_key: String,
    #[serde(skip_serializing)]
    secret_key: String,
}

impl RecipientKeys {
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut OsRng);
        Self {
            public_key: encode(secret.public_key().as_bytes()),
            secret_key: encode(secret.to_bytes()),
        }
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn open<T: DeserializeOwned>(&self, envelope: &SealedEnvelope) -> Result<T, VaultError> {
        envelope.open(&self.secret_key)
    }
}

pub fn parse_public_key(encoded: &str) -> Result<PublicKey, VaultError> {
    let bytes = decode(encoded).map_err(|e| VaultError::InvalidKey(e.to_string()))?;
    let bytes = <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| VaultError::InvalidKey("public key must be 32 bytes".to_string()))?;
    Ok(PublicKey::from(bytes))
}

/// Encrypts `payload` as JSON to `recipient_key` under a fresh ephemeral key.
pub fn seal<T: Serialize>(
    recipient: &str,
    recipient_key: &PublicKey,
    payload: &T,
) -> Result<SealedEnvelope, VaultError> {
    let ephemeral_secret = SecretKey::generate(&mut OsRng);
    let ephemeral_public_key = ephemeral_secret.public_key();
    let box_ = SalsaBox::new(recipient_key, &ephemeral_secret);

    let plain_data =
        serde_json::to_vec(payload).map_err(|e| VaultError::Serialization(e.to_string()))?;

    let nonce = SalsaBox::generate_nonce(&mut OsRng);
    let encrypted_data = box_
        .encrypt(&nonce, plain_data.as_slice())
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    Ok(SealedEnvelope {
        recipient: recipient.to_string(),
        ciphertext: encode(encrypted_data),
        nonce: encode(nonce),
        ephemeral_key: encode(ephemeral_public_key.as_bytes()),
    })
}

impl SealedEnvelope {
    /// Decrypts with the recipient's Base64 secret key.
    pub fn open<T: DeserializeOwned>(&self, secret_key: &str) -> Result<T, VaultError> {
        let secret_key_bytes =
            decode(secret_key).map_err(|e| VaultError::InvalidKey(e.to_string()))?;
        let secret_key = SecretKey::from_slice(&secret_key_bytes)
            .map_err(|_| VaultError::InvalidKey("secret key must be 32 bytes".to_string()))?;

        let ephemeral_public_key = parse_public_key(&self.ephemeral_key)?;

        let nonce_bytes =
            decode(&self.nonce).map_err(|e| VaultError::Decryption(e.to_string()))?;
        if nonce_bytes.len() != 24 {
            return Err(VaultError::Decryption("nonce must be 24 bytes".to_string()));
        }
        let nonce = *crypto_box::Nonce::from_slice(&nonce_bytes);

        let encrypted_data =
            decode(&self.ciphertext).map_err(|e| VaultError::Decryption(e.to_string()))?;

        let box_ = SalsaBox::new(&ephemeral_public_key, &secret_key);
        let decrypted_data = box_
            .decrypt(&nonce, encrypted_data.as_slice())
            .map_err(|e| VaultError::Decryption(e.to_string()))?;

        serde_json::from_slice(&decrypted_data).map_err(|e| VaultError::Serialization(e.to_string()))
    }
}

pub fn random_blinding() -> [u8; 32] {
    let mut blinding = [0u8; 32];
    OsRng.fill_bytes(&mut blinding);
    blinding
}

/// Hiding, binding commitment to `plaintext` for `owner`.
pub fn commitment_digest(owner: &str, plaintext: &[u8], blinding: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(COMMITMENT_DOMAIN);
    hasher.update((owner.len() as u64).to_le_bytes());
    hasher.update(owner.as_bytes());
    hasher.update((plaintext.len() as u64).to_le_bytes());
    hasher.update(plaintext);
    hasher.update(blinding);
    hasher.finalize().into()
}

pub fn decode_blinding(encoded: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(encoded).ok()?;
    <[u8; 32]>::try_from(bytes.as_slice()).ok()
}

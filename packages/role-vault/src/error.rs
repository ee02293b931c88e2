use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("No recipient key registered for {0}")]
    UnknownRecipient(String),
    #[error("Handle {0} was not issued by this vault")]
    UnknownHandle(String),
    #[error("Proof does not open the commitment")]
    ProofInvalid,
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Encryption failed: {0}")]
    Encryption(String),
    #[error("Decryption failed: {0}")]
    Decryption(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

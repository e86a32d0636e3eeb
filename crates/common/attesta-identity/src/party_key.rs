use attesta_types::party::SettlementAddress;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartyKeyError {
    #[error("Signature verification failed")]
    VerificationError(#[from] ed25519_dalek::SignatureError),
}

/// The Ed25519 keypair a party's signing agent holds. The settlement
/// address is derived from the verifying key, so whoever controls the key
/// controls the address. Keys never leave the agent; the server only ever
/// sees addresses.
#[derive(Debug)]
pub struct PartyKey {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: SettlementAddress,
}

impl PartyKey {
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        Self::from_signing_key(signing_key)
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let address = SettlementAddress::from_verifying_key(&verifying_key);
        PartyKey {
            signing_key,
            verifying_key,
            address,
        }
    }

    pub fn address(&self) -> &SettlementAddress {
        &self.address
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), PartyKeyError> {
        self.verifying_key
            .verify(message, signature)
            .map_err(PartyKeyError::VerificationError)
    }
}

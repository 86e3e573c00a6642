//! Recipient signatures confirming a cash handover.
//!
//! A signature is an opaque artifact (SVG or base64 image) captured on the
//! courier's device. At most one exists per transaction and it is never
//! modified after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{SignatureId, TransactionId, UserId};

/// A recipient's signature on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalSignature {
    pub id: SignatureId,
    pub transaction_id: TransactionId,
    pub signer: UserId,
    /// Opaque signed artifact.
    pub payload: String,
    /// Hex SHA-256 of `payload`, kept for audit lookups.
    pub digest: String,
    pub signed_at: DateTime<Utc>,
}

impl DigitalSignature {
    #[must_use]
    pub fn new(transaction_id: TransactionId, signer: UserId, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        let digest = Self::digest_of(&payload);
        Self {
            id: SignatureId::new(),
            transaction_id,
            signer,
            payload,
            digest,
            signed_at: Utc::now(),
        }
    }

    /// Hex SHA-256 over a domain-separated payload.
    #[must_use]
    pub fn digest_of(payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"courierpay:signature:v1:");
        hasher.update(payload.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the stored digest still matches the payload.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.digest == Self::digest_of(&self.payload)
    }
}

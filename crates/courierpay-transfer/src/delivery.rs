//! Courier-side lifecycle of a transaction.
//!
//! Every operation here is a conditional update on one transaction record:
//! the checks and the write happen under the record's lock, so two couriers
//! racing for the same delivery cannot both win, and a signature lands
//! together with the `delivered` state or not at all.

use std::sync::Arc;

use courierpay_ledger::LedgerStore;
use courierpay_types::{
    Actor, CourierpayError, DeliveryStatus, DigitalSignature, Result, TransactionId,
    TransactionStatus, UserId,
};
use serde::{Deserialize, Serialize};

/// A signature captured on the courier's device at the final hand-over.
///
/// `signer` is asserted by the courier, not authenticated: [`DeliveryDesk::advance`]
/// only checks that it names the transaction's signing party. A signature
/// the signing party submits through [`DeliveryDesk::record_signature`] is
/// authenticated as the caller and, once present, wins over any captured one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInput {
    pub signer: UserId,
    /// Opaque SVG or base64 text.
    pub payload: String,
}

/// Claims, advances, signs and fails deliveries.
#[derive(Debug, Clone)]
pub struct DeliveryDesk {
    ledger: Arc<LedgerStore>,
}

fn non_empty(payload: &str) -> Result<()> {
    if payload.trim().is_empty() {
        return Err(CourierpayError::validation("signature payload is empty"));
    }
    Ok(())
}

impl DeliveryDesk {
    #[must_use]
    pub fn new(ledger: Arc<LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Take an unassigned delivery.
    ///
    /// # Errors
    /// - `Authorization` unless the actor is a verified courier
    /// - `NotFound` for an unknown transaction
    /// - `Conflict` if someone else already holds it or it is no longer pending
    pub fn claim(&self, tx_id: TransactionId, actor: &Actor) -> Result<()> {
        actor.ensure_can_deliver()?;
        let outcome = self
            .ledger
            .update_transaction(tx_id, |tx, _| tx.assign_agent(actor.user_id));
        match &outcome {
            Ok(()) => tracing::info!(tx = %tx_id, agent = %actor.user_id, "Delivery claimed"),
            Err(CourierpayError::Conflict { reason }) => {
                tracing::warn!(tx = %tx_id, agent = %actor.user_id, %reason, "Claim rejected");
            }
            Err(_) => {}
        }
        outcome
    }

    /// Move a delivery forward.
    ///
    /// Reaching `Delivered` needs the signing party's signature, either
    /// already recorded or supplied here; it is stored in the same update
    /// that completes the transaction.
    ///
    /// # Errors
    /// - `Authorization` if the actor is not the assigned courier, or the
    ///   supplied signature is not from the signing party
    /// - `Conflict` for any transition the state machine forbids
    /// - `Validation` when delivering without any signature
    pub fn advance(
        &self,
        tx_id: TransactionId,
        actor: &Actor,
        target: DeliveryStatus,
        signature: Option<SignatureInput>,
    ) -> Result<()> {
        let outcome = self.ledger.update_transaction(tx_id, |tx, slot| {
            if tx.delivery_agent != Some(actor.user_id) {
                return Err(CourierpayError::unauthorized(format!(
                    "{} is not the courier assigned to {}",
                    actor.user_id, tx.id
                )));
            }
            let from = tx.delivery_status;
            tx.advance_delivery(target)?;

            if target == DeliveryStatus::Delivered && slot.is_none() {
                let Some(input) = signature else {
                    return Err(CourierpayError::validation(format!(
                        "{} cannot be delivered without the recipient's signature",
                        tx.id
                    )));
                };
                if input.signer != tx.signing_party() {
                    return Err(CourierpayError::unauthorized(format!(
                        "{} is not the signing party of {}",
                        input.signer, tx.id
                    )));
                }
                non_empty(&input.payload)?;
                tracing::info!(
                    tx = %tx.id,
                    signer = %input.signer,
                    captured_by = %actor.user_id,
                    "Signature captured at hand-over"
                );
                *slot = Some(DigitalSignature::new(tx.id, input.signer, input.payload));
            }
            Ok(from)
        });

        match outcome {
            Ok(from) => {
                tracing::info!(tx = %tx_id, agent = %actor.user_id, %from, to = %target, "Delivery advanced");
                Ok(())
            }
            Err(e) => {
                if matches!(e, CourierpayError::Conflict { .. }) {
                    tracing::warn!(tx = %tx_id, to = %target, error = %e, "Delivery transition rejected");
                }
                Err(e)
            }
        }
    }

    /// Attach the signing party's signature ahead of the hand-over.
    ///
    /// # Errors
    /// - `Validation` for an empty payload
    /// - `Authorization` unless the actor is the approved signing party
    /// - `Conflict` once delivered, failed, or already signed
    pub fn record_signature(
        &self,
        tx_id: TransactionId,
        actor: &Actor,
        payload: &str,
    ) -> Result<DigitalSignature> {
        non_empty(payload)?;
        if !actor.is_approved() {
            return Err(CourierpayError::unauthorized(format!(
                "user {} is not verified",
                actor.user_id
            )));
        }
        let signature = self.ledger.update_transaction(tx_id, |tx, slot| {
            if tx.signing_party() != actor.user_id {
                return Err(CourierpayError::unauthorized(format!(
                    "{} is not the recipient of {}",
                    actor.user_id, tx.id
                )));
            }
            if tx.delivery_status.is_terminal() || tx.status == TransactionStatus::Failed {
                return Err(CourierpayError::conflict(format!(
                    "{} is {} / {}; signing is closed",
                    tx.id, tx.status, tx.delivery_status
                )));
            }
            if slot.is_some() {
                return Err(CourierpayError::conflict(format!("{} is already signed", tx.id)));
            }
            let signature = DigitalSignature::new(tx.id, actor.user_id, payload);
            *slot = Some(signature.clone());
            Ok(signature)
        })?;
        tracing::info!(tx = %tx_id, signer = %actor.user_id, signature = %signature.id, "Signature recorded");
        Ok(signature)
    }

    /// Back-office: give up on a transaction that cannot be fulfilled.
    /// Balances stay as they are.
    ///
    /// # Errors
    /// - `Authorization` unless the actor is an admin
    /// - `Conflict` if the transaction already completed or failed
    pub fn fail(&self, tx_id: TransactionId, actor: &Actor) -> Result<()> {
        actor.ensure_admin()?;
        self.ledger
            .update_transaction(tx_id, |tx, _| tx.mark_failed())?;
        tracing::warn!(tx = %tx_id, admin = %actor.user_id, "Transaction marked failed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use courierpay_types::{CurrencyCode, Role, Transaction, VerificationStatus};
    use rust_decimal::Decimal;

    use super::*;

    fn actor(role: Role) -> Actor {
        Actor {
            user_id: UserId::new(),
            role,
            status: VerificationStatus::Verified,
        }
    }

    /// Store with one pending delivery owned (and signed for) by `owner`.
    fn setup(owner: UserId) -> (DeliveryDesk, Arc<LedgerStore>, TransactionId) {
        let ledger = Arc::new(LedgerStore::new());
        let anchor = ledger
            .open_wallet(owner, CurrencyCode::parse("AED").unwrap(), Decimal::ZERO)
            .unwrap();
        let tx = Transaction::dummy(owner);
        let id = tx.id;
        ledger
            .atomically(&[anchor.id], |unit| unit.insert_transaction(tx))
            .unwrap();
        (DeliveryDesk::new(Arc::clone(&ledger)), ledger, id)
    }

    #[test]
    fn claim_requires_verified_courier() {
        let owner = actor(Role::User);
        let (desk, _, id) = setup(owner.user_id);
        assert!(matches!(
            desk.claim(id, &owner).unwrap_err(),
            CourierpayError::Authorization { .. }
        ));
        let mut pending = actor(Role::Delivery);
        pending.status = VerificationStatus::Pending;
        assert!(desk.claim(id, &pending).is_err());
        assert!(matches!(
            desk.claim(TransactionId::new(), &actor(Role::Delivery)).unwrap_err(),
            CourierpayError::NotFound { .. }
        ));
    }

    #[test]
    fn second_claim_conflicts() {
        let owner = actor(Role::User);
        let (desk, ledger, id) = setup(owner.user_id);
        let first = actor(Role::Delivery);
        desk.claim(id, &first).unwrap();
        assert!(matches!(
            desk.claim(id, &actor(Role::Delivery)).unwrap_err(),
            CourierpayError::Conflict { .. }
        ));
        assert_eq!(ledger.transaction(id).unwrap().delivery_agent, Some(first.user_id));
    }

    #[test]
    fn only_assigned_courier_advances() {
        let owner = actor(Role::User);
        let (desk, _, id) = setup(owner.user_id);
        let courier = actor(Role::Delivery);
        desk.claim(id, &courier).unwrap();
        let err = desk
            .advance(id, &actor(Role::Delivery), DeliveryStatus::InTransit, None)
            .unwrap_err();
        assert!(matches!(err, CourierpayError::Authorization { .. }));
        desk.advance(id, &courier, DeliveryStatus::InTransit, None).unwrap();
    }

    #[test]
    fn delivery_needs_signing_party_signature() {
        let owner = actor(Role::User);
        let (desk, ledger, id) = setup(owner.user_id);
        let courier = actor(Role::Delivery);
        desk.claim(id, &courier).unwrap();

        let err = desk
            .advance(id, &courier, DeliveryStatus::Delivered, None)
            .unwrap_err();
        assert!(matches!(err, CourierpayError::Validation { .. }));

        let forged = SignatureInput {
            signer: courier.user_id,
            payload: "<svg/>".into(),
        };
        let err = desk
            .advance(id, &courier, DeliveryStatus::Delivered, Some(forged))
            .unwrap_err();
        assert!(matches!(err, CourierpayError::Authorization { .. }));
        assert_eq!(ledger.transaction(id).unwrap().delivery_status, DeliveryStatus::Assigned);
        assert!(ledger.signature_of(id).is_none());

        let genuine = SignatureInput {
            signer: owner.user_id,
            payload: "<svg>ok</svg>".into(),
        };
        desk.advance(id, &courier, DeliveryStatus::Delivered, Some(genuine))
            .unwrap();
        let tx = ledger.transaction(id).unwrap();
        assert_eq!(tx.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(ledger.signature_of(id).unwrap().signer, owner.user_id);
    }

    #[test]
    fn delivered_is_terminal() {
        let owner = actor(Role::User);
        let (desk, _, id) = setup(owner.user_id);
        let courier = actor(Role::Delivery);
        desk.claim(id, &courier).unwrap();
        desk.record_signature(id, &owner, "<svg/>").unwrap();
        desk.advance(id, &courier, DeliveryStatus::Delivered, None).unwrap();

        for target in [
            DeliveryStatus::Assigned,
            DeliveryStatus::InTransit,
            DeliveryStatus::Delivered,
            DeliveryStatus::Pending,
        ] {
            let err = desk.advance(id, &courier, target, None).unwrap_err();
            assert!(matches!(err, CourierpayError::Conflict { .. }), "-> {target}");
        }
        assert!(matches!(
            desk.record_signature(id, &owner, "<svg>late</svg>").unwrap_err(),
            CourierpayError::Conflict { .. }
        ));
    }

    #[test]
    fn recipient_signature_wins_over_captured_one() {
        let owner = actor(Role::User);
        let (desk, ledger, id) = setup(owner.user_id);
        let courier = actor(Role::Delivery);
        desk.claim(id, &courier).unwrap();
        desk.record_signature(id, &owner, "<svg>mine</svg>").unwrap();

        let captured = SignatureInput {
            signer: owner.user_id,
            payload: "<svg>courier</svg>".into(),
        };
        desk.advance(id, &courier, DeliveryStatus::Delivered, Some(captured))
            .unwrap();
        let sig = ledger.signature_of(id).unwrap();
        assert_eq!(sig.payload, "<svg>mine</svg>");
        assert_eq!(sig.signer, owner.user_id);
    }

    #[test]
    fn record_signature_rules() {
        let owner = actor(Role::User);
        let (desk, _, id) = setup(owner.user_id);
        assert!(matches!(
            desk.record_signature(id, &owner, "   ").unwrap_err(),
            CourierpayError::Validation { .. }
        ));
        assert!(matches!(
            desk.record_signature(id, &actor(Role::User), "<svg/>").unwrap_err(),
            CourierpayError::Authorization { .. }
        ));
        let sig = desk.record_signature(id, &owner, "<svg/>").unwrap();
        assert!(sig.is_intact());
        assert!(matches!(
            desk.record_signature(id, &owner, "<svg/>").unwrap_err(),
            CourierpayError::Conflict { .. }
        ));
    }

    #[test]
    fn fail_is_admin_only_and_blocks_delivery() {
        let owner = actor(Role::User);
        let (desk, ledger, id) = setup(owner.user_id);
        let courier = actor(Role::Delivery);
        desk.claim(id, &courier).unwrap();

        assert!(matches!(
            desk.fail(id, &owner).unwrap_err(),
            CourierpayError::Authorization { .. }
        ));
        desk.fail(id, &actor(Role::Admin)).unwrap();
        assert_eq!(ledger.transaction(id).unwrap().status, TransactionStatus::Failed);
        assert!(desk.advance(id, &courier, DeliveryStatus::InTransit, None).is_err());
        assert!(matches!(
            desk.fail(id, &actor(Role::Admin)).unwrap_err(),
            CourierpayError::Conflict { .. }
        ));
    }
}

//! End-to-end flows through the `CourierPay` facade.
//!
//! Registration → approval → accounts → transfer → courier assignment →
//! signature → delivery, plus the rejection paths that must leave every
//! balance untouched.

use std::sync::Arc;

use courierpay_transfer::{CourierPay, SignatureInput, StaticRateOracle, TransferRequest};
use courierpay_types::{
    Actor, Coordinates, CourierpayError, CurrencyCode, DeliveryStatus, Role, ServiceConfig,
    TransactionStatus, TransactionType, VerificationStatus,
};
use rust_decimal::Decimal;

fn ccy(code: &str) -> CurrencyCode {
    CurrencyCode::parse(code).unwrap()
}

fn dubai() -> Coordinates {
    Coordinates::new(25.2048, 55.2708).unwrap()
}

fn sharjah() -> Coordinates {
    Coordinates::new(25.3463, 55.4209).unwrap()
}

fn service_with(oracle: StaticRateOracle) -> CourierPay {
    CourierPay::new(ServiceConfig::default(), Arc::new(oracle)).unwrap()
}

fn service() -> CourierPay {
    service_with(StaticRateOracle::new().with_rate(ccy("AED"), ccy("USD"), Decimal::new(2723, 4)))
}

fn admin(svc: &CourierPay) -> Actor {
    svc.directory()
        .register("ops@courierpay.io", Role::Admin, VerificationStatus::Verified)
        .unwrap()
        .actor()
}

/// Register through the OTP flow and have an admin approve the user.
fn onboard(svc: &CourierPay, email: &str, role: Role) -> Actor {
    let otp = svc.stage_registration(email, role).unwrap();
    let id = svc.confirm_registration(email, &otp).unwrap();
    svc.set_user_status(&admin_of(svc), id, VerificationStatus::Verified)
        .unwrap()
        .actor()
}

fn admin_of(svc: &CourierPay) -> Actor {
    svc.directory()
        .find_by_email("ops@courierpay.io")
        .map_or_else(|| admin(svc), |u| u.actor())
}

fn balance(svc: &CourierPay, id: courierpay_types::AccountId) -> Decimal {
    svc.ledger().account(id).unwrap().balance
}

#[tokio::test]
async fn withdrawal_is_delivered_by_nearest_courier() {
    let svc = service();
    let alice = onboard(&svc, "alice@x.io", Role::User);
    let near = onboard(&svc, "near@x.io", Role::Delivery);
    let far = onboard(&svc, "far@x.io", Role::Delivery);
    svc.report_agent_location(&near, 25.21, 55.28).unwrap();
    svc.report_agent_location(&far, 25.35, 55.42).unwrap();

    let card = svc
        .open_card(&alice, "4242", "Alice A", "AED", Decimal::new(1_000, 0))
        .unwrap();
    let req = TransferRequest::new(TransactionType::Withdrawal, card.id, Decimal::new(300, 0), "AED")
        .with_recipient_location(dubai())
        .with_note("Tower B, lobby");
    let tx = svc.create_transfer(&req, &alice).await.unwrap();

    assert_eq!(balance(&svc, card.id), Decimal::new(700, 0));
    assert_eq!(tx.delivery_agent, Some(near.user_id));
    assert_eq!(tx.delivery_status, DeliveryStatus::Assigned);
    assert_eq!(tx.status, TransactionStatus::Pending);

    // The far courier cannot touch it.
    assert!(matches!(
        svc.advance_delivery(tx.id, &far, DeliveryStatus::InTransit, None)
            .unwrap_err(),
        CourierpayError::Authorization { .. }
    ));

    svc.advance_delivery(tx.id, &near, DeliveryStatus::InTransit, None)
        .unwrap();
    svc.record_signature(tx.id, &alice, "<svg>alice</svg>").unwrap();
    svc.advance_delivery(tx.id, &near, DeliveryStatus::Delivered, None)
        .unwrap();

    let done = svc.transaction(tx.id, &alice).unwrap();
    assert_eq!(done.delivery_status, DeliveryStatus::Delivered);
    assert_eq!(done.status, TransactionStatus::Completed);
    assert!(svc.ledger().signature_of(tx.id).unwrap().is_intact());

    // Terminal: nothing moves it back.
    assert!(matches!(
        svc.advance_delivery(tx.id, &near, DeliveryStatus::Assigned, None)
            .unwrap_err(),
        CourierpayError::Conflict { .. }
    ));
}

#[tokio::test]
async fn send_money_fee_and_signature_on_delivery() {
    let svc = service();
    let alice = onboard(&svc, "alice@x.io", Role::User);
    let bob = onboard(&svc, "bob@x.io", Role::User);
    let src = svc
        .open_card(&alice, "1111", "Alice", "AED", Decimal::new(500, 0))
        .unwrap();
    let dst = svc.open_wallet(&bob, "AED", Decimal::new(20, 0)).unwrap();

    let req = TransferRequest::new(TransactionType::SendMoney, src.id, Decimal::new(12345, 2), "AED")
        .with_recipient(bob.user_id)
        .with_sender_location(dubai())
        .with_recipient_location(sharjah());
    let tx = svc.create_transfer(&req, &alice).await.unwrap();

    // 123.45 * 0.9 = 111.105 -> 111.11
    assert_eq!(balance(&svc, src.id), Decimal::new(37655, 2));
    assert_eq!(balance(&svc, dst.id), Decimal::new(13111, 2));
    assert_eq!(tx.fee, Decimal::new(1234, 2));
    assert_eq!(tx.delivery_status, DeliveryStatus::Pending, "no courier online");

    // Courier comes online, sees it, claims it, delivers with bob's signature.
    let courier = onboard(&svc, "c@x.io", Role::Delivery);
    let listed = svc.transactions_for(&courier);
    assert!(listed.iter().any(|t| t.id == tx.id));
    svc.claim_delivery(tx.id, &courier).unwrap();
    assert!(svc.transactions_for(&courier).iter().all(|t| t.id != tx.id));

    let alice_sig = SignatureInput {
        signer: alice.user_id,
        payload: "<svg>alice</svg>".into(),
    };
    assert!(matches!(
        svc.advance_delivery(tx.id, &courier, DeliveryStatus::Delivered, Some(alice_sig))
            .unwrap_err(),
        CourierpayError::Authorization { .. }
    ));
    let bob_sig = SignatureInput {
        signer: bob.user_id,
        payload: "<svg>bob</svg>".into(),
    };
    svc.advance_delivery(tx.id, &courier, DeliveryStatus::Delivered, Some(bob_sig))
        .unwrap();
    assert_eq!(svc.ledger().signature_of(tx.id).unwrap().signer, bob.user_id);

    // Both parties see it; an outsider does not.
    assert!(svc.transactions_for(&alice).iter().any(|t| t.id == tx.id));
    assert!(svc.transactions_for(&bob).iter().any(|t| t.id == tx.id));
    let eve = onboard(&svc, "eve@x.io", Role::User);
    assert!(matches!(
        svc.transaction(tx.id, &eve).unwrap_err(),
        CourierpayError::Authorization { .. }
    ));
}

#[tokio::test]
async fn rejected_transfers_leave_balances_untouched() {
    let svc = service();
    let alice = onboard(&svc, "alice@x.io", Role::User);
    let bob = onboard(&svc, "bob@x.io", Role::User);
    let src = svc
        .open_card(&alice, "1111", "Alice", "AED", Decimal::new(100, 0))
        .unwrap();
    let dst = svc.open_wallet(&bob, "AED", Decimal::ZERO).unwrap();
    let base = TransferRequest::new(TransactionType::SendMoney, src.id, Decimal::ONE, "AED")
        .with_recipient(bob.user_id)
        .with_sender_location(dubai())
        .with_recipient_location(dubai());

    let mut zero = base.clone();
    zero.amount = Decimal::ZERO;
    let mut negative = base.clone();
    negative.amount = Decimal::new(-5, 0);
    let mut too_much = base.clone();
    too_much.amount = Decimal::new(10001, 2);
    let mut to_self = base.clone();
    to_self.recipient = Some(alice.user_id);
    let mut no_location = base.clone();
    no_location.recipient_location = None;

    for (req, expect_funds) in [
        (zero, false),
        (negative, false),
        (too_much, true),
        (to_self, false),
        (no_location, false),
    ] {
        let err = svc.create_transfer(&req, &alice).await.unwrap_err();
        if expect_funds {
            assert!(matches!(err, CourierpayError::InsufficientFunds { .. }), "{err}");
        } else {
            assert!(matches!(err, CourierpayError::Validation { .. }), "{err}");
        }
    }

    assert_eq!(balance(&svc, src.id), Decimal::new(100, 0));
    assert_eq!(balance(&svc, dst.id), Decimal::ZERO);
    assert!(svc.transactions_for(&alice).is_empty());
}

#[tokio::test]
async fn missing_rate_is_conversion_unavailable() {
    let svc = service_with(StaticRateOracle::new());
    let alice = onboard(&svc, "alice@x.io", Role::User);
    let bob = onboard(&svc, "bob@x.io", Role::User);
    let src = svc
        .open_card(&alice, "1111", "Alice", "AED", Decimal::new(100, 0))
        .unwrap();
    let dst = svc.open_wallet(&bob, "USD", Decimal::ZERO).unwrap();

    let req = TransferRequest::new(TransactionType::SendMoney, src.id, Decimal::new(50, 0), "AED")
        .with_recipient(bob.user_id)
        .with_sender_location(dubai())
        .with_recipient_location(dubai())
        .converting_to("USD");
    let err = svc.create_transfer(&req, &alice).await.unwrap_err();

    assert!(matches!(err, CourierpayError::ConversionUnavailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(balance(&svc, src.id), Decimal::new(100, 0));
    assert_eq!(balance(&svc, dst.id), Decimal::ZERO);
    assert!(svc.transactions_for(&alice).is_empty());
}

#[tokio::test]
async fn wallet_to_card_with_conversion() {
    let svc = service_with(
        StaticRateOracle::new().with_rate(ccy("USD"), ccy("AED"), Decimal::new(36725, 4)),
    );
    let alice = onboard(&svc, "alice@x.io", Role::User);
    let wallet = svc.open_wallet(&alice, "USD", Decimal::new(100, 0)).unwrap();
    let card = svc
        .open_card(&alice, "9999", "Alice", "AED", Decimal::ZERO)
        .unwrap();

    let req = TransferRequest::new(TransactionType::WalletToCard, wallet.id, Decimal::new(10, 0), "USD")
        .with_target_account(card.id)
        .converting_to("AED");
    let tx = svc.create_transfer(&req, &alice).await.unwrap();

    // 10 * 3.6725 = 36.725 -> 36.73
    assert_eq!(balance(&svc, wallet.id), Decimal::new(90, 0));
    assert_eq!(balance(&svc, card.id), Decimal::new(3673, 2));
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(tx.fee, Decimal::ZERO);

    // Completed own-instrument moves are not offered to couriers.
    let courier = onboard(&svc, "c@x.io", Role::Delivery);
    assert!(svc.transactions_for(&courier).is_empty());
    assert!(matches!(
        svc.claim_delivery(tx.id, &courier).unwrap_err(),
        CourierpayError::Conflict { .. }
    ));
}

#[tokio::test]
async fn admin_fails_stuck_deposit_without_refund() {
    let svc = service();
    let alice = onboard(&svc, "alice@x.io", Role::User);
    let card = svc
        .open_card(&alice, "1111", "Alice", "AED", Decimal::new(100, 0))
        .unwrap();
    let req = TransferRequest::new(TransactionType::Deposit, card.id, Decimal::new(40, 0), "AED")
        .with_sender_location(dubai());
    let tx = svc.create_transfer(&req, &alice).await.unwrap();

    assert!(matches!(
        svc.fail_transaction(tx.id, &alice).unwrap_err(),
        CourierpayError::Authorization { .. }
    ));
    svc.fail_transaction(tx.id, &admin_of(&svc)).unwrap();
    assert_eq!(
        svc.transaction(tx.id, &alice).unwrap().status,
        TransactionStatus::Failed
    );
    assert_eq!(balance(&svc, card.id), Decimal::new(60, 0));
    assert!(matches!(
        svc.record_signature(tx.id, &alice, "<svg/>").unwrap_err(),
        CourierpayError::Conflict { .. }
    ));
}

#[test]
fn service_from_json_config() {
    let config = ServiceConfig::from_json(
        r#"{"fee_rate":"0.05","registration":{"ttl_secs":30,"otp_digits":4}}"#,
    )
    .unwrap();
    let svc = CourierPay::new(config, Arc::new(StaticRateOracle::new())).unwrap();
    assert_eq!(svc.config().fee_rate, Decimal::new(5, 2));
    let otp = svc.stage_registration("x@y.io", Role::User).unwrap();
    assert_eq!(otp.len(), 4);
    assert_eq!(svc.purge_expired_registrations(), 0);
}

#[test]
fn unknown_user_cannot_be_approved() {
    let svc = service();
    let err = svc
        .set_user_status(&admin(&svc), courierpay_types::UserId::new(), VerificationStatus::Verified)
        .unwrap_err();
    assert!(matches!(err, CourierpayError::NotFound { .. }));
}

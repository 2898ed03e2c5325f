//! Integration tests for the order, payment and checkout-session records.

use chrono::Utc;
use common::{Currency, Money};
use domain::{
    Adjustment, AdjustmentKind, CheckoutSession, DomainError, LineItem, Order, OrderState,
    Payment, PaymentState, RefundType,
};

fn order_at_payment_step() -> Order {
    let mut order = Order::new("R200", Currency::usd());
    order.add_line_item(LineItem::new("SKU-001", "Widget", 1, Money::from_cents(5000)));
    order.begin_payment().unwrap();
    order
}

#[test]
fn test_authorization_then_capture_lifecycle() {
    let mut order = order_at_payment_step();
    let mut session = CheckoutSession::new("EC-T1", "P1");

    let payment = Payment::new(order.outstanding_balance(), order.currency.clone(), session.id, 1);
    let payment_id = payment.id;
    order.add_payment(payment).unwrap();
    assert_eq!(order.authorized_payment_total(), Money::zero());

    let payment = order.payment_mut(payment_id).unwrap();
    payment.start_processing().unwrap();
    session.record_authorization("AUTH-9");
    payment.mark_authorized().unwrap();

    assert!(session.can_capture(order.payment(payment_id).unwrap()));
    assert_eq!(order.outstanding_balance(), Money::zero());

    order.complete(Utc::now()).unwrap();
    assert_eq!(order.state, OrderState::Complete);

    session.record_transaction("TXN-9");
    order.payment_mut(payment_id).unwrap().mark_completed().unwrap();
    assert!(!session.can_capture(order.payment(payment_id).unwrap()));
    assert_eq!(order.payment(payment_id).unwrap().state, PaymentState::Completed);
}

#[test]
fn test_existing_payment_reduces_outstanding_balance() {
    let mut order = order_at_payment_step();
    order.add_adjustment(Adjustment::new(
        "Gift wrap",
        Money::from_cents(300),
        AdjustmentKind::Other,
    ));

    let mut held = Payment::new(Money::from_cents(2000), Currency::usd(), CheckoutSession::new("EC-0", "P0").id, 1);
    held.start_processing().unwrap();
    held.mark_authorized().unwrap();
    order.add_payment(held).unwrap();

    assert_eq!(order.total().cents(), 5300);
    assert_eq!(order.outstanding_balance().cents(), 3300);
}

#[test]
fn test_refund_is_recorded_once_on_the_session() {
    let mut session = CheckoutSession::new("EC-T2", "P2");
    session.record_transaction("TXN-1");
    session.record_refund("REF-1", RefundType::Full, Utc::now());

    assert!(session.is_refunded());
    assert_eq!(session.refund_type, Some(RefundType::Full));
    assert_eq!(session.transaction_id.as_deref(), Some("TXN-1"));
}

#[test]
fn test_completed_order_still_takes_additional_payments() {
    let mut order = order_at_payment_step();
    order.complete(Utc::now()).unwrap();

    let extra = Payment::new(Money::from_cents(100), Currency::usd(), CheckoutSession::new("EC-3", "P3").id, 1);
    order.add_payment(extra).unwrap();
    assert_eq!(order.unprocessed_payment_ids().len(), 1);

    assert!(matches!(
        order.complete(Utc::now()),
        Err(DomainError::InvalidOrderTransition { .. })
    ));
}

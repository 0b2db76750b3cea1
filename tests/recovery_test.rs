mod common;

use common::{ADMIN, SECOND_ADMIN, TestBed, submitted_order};
use storefront::application::config::SessionPolicy;
use storefront::application::engine::Resolution;
use storefront::domain::event::{Decision, FormStep};
use storefront::domain::notification::Notification;
use storefront::domain::order::{Order, OrderId, OrderLogEntry, OrderState};
use storefront::domain::ports::{CatalogStore, OrderLog, OrderStore, ReferenceGuard};
use storefront::domain::product::Stock;

fn restart(bed: &TestBed) -> TestBed {
    TestBed::over(
        bed.catalog.clone(),
        bed.orders.clone(),
        bed.log.clone(),
        bed.guard.clone(),
        SessionPolicy::Replace,
    )
}

#[tokio::test]
async fn test_pending_orders_are_represented_after_restart() {
    let before = TestBed::new(Stock::Finite(2), SessionPolicy::Replace).await;
    let pending = submitted_order(&before.engine, 10, "TXN1").await;
    let in_progress = before.engine.select_product(20, "P1").await.unwrap();
    assert_eq!(pending.id.as_str(), "ORD-00000001");
    assert_eq!(in_progress.id.as_str(), "ORD-00000002");

    let after = restart(&before);
    assert_eq!(after.engine.recover().await.unwrap(), 1);

    for admin in [ADMIN, SECOND_ADMIN] {
        let sent = after.notifier.sent_to(admin).await;
        assert!(matches!(
            sent.as_slice(),
            [Notification::DecisionRequest { ticket, .. }] if ticket.order_id == pending.id
        ));
    }

    // Ids keep counting from where the previous run stopped.
    let next = after.engine.select_product(30, "P1").await.unwrap();
    assert_eq!(next.id.as_str(), "ORD-00000003");

    // The interrupted buyer picks up where they left off.
    after
        .engine
        .advance_field(20, FormStep::Pay)
        .await
        .unwrap();

    after
        .engine
        .decide(ADMIN, &pending.id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(after.stock().await, Stock::Finite(1));
}

#[tokio::test]
async fn test_recover_is_idempotent_for_tickets() {
    let before = TestBed::new(Stock::Unlimited, SessionPolicy::Replace).await;
    let pending = submitted_order(&before.engine, 10, "TXN1").await;

    let after = restart(&before);
    after.engine.recover().await.unwrap();
    after.engine.recover().await.unwrap();

    let tickets = after.engine.outstanding_decisions();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].order_id, pending.id);
    assert_eq!(tickets[0].presentations, 2);
}

#[tokio::test]
async fn test_recover_removes_resolved_leftovers() {
    let before = TestBed::new(Stock::Unlimited, SessionPolicy::Replace).await;
    let mut order = Order::new(OrderId::sequential(7), 10, "P1");
    order.reject().unwrap();
    before.orders.put_order(order.clone()).await.unwrap();

    let after = restart(&before);
    assert_eq!(after.engine.recover().await.unwrap(), 0);
    assert!(after.orders.order(&order.id).await.unwrap().is_none());
    assert!(matches!(
        after.notifier.sent_to(10).await.as_slice(),
        [Notification::Rejected { .. }]
    ));

    let next = after.engine.select_product(10, "P1").await.unwrap();
    assert_eq!(next.id.as_str(), "ORD-00000008");
    assert_eq!(next.state, OrderState::CollectingInfo);
}

/// Replays the first steps of an approval by hand, as if the process died
/// right after writing the Order Log.
async fn approve_until_logged(bed: &TestBed, order: &Order) {
    let reference = order.reference.clone().unwrap();
    assert!(bed.guard.commit(&reference).await.unwrap());
    bed.catalog.take_unit("P1").await.unwrap();
    let mut approved = order.clone();
    approved.approve().unwrap();
    bed.log
        .append(OrderLogEntry::from_approved(&approved, "Ebook").unwrap())
        .await
        .unwrap();
}

fn deliveries(sent: &[Notification]) -> usize {
    sent.iter()
        .filter(|n| matches!(n, Notification::Delivered { .. }))
        .count()
}

#[tokio::test]
async fn test_crash_after_log_append_delivers_on_restart() {
    let before = TestBed::new(Stock::Finite(2), SessionPolicy::Replace).await;
    let pending = submitted_order(&before.engine, 10, "TXN1").await;
    approve_until_logged(&before, &pending).await;

    let after = restart(&before);
    assert_eq!(after.engine.recover().await.unwrap(), 0);

    assert_eq!(deliveries(&after.notifier.sent_to(10).await), 1);
    assert!(after.orders.order(&pending.id).await.unwrap().is_none());
    assert!(after.orders.session(10).await.unwrap().is_none());
    assert!(after.engine.outstanding_decisions().is_empty());
    assert!(after.notifier.sent_to(ADMIN).await.is_empty());
    assert_eq!(after.log.entries().await.unwrap().len(), 1);
    assert_eq!(after.stock().await, Stock::Finite(1));
}

#[tokio::test]
async fn test_logged_order_decided_again_is_completed() {
    let before = TestBed::new(Stock::Finite(2), SessionPolicy::Replace).await;
    let pending = submitted_order(&before.engine, 10, "TXN1").await;
    approve_until_logged(&before, &pending).await;

    // An admin answering the old request before any recovery ran.
    let resolution = before
        .engine
        .decide(ADMIN, &pending.id, Decision::Approve)
        .await
        .unwrap();
    assert!(matches!(resolution, Resolution::Approved(ref e) if e.order_id == pending.id));

    let to_buyer = before.notifier.sent_to(10).await;
    assert_eq!(deliveries(&to_buyer), 1);
    assert!(!to_buyer
        .iter()
        .any(|n| matches!(n, Notification::DuplicateReference { .. })));
    assert!(before.orders.order(&pending.id).await.unwrap().is_none());
    assert_eq!(before.stock().await, Stock::Finite(1));
}

#[tokio::test]
async fn test_approved_leftover_is_delivered_on_restart() {
    let before = TestBed::new(Stock::Unlimited, SessionPolicy::Replace).await;
    let pending = submitted_order(&before.engine, 10, "TXN1").await;
    approve_until_logged(&before, &pending).await;
    let mut approved = pending.clone();
    approved.approve().unwrap();
    before.orders.put_order(approved).await.unwrap();

    let after = restart(&before);
    assert_eq!(after.engine.recover().await.unwrap(), 0);
    assert_eq!(deliveries(&after.notifier.sent_to(10).await), 1);
    assert!(after.orders.all_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unlogged_reference_commit_is_released_on_restart() {
    let before = TestBed::new(Stock::Unlimited, SessionPolicy::Replace).await;
    let pending = submitted_order(&before.engine, 10, "TXN1").await;
    // Died between the guard commit and the log append.
    assert!(before.guard.commit("TXN1").await.unwrap());

    let after = restart(&before);
    assert_eq!(after.engine.recover().await.unwrap(), 1);
    assert!(!after.guard.is_known("TXN1").await.unwrap());

    let resolution = after
        .engine
        .decide(ADMIN, &pending.id, Decision::Approve)
        .await
        .unwrap();
    assert!(matches!(resolution, Resolution::Approved(_)));
    assert_eq!(deliveries(&after.notifier.sent_to(10).await), 1);
}

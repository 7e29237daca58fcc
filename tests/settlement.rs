mod common;

use chrono::{Duration, Utc};
use common::{delivery, Harness};
use jokiin_escrow::{
    db::MarketStore,
    models::{
        offermodels::OfferStatus,
        walletmodels::{AccountKind, WalletTrxType},
    },
    service::{background_jobs::AutoCompletionJob, error::ServiceError},
};

#[tokio::test]
async fn test_completion_credits_net_amount_once() {
    let h = Harness::new().await;
    let offer = h.delivered_offer(100_000, 1).await;

    let outcome = h.escrow.complete_order(h.client, offer.id).await.unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.offer.status, OfferStatus::Completed);

    assert_eq!(
        h.wallet.get_balance(h.freelancer, AccountKind::Freelancer).await.unwrap(),
        90_000
    );
    let entries = h.wallet.list_transactions(h.freelancer, 1, 20).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].trx_type, WalletTrxType::Credit);
    assert_eq!(entries[0].amount, 90_000);
    assert_eq!(entries[0].reference_id, Some(offer.id));
    assert_eq!(
        entries[0].description,
        format!("Payment for order #{}", offer.order_code)
    );

    let repeat = h.escrow.complete_order(h.client, offer.id).await.unwrap();
    assert!(!repeat.applied);
    assert_eq!(h.wallet.list_transactions(h.freelancer, 1, 20).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completion_settles_exactly_once() {
    let h = Harness::new().await;
    let offer = h.delivered_offer(100_000, 1).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let escrow = h.escrow.clone();
        let client = h.client;
        let offer_id = offer.id;
        tasks.push(tokio::spawn(async move {
            escrow.complete_order(client, offer_id).await
        }));
    }

    let mut applied = 0;
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.offer.status, OfferStatus::Completed);
        if outcome.applied {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(
        h.wallet.get_balance(h.freelancer, AccountKind::Freelancer).await.unwrap(),
        90_000
    );
    assert_eq!(h.wallet.list_transactions(h.freelancer, 1, 20).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_client_and_auto_completion_race_settles_once() {
    for _ in 0..10 {
        let h = Harness::new().await;
        let offer = h.delivered_offer(100_000, 1).await;
        assert!(
            h.store
                .set_offer_updated_at(offer.id, Utc::now() - Duration::hours(73))
                .await
        );
        let cutoff = Utc::now() - Duration::hours(72);

        let (escrow, client, offer_id) = (h.escrow.clone(), h.client, offer.id);
        let by_client = tokio::spawn(async move { escrow.complete_order(client, offer_id).await });
        let escrow = h.escrow.clone();
        let by_job = tokio::spawn(async move { escrow.auto_complete(offer_id, cutoff).await });

        let client_outcome = by_client.await.unwrap().unwrap();
        let job_outcome = by_job.await.unwrap().unwrap();
        assert_eq!(client_outcome.offer.status, OfferStatus::Completed);
        assert_eq!(job_outcome.offer.status, OfferStatus::Completed);
        assert!(client_outcome.applied ^ job_outcome.applied);

        let entries = h.wallet.list_transactions(h.freelancer, 1, 20).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].trx_type, WalletTrxType::Credit);
        assert_eq!(
            h.wallet.get_balance(h.freelancer, AccountKind::Freelancer).await.unwrap(),
            90_000
        );
    }
}

#[tokio::test]
async fn test_completion_guards() {
    let h = Harness::new().await;
    let offer = h.paid_offer(100_000, 1).await;

    let err = h.escrow.complete_order(h.client, offer.id).await.unwrap_err();
    match err {
        ServiceError::Conflict(message) => {
            assert_eq!(message, "only delivered orders can be completed")
        }
        other => panic!("unexpected error: {:?}", other),
    }

    h.offers.deliver_work(h.freelancer, offer.id, delivery()).await.unwrap();
    let err = h.escrow.complete_order(h.freelancer, offer.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    assert_eq!(h.offer(offer.id).await.status, OfferStatus::Delivered);
    assert_eq!(
        h.wallet.get_balance(h.freelancer, AccountKind::Freelancer).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_cancel_paid_offer_refunds_client() {
    let h = Harness::new().await;
    let offer = h.paid_offer(50_000, 1).await;

    let outcome = h.escrow.cancel_order(h.freelancer, offer.id).await.unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.offer.status, OfferStatus::Cancelled);

    assert_eq!(
        h.wallet.get_balance(h.client, AccountKind::Client).await.unwrap(),
        50_000
    );
    assert_eq!(
        h.wallet.get_balance(h.freelancer, AccountKind::Freelancer).await.unwrap(),
        0
    );

    let entries = h.wallet.list_transactions(h.client, 1, 20).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].trx_type, WalletTrxType::Refund);
    assert_eq!(entries[0].amount, 50_000);

    let repeat = h.escrow.cancel_order(h.freelancer, offer.id).await.unwrap();
    assert!(!repeat.applied);
    assert_eq!(h.wallet.list_transactions(h.client, 1, 20).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_pending_offer_moves_no_money() {
    let h = Harness::new().await;
    let offer = h.create_offer(50_000, 1).await;

    let outcome = h.escrow.cancel_order(h.freelancer, offer.id).await.unwrap();
    assert_eq!(outcome.offer.status, OfferStatus::Cancelled);

    assert!(h.wallet.list_transactions(h.client, 1, 20).await.unwrap().is_empty());
    assert!(h.wallet.list_transactions(h.freelancer, 1, 20).await.unwrap().is_empty());
    assert_eq!(h.wallet.get_balance(h.client, AccountKind::Client).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_rejected_once_work_started() {
    let h = Harness::new().await;
    let offer = h.paid_offer(50_000, 1).await;
    h.offers.start_work(h.freelancer, offer.id).await.unwrap();

    let err = h.escrow.cancel_order(h.freelancer, offer.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let err = h.escrow.cancel_order(h.client, offer.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    assert_eq!(h.offer(offer.id).await.status, OfferStatus::Working);
}

#[tokio::test]
async fn test_sweep_settles_stale_deliveries_once() {
    let h = Harness::new().await;
    let stale = h.delivered_offer(100_000, 1).await;
    let fresh = h.delivered_offer(40_000, 1).await;

    let delivered_at = Utc::now() - Duration::hours(73);
    assert!(h.store.set_offer_updated_at(stale.id, delivered_at).await);

    let job = AutoCompletionJob::new(
        h.shared_store(),
        h.escrow.clone(),
        tokio::time::Duration::from_secs(3600),
        Duration::hours(72),
    );

    let report = job.sweep(Utc::now()).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 0);

    assert_eq!(h.offer(stale.id).await.status, OfferStatus::Completed);
    assert_eq!(h.offer(fresh.id).await.status, OfferStatus::Delivered);

    let entries = h.wallet.list_transactions(h.freelancer, 1, 20).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].description,
        format!("Automatic settlement for order #{}", stale.order_code)
    );

    let rerun = job.sweep(Utc::now()).await.unwrap();
    assert_eq!(rerun.scanned, 0);
    assert_eq!(rerun.completed, 0);
    assert_eq!(
        h.wallet.get_balance(h.freelancer, AccountKind::Freelancer).await.unwrap(),
        90_000
    );
}

#[tokio::test]
async fn test_sweep_skips_offer_redelivered_after_selection() {
    let h = Harness::new().await;
    let offer = h.delivered_offer(100_000, 1).await;

    // cutoff older than the latest delivery
    let cutoff = Utc::now() - Duration::hours(72);
    let outcome = h.escrow.auto_complete(offer.id, cutoff).await.unwrap();

    assert!(!outcome.applied);
    assert_eq!(h.offer(offer.id).await.status, OfferStatus::Delivered);
    assert!(h.wallet.list_transactions(h.freelancer, 1, 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scheduler_stops_cleanly() {
    let h = Harness::new().await;
    let offer = h.delivered_offer(100_000, 1).await;
    h.store
        .set_offer_updated_at(offer.id, Utc::now() - Duration::hours(80))
        .await;

    let handle = AutoCompletionJob::new(
        h.shared_store(),
        h.escrow.clone(),
        tokio::time::Duration::from_secs(3600),
        Duration::hours(72),
    )
    .start();

    // the first tick fires immediately
    let mut settled = false;
    for _ in 0..50 {
        if h.offer(offer.id).await.status == OfferStatus::Completed {
            settled = true;
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    handle.stop().await;

    assert!(settled);
}

#[tokio::test]
async fn test_ledger_reconciles_after_settlements() {
    let h = Harness::new().await;
    let completed = h.delivered_offer(100_000, 1).await;
    h.escrow.complete_order(h.client, completed.id).await.unwrap();
    let cancelled = h.paid_offer(50_000, 1).await;
    h.escrow.cancel_order(h.freelancer, cancelled.id).await.unwrap();

    let freelancer = h.wallet.reconcile(h.freelancer).await.unwrap();
    assert!(freelancer.consistent);
    assert_eq!(freelancer.ledger_total, 90_000);

    let client = h.wallet.reconcile(h.client).await.unwrap();
    assert!(client.consistent);
    assert_eq!(client.balance_total, 50_000);

    let summary = h.wallet.summary(h.freelancer).await.unwrap();
    assert_eq!(summary.total_credits, 90_000);
    assert_eq!(summary.total_refunds, 0);

    assert_eq!(
        h.store.list_stale_delivered(Utc::now()).await.unwrap().len(),
        0
    );
}

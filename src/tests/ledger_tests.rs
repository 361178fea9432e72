use futures::future::try_join_all;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::constants::{BALANCE_RECONCILED, MAX_MONEY};
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use crate::tests::{create_group, create_test_parts, create_test_service, register};
use crate::TallyError;

#[tokio::test]
async fn test_create_pending_moves_the_group_balance() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let group = create_group(&service, &alice, "Flat 12").await;

    let rent = service
        .create_pending(
            group.id,
            Some("rent share".to_string()),
            "chase".to_string(),
            "2024-06-01",
            Decimal::new(12050, 2),
            alice.id,
        )
        .await
        .unwrap();
    assert_eq!(rent.money, Decimal::new(12050, 2));
    assert_eq!(rent.date.to_rfc3339(), "2024-06-01T00:00:00+00:00");

    // Negative amounts are refunds; RFC 3339 dates are accepted as-is.
    service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-15T08:30:00Z",
            Decimal::new(-3025, 2),
            alice.id,
        )
        .await
        .unwrap();

    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::new(9025, 2));
}

#[tokio::test]
async fn test_update_pending_applies_the_money_delta() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    let pending = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(100),
            alice.id,
        )
        .await
        .unwrap();

    let updated = service
        .update_pending(
            pending.id,
            None,
            None,
            None,
            Some(Decimal::from(40)),
            alice.id,
        )
        .await
        .unwrap();
    assert_eq!(updated.money, Decimal::from(40));

    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::from(40));
}

#[tokio::test]
async fn test_metadata_only_update_leaves_the_balance_alone() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    let pending = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::new(3333, 2),
            alice.id,
        )
        .await
        .unwrap();

    let updated = service
        .update_pending(
            pending.id,
            Some("groceries".to_string()),
            Some("amex".to_string()),
            Some("2024-06-02".to_string()),
            None,
            alice.id,
        )
        .await
        .unwrap();
    assert_eq!(updated.content.as_deref(), Some("groceries"));
    assert_eq!(updated.bank, "amex");
    assert_eq!(updated.money, Decimal::new(3333, 2));

    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::new(3333, 2));

    let err = service
        .update_pending(pending.id, None, None, None, None, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::NoFieldsToUpdate));
}

#[tokio::test]
async fn test_delete_pending_returns_the_record_and_debits_it() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    let first = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(100),
            alice.id,
        )
        .await
        .unwrap();
    service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-02",
            Decimal::from(50),
            alice.id,
        )
        .await
        .unwrap();

    let removed = service.delete_pending(first.id, alice.id).await.unwrap();
    assert_eq!(removed.id, first.id);
    assert_eq!(removed.money, Decimal::from(100));

    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::from(50));

    let err = service.delete_pending(first.id, alice.id).await.unwrap_err();
    assert!(matches!(err, TallyError::PendingNotFound(_)));
}

#[tokio::test]
async fn test_full_pending_lifecycle_returns_balance_to_zero() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let group = create_group(&service, &alice, "Flat 12").await;

    let pending = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(150),
            alice.id,
        )
        .await
        .unwrap();
    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::from(150));

    service
        .update_pending(
            pending.id,
            None,
            None,
            None,
            Some(Decimal::from(90)),
            alice.id,
        )
        .await
        .unwrap();
    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::from(90));

    service.delete_pending(pending.id, alice.id).await.unwrap();
    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::ZERO);
    assert!(service
        .list_pendings(group.id, 6, 2024, alice.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_concurrent_creates_accumulate_exactly() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let group = create_group(&service, &alice, "Flat 12").await;

    let (a, b) = tokio::join!(
        service.create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(10),
            alice.id,
        ),
        service.create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-02",
            Decimal::from(25),
            alice.id,
        ),
    );
    a.unwrap();
    b.unwrap();

    try_join_all((1..=20).map(|i| {
        service.create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-03",
            Decimal::from(i),
            alice.id,
        )
    }))
    .await
    .unwrap();

    // 10 + 25 + (1 + .. + 20)
    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::from(245));
}

#[tokio::test]
async fn test_listing_filters_by_month_and_sorts_by_date() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    for date in ["2024-06-20", "2024-06-05", "2024-06-11", "2024-07-01", "2024-05-31"] {
        service
            .create_pending(
                group.id,
                None,
                "chase".to_string(),
                date,
                Decimal::from(10),
                alice.id,
            )
            .await
            .unwrap();
    }

    let june = service.list_pendings(group.id, 6, 2024, alice.id).await.unwrap();
    let dates: Vec<_> = june.iter().map(|p| p.date.format("%Y-%m-%d").to_string()).collect();
    assert_eq!(dates, ["2024-06-05", "2024-06-11", "2024-06-20"]);

    let july = service.list_pendings(group.id, 7, 2024, alice.id).await.unwrap();
    assert_eq!(july.len(), 1);
    assert!(service
        .list_pendings(group.id, 6, 2023, alice.id)
        .await
        .unwrap()
        .is_empty());

    let err = service
        .list_pendings(group.id, 13, 2024, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::InvalidPeriod { month: 13, .. }));
    let err = service
        .list_pendings(group.id, 6, 1800, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::InvalidPeriod { year: 1800, .. }));
}

#[tokio::test]
async fn test_bad_input_is_rejected_before_anything_is_written() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let group = create_group(&service, &alice, "Flat 12").await;

    let err = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "junk",
            Decimal::from(10),
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::InvalidDate(_)));

    let err = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(MAX_MONEY) + Decimal::ONE,
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::InvalidMoney));

    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::ZERO);
    assert!(service
        .list_pendings(group.id, 6, 2024, alice.id)
        .await
        .unwrap()
        .is_empty());

    // The magnitude bound is inclusive, in both directions.
    service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(-MAX_MONEY),
            alice.id,
        )
        .await
        .unwrap();

    let pending = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-02",
            Decimal::from(10),
            alice.id,
        )
        .await
        .unwrap();
    let err = service
        .update_pending(
            pending.id,
            None,
            None,
            Some("not a date".to_string()),
            None,
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::InvalidDate(_)));
    let unchanged = service.list_pendings(group.id, 6, 2024, alice.id).await.unwrap();
    assert_eq!(unchanged[1].date.format("%Y-%m-%d").to_string(), "2024-06-02");
}

#[tokio::test]
async fn test_pending_mutations_are_member_gated() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let mallory = register(&service, "mallory").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    let pending = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(100),
            alice.id,
        )
        .await
        .unwrap();

    let err = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(10),
            mallory.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::NotGroupMember(_)));

    let err = service
        .update_pending(
            pending.id,
            None,
            None,
            None,
            Some(Decimal::from(1)),
            mallory.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::NotGroupMember(_)));

    let err = service.delete_pending(pending.id, mallory.id).await.unwrap_err();
    assert!(matches!(err, TallyError::NotGroupMember(_)));

    let err = service
        .list_pendings(group.id, 6, 2024, mallory.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::NotGroupMember(_)));

    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::from(100));
}

#[tokio::test]
async fn test_touching_a_missing_pending_is_not_found() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    create_group(&service, &alice, "Flat 12").await;

    let err = service
        .update_pending(
            Uuid::new_v4(),
            None,
            None,
            None,
            Some(Decimal::from(1)),
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::PendingNotFound(_)));

    let err = service.delete_pending(Uuid::new_v4(), alice.id).await.unwrap_err();
    assert!(matches!(err, TallyError::PendingNotFound(_)));
}

#[tokio::test]
async fn test_reconcile_repairs_a_drifted_balance() {
    let (service, storage, logging) = create_test_parts();
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    service
        .add_members(&group.slug, &["bob".to_string()], alice.id)
        .await
        .unwrap();
    for money in [10, 20] {
        service
            .create_pending(
                group.id,
                None,
                "chase".to_string(),
                "2024-06-01",
                Decimal::from(money),
                alice.id,
            )
            .await
            .unwrap();
    }

    storage
        .set_group_balance(group.id, Decimal::from(999))
        .await
        .unwrap();

    let err = service.reconcile_group(&group.slug, bob.id).await.unwrap_err();
    assert!(matches!(err, TallyError::NotGroupAdmin(_)));

    let report = service.reconcile_group(&group.slug, alice.id).await.unwrap();
    assert!(report.drifted);
    assert_eq!(report.previous, Decimal::from(999));
    assert_eq!(report.recomputed, Decimal::from(30));
    let seen = service.get_group(&group.slug, alice.id).await.unwrap();
    assert_eq!(seen.base_money, Decimal::from(30));

    let again = service.reconcile_group(&group.slug, alice.id).await.unwrap();
    assert!(!again.drifted);
    assert_eq!(again.previous, again.recomputed);

    let logs = logging.get_logs().await.unwrap();
    assert_eq!(
        logs.iter().filter(|l| l.action == BALANCE_RECONCILED).count(),
        2
    );
}

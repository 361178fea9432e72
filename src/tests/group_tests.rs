use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::constants::{GROUP_CREATED, MEMBERS_ADDED};
use crate::core::models::Member;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use crate::tests::{create_group, create_test_parts, create_test_service, register};
use crate::TallyError;

#[tokio::test]
async fn test_create_group_makes_creator_the_admin_member() {
    let (service, _storage, logging) = create_test_parts();
    let alice = register(&service, "alice").await;

    let group = create_group(&service, &alice, "Flat 12").await;
    assert_eq!(group.name, "Flat 12");
    assert_eq!(group.slug, "flat-12");
    assert_eq!(group.admin_id, alice.id);
    assert_eq!(group.base_money, Decimal::ZERO);

    let members = service.members_of(&group.slug, alice.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].0.user_id, alice.id);
    assert!(members[0].0.is_admin);

    let logs = logging.get_logs().await.unwrap();
    assert_eq!(logs.last().unwrap().action, GROUP_CREATED);
}

#[tokio::test]
async fn test_group_slugs_stay_unique() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;

    let first = create_group(&service, &alice, "Trip Fund").await;
    let second = create_group(&service, &alice, "Trip Fund").await;
    let third = create_group(&service, &alice, "  Trip   Fund!! ").await;

    assert_eq!(first.slug, "trip-fund");
    assert_eq!(second.slug, "trip-fund-2");
    assert_eq!(third.slug, "trip-fund-3");
}

#[tokio::test]
async fn test_group_detail_requires_membership() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let group = create_group(&service, &alice, "Flat 12").await;

    let err = service.get_group(&group.slug, bob.id).await.unwrap_err();
    assert!(matches!(err, TallyError::NotGroupMember(_)));
    assert!(service.my_groups(bob.id).await.unwrap().is_empty());

    // Admin-gated mutations are no different for outsiders.
    let err = service
        .add_members(&group.slug, &["bob".to_string()], bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::NotGroupAdmin(_)));
    assert_eq!(service.members_of(&group.slug, alice.id).await.unwrap().len(), 1);

    service
        .add_members(&group.slug, &["bob".to_string()], alice.id)
        .await
        .unwrap();
    let seen = service.get_group(&group.slug, bob.id).await.unwrap();
    assert_eq!(seen.id, group.id);
    assert_eq!(service.my_groups(bob.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_group_keeps_slug_and_checks_admin() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    service
        .add_members(&group.slug, &["bob".to_string()], alice.id)
        .await
        .unwrap();

    let err = service
        .update_group(&group.slug, None, None, None, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::NoFieldsToUpdate));

    let err = service
        .update_group(&group.slug, Some("Renamed".to_string()), None, None, bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::NotGroupAdmin(_)));

    let updated = service
        .update_group(
            &group.slug,
            Some("Flat 12b".to_string()),
            Some("the new flat".to_string()),
            None,
            alice.id,
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Flat 12b");
    assert_eq!(updated.description.as_deref(), Some("the new flat"));
    // The slug is the stable handle; renames never move it.
    assert_eq!(updated.slug, "flat-12");
    assert_eq!(updated.base_money, group.base_money);
}

#[tokio::test]
async fn test_delete_group_hides_it_from_every_read() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    service
        .add_members(&group.slug, &["bob".to_string()], alice.id)
        .await
        .unwrap();
    let pending = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(25),
            alice.id,
        )
        .await
        .unwrap();

    let err = service.delete_group(&group.slug, bob.id).await.unwrap_err();
    assert!(matches!(err, TallyError::NotGroupAdmin(_)));

    service.delete_group(&group.slug, alice.id).await.unwrap();

    let err = service.get_group(&group.slug, alice.id).await.unwrap_err();
    assert!(matches!(err, TallyError::GroupNotFound(_)));
    assert!(service.my_groups(alice.id).await.unwrap().is_empty());

    // Pending mutations all hit the missing group, even through an id that
    // still resolves a record.
    let err = service
        .create_pending(
            group.id,
            None,
            "chase".to_string(),
            "2024-06-01",
            Decimal::from(10),
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::GroupNotFound(_)));
    let err = service
        .update_pending(
            pending.id,
            None,
            None,
            None,
            Some(Decimal::from(1)),
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::GroupNotFound(_)));
    let err = service.delete_pending(pending.id, alice.id).await.unwrap_err();
    assert!(matches!(err, TallyError::GroupNotFound(_)));
}

#[tokio::test]
async fn test_add_members_by_username_batch() {
    let (service, _storage, logging) = create_test_parts();
    let alice = register(&service, "alice").await;
    register(&service, "bob").await;
    register(&service, "carol").await;
    let group = create_group(&service, &alice, "Flat 12").await;

    let added = service
        .add_members(
            &group.slug,
            &["bob".to_string(), "carol".to_string()],
            alice.id,
        )
        .await
        .unwrap();
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|(m, _)| !m.is_admin));
    assert_eq!(added[0].1.username, "bob");
    assert_eq!(added[1].1.username, "carol");

    let members = service.members_of(&group.slug, alice.id).await.unwrap();
    assert_eq!(members.len(), 3);

    let logs = logging.get_logs().await.unwrap();
    assert_eq!(logs.last().unwrap().action, MEMBERS_ADDED);
}

#[tokio::test]
async fn test_add_members_rejects_unknown_and_duplicate_users() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    register(&service, "bob").await;
    let group = create_group(&service, &alice, "Flat 12").await;

    let err = service
        .add_members(
            &group.slug,
            &["bob".to_string(), "ghost".to_string()],
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::UserNotFound(name) if name == "ghost"));
    // Checked up front, so bob was not inserted either.
    let members = service.members_of(&group.slug, alice.id).await.unwrap();
    assert_eq!(members.len(), 1);

    let err = service.add_members(&group.slug, &[], alice.id).await.unwrap_err();
    assert!(matches!(err, TallyError::MissingField(_)));

    service
        .add_members(&group.slug, &["bob".to_string()], alice.id)
        .await
        .unwrap();
    let err = service
        .add_members(&group.slug, &["bob".to_string()], alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::AlreadyGroupMember(name) if name == "bob"));
}

#[tokio::test]
async fn test_remove_member_protects_the_owning_admin() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let carol = register(&service, "carol").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    service
        .add_members(
            &group.slug,
            &["bob".to_string(), "carol".to_string()],
            alice.id,
        )
        .await
        .unwrap();

    let err = service
        .remove_member(&group.slug, carol.id, bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::NotGroupAdmin(_)));

    let err = service
        .remove_member(&group.slug, alice.id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::OwningAdminProtected));

    service
        .remove_member(&group.slug, carol.id, alice.id)
        .await
        .unwrap();
    let members = service.members_of(&group.slug, alice.id).await.unwrap();
    assert_eq!(members.len(), 2);
    let err = service.get_group(&group.slug, carol.id).await.unwrap_err();
    assert!(matches!(err, TallyError::NotGroupMember(_)));
}

#[tokio::test]
async fn test_peer_admin_cannot_remove_the_owning_admin() {
    let (service, storage, _logging) = create_test_parts();
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let carol = register(&service, "carol").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    service
        .add_members(&group.slug, &["carol".to_string()], alice.id)
        .await
        .unwrap();
    // Seed bob as a second admin behind the service.
    let now = Utc::now();
    storage
        .add_member(Member {
            id: Uuid::new_v4(),
            group_id: group.id,
            user_id: bob.id,
            is_admin: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    service
        .remove_member(&group.slug, carol.id, bob.id)
        .await
        .unwrap();

    let err = service
        .remove_member(&group.slug, alice.id, bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TallyError::OwningAdminProtected));
    let members = service.members_of(&group.slug, bob.id).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_leave_group_except_for_the_owning_admin() {
    let service = create_test_service();
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let carol = register(&service, "carol").await;
    let group = create_group(&service, &alice, "Flat 12").await;
    service
        .add_members(&group.slug, &["bob".to_string()], alice.id)
        .await
        .unwrap();

    let err = service.leave_group(&group.slug, carol.id).await.unwrap_err();
    assert!(matches!(err, TallyError::NotGroupMember(_)));

    let err = service.leave_group(&group.slug, alice.id).await.unwrap_err();
    assert!(matches!(err, TallyError::OwningAdminCannotLeave));

    service.leave_group(&group.slug, bob.id).await.unwrap();
    let members = service.members_of(&group.slug, alice.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert!(service.my_groups(bob.id).await.unwrap().is_empty());
}

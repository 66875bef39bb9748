use dealshub_core::db::{open_db, open_db_in_memory};
use dealshub_core::model::group_deal::{
    GroupDealFilter, GroupDealStatus, NewGroupDeal, SlotError, SlotStatus, MAX_GROUP_DEAL_SLOTS,
};
use dealshub_core::model::user::User;
use dealshub_core::model::vendor::{NewVendor, Vendor};
use dealshub_core::model::{now_epoch_ms, UserId, VendorId};
use dealshub_core::repo::group_deal_repo::SqliteGroupDealRepository;
use dealshub_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use dealshub_core::repo::vendor_repo::{SqliteVendorRepository, VendorRepository};
use dealshub_core::{GroupDealService, GroupDealServiceError, PageRequest};
use rusqlite::Connection;
use std::sync::Barrier;
use std::thread;
use uuid::Uuid;

type Service<'conn> = GroupDealService<
    SqliteGroupDealRepository<'conn>,
    SqliteUserRepository<'conn>,
    SqliteVendorRepository<'conn>,
>;

fn service(conn: &Connection) -> Service<'_> {
    GroupDealService::new(
        SqliteGroupDealRepository::new(conn),
        SqliteUserRepository::new(conn),
        SqliteVendorRepository::new(conn),
    )
}

fn seed_user(conn: &Connection, email: &str) -> UserId {
    let user = User::new(Uuid::new_v4(), email, 0).unwrap();
    SqliteUserRepository::new(conn).insert_user(&user).unwrap();
    user.id
}

fn seed_vendor(conn: &Connection, owner: UserId) -> VendorId {
    let vendor = Vendor::from_new(
        NewVendor {
            name: "Mama Put Foods".into(),
            posted_by: Some(owner),
            identity_img: Some("https://cdn.example.com/id.png".into()),
            passport_photo: Some("https://cdn.example.com/passport.png".into()),
            ..NewVendor::default()
        },
        Uuid::new_v4(),
        0,
    )
    .unwrap();
    SqliteVendorRepository::new(conn)
        .insert_vendor(&vendor)
        .unwrap();
    vendor.id
}

fn new_group_deal(owner: UserId, vendor: VendorId, slots: i64, expires_at: i64) -> NewGroupDeal {
    NewGroupDeal {
        user_id: Some(owner),
        vendor_id: Some(vendor),
        title: "Bag of rice".into(),
        description: "50kg bag split between buyers".into(),
        original_price: Some(80_000.0),
        discounted_price: Some(60_000.0),
        discount_percentage: Some(25.0),
        total_slots: Some(slots),
        expires_at: Some(expires_at),
        ..NewGroupDeal::default()
    }
}

fn vendor_total_deals(conn: &Connection, vendor: VendorId) -> u32 {
    SqliteVendorRepository::new(conn)
        .get_vendor(vendor)
        .unwrap()
        .unwrap()
        .total_deals
}

fn far_future() -> i64 {
    now_epoch_ms() + 86_400_000
}

#[test]
fn create_materializes_slots_and_counts_vendor_deal() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "owner@example.com");
    let vendor = seed_vendor(&conn, owner);
    let service = service(&conn);

    let deal = service
        .create_group_deal(new_group_deal(owner, vendor, 3, far_future()))
        .unwrap();
    assert_eq!(deal.slots.len(), 3);
    assert_eq!(deal.vendor_name, "Mama Put Foods");
    assert_eq!(deal.currency, "NGN");
    assert_eq!(vendor_total_deals(&conn, vendor), 1);

    let loaded = service.get_group_deal(deal.id).unwrap();
    assert_eq!(loaded, deal);
    assert!(loaded
        .slots
        .iter()
        .enumerate()
        .all(|(index, slot)| slot.position == index as u32 && slot.status == SlotStatus::Available));
}

#[test]
fn create_requires_existing_user_vendor_and_positive_slots() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "owner@example.com");
    let vendor = seed_vendor(&conn, owner);
    let service = service(&conn);

    assert!(matches!(
        service.create_group_deal(new_group_deal(Uuid::new_v4(), vendor, 2, far_future())),
        Err(GroupDealServiceError::UserNotFound(_))
    ));
    assert!(matches!(
        service.create_group_deal(new_group_deal(owner, Uuid::new_v4(), 2, far_future())),
        Err(GroupDealServiceError::VendorNotFound(_))
    ));
    assert!(matches!(
        service.create_group_deal(new_group_deal(owner, vendor, 0, far_future())),
        Err(GroupDealServiceError::Validation(_))
    ));
    let oversized = i64::from(MAX_GROUP_DEAL_SLOTS) + 1;
    assert!(matches!(
        service.create_group_deal(new_group_deal(owner, vendor, oversized, far_future())),
        Err(GroupDealServiceError::Validation(_))
    ));
    assert_eq!(vendor_total_deals(&conn, vendor), 0);
    let stored: i64 = conn
        .query_row("SELECT COUNT(*) FROM group_deal_slots;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 0);
}

#[test]
fn slots_move_from_reserved_to_paid_until_completion() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "owner@example.com");
    let vendor = seed_vendor(&conn, owner);
    let ada = seed_user(&conn, "ada@example.com");
    let bob = seed_user(&conn, "bob@example.com");
    let cy = seed_user(&conn, "cy@example.com");
    let service = service(&conn);
    let deal = service
        .create_group_deal(new_group_deal(owner, vendor, 2, far_future()))
        .unwrap();

    let first = service.reserve_slot(deal.id, ada).unwrap();
    assert_eq!(first.position, 0);
    assert_eq!(first.available_slots, 1);
    assert!(matches!(
        service.reserve_slot(deal.id, ada),
        Err(GroupDealServiceError::Slot(SlotError::AlreadyJoined(id))) if id == ada
    ));

    let second = service.reserve_slot(deal.id, bob).unwrap();
    assert_eq!(second.position, 1);
    assert_eq!(second.available_slots, 0);
    assert!(matches!(
        service.reserve_slot(deal.id, cy),
        Err(GroupDealServiceError::Slot(SlotError::NoSlotsAvailable))
    ));

    assert!(matches!(
        service.confirm_payment(deal.id, cy),
        Err(GroupDealServiceError::Slot(SlotError::NoReservedSlot(_)))
    ));
    assert_eq!(
        service.confirm_payment(deal.id, ada).unwrap(),
        GroupDealStatus::Active
    );
    assert_eq!(
        service.confirm_payment(deal.id, bob).unwrap(),
        GroupDealStatus::Completed
    );

    let loaded = service.get_group_deal(deal.id).unwrap();
    assert_eq!(loaded.status, GroupDealStatus::Completed);
    assert!(loaded
        .slots
        .iter()
        .all(|slot| slot.status == SlotStatus::Paid && slot.paid_at.is_some()));
}

#[test]
fn expired_deals_reject_reservations_and_drop_out_of_active_list() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "owner@example.com");
    let vendor = seed_vendor(&conn, owner);
    let ada = seed_user(&conn, "ada@example.com");
    let service = service(&conn);
    let live = service
        .create_group_deal(new_group_deal(owner, vendor, 2, far_future()))
        .unwrap();
    let stale = service
        .create_group_deal(new_group_deal(owner, vendor, 2, now_epoch_ms() - 1))
        .unwrap();

    assert!(matches!(
        service.reserve_slot(stale.id, ada),
        Err(GroupDealServiceError::Slot(SlotError::DealExpired))
    ));
    let active: Vec<_> = service
        .active_group_deals()
        .unwrap()
        .into_iter()
        .map(|deal| deal.id)
        .collect();
    assert_eq!(active, vec![live.id]);

    assert_eq!(service.expire_overdue(now_epoch_ms()).unwrap(), 1);
    assert_eq!(service.expire_overdue(now_epoch_ms()).unwrap(), 0);
    let expired = service
        .list_group_deals(
            &GroupDealFilter {
                status: Some(GroupDealStatus::Expired),
                vendor_id: None,
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(expired.total, 1);
    assert_eq!(expired.items[0].id, stale.id);
    assert_eq!(service.vendor_group_deals(vendor).unwrap().len(), 2);
}

#[test]
fn delete_is_blocked_by_paid_slots_and_decrements_vendor_count() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "owner@example.com");
    let vendor = seed_vendor(&conn, owner);
    let ada = seed_user(&conn, "ada@example.com");
    let service = service(&conn);
    let paid = service
        .create_group_deal(new_group_deal(owner, vendor, 2, far_future()))
        .unwrap();
    let unpaid = service
        .create_group_deal(new_group_deal(owner, vendor, 2, far_future()))
        .unwrap();
    assert_eq!(vendor_total_deals(&conn, vendor), 2);

    service.reserve_slot(paid.id, ada).unwrap();
    service.confirm_payment(paid.id, ada).unwrap();
    assert!(matches!(
        service.delete_group_deal(paid.id),
        Err(GroupDealServiceError::Slot(SlotError::HasPaidSlots))
    ));

    service.reserve_slot(unpaid.id, ada).unwrap();
    service.delete_group_deal(unpaid.id).unwrap();
    assert_eq!(vendor_total_deals(&conn, vendor), 1);
    assert!(matches!(
        service.get_group_deal(unpaid.id),
        Err(GroupDealServiceError::GroupDealNotFound(_))
    ));
    let orphan_slots: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM group_deal_slots WHERE group_deal_id = ?1;",
            [unpaid.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphan_slots, 0);
}

#[test]
fn concurrent_reservations_on_separate_connections_take_one_slot() {
    const CONTENDERS: usize = 8;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");

    let (deal_id, users) = {
        let conn = open_db(&path).unwrap();
        let owner = seed_user(&conn, "owner@example.com");
        let vendor = seed_vendor(&conn, owner);
        let deal = service(&conn)
            .create_group_deal(new_group_deal(owner, vendor, 1, far_future()))
            .unwrap();
        let users: Vec<UserId> = (0..CONTENDERS)
            .map(|index| seed_user(&conn, &format!("buyer{index}@example.com")))
            .collect();
        (deal.id, users)
    };

    let barrier = Barrier::new(CONTENDERS);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = users
            .iter()
            .map(|user| {
                let path = &path;
                let barrier = &barrier;
                scope.spawn(move || {
                    let conn = open_db(path).unwrap();
                    barrier.wait();
                    service(&conn).reserve_slot(deal_id, *user).map(|reservation| reservation.position)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let winners: Vec<u32> = results.iter().filter_map(|result| result.as_ref().ok().copied()).collect();
    assert_eq!(winners, vec![0]);
    assert!(results.iter().filter(|result| result.is_err()).all(|result| matches!(
        result,
        Err(GroupDealServiceError::Slot(SlotError::NoSlotsAvailable))
    )));

    let conn = open_db(&path).unwrap();
    let deal = service(&conn).get_group_deal(deal_id).unwrap();
    assert_eq!(deal.available_slots(), 0);
    assert_eq!(
        deal.slots.iter().filter(|slot| slot.status == SlotStatus::Reserved).count(),
        1
    );
}

#[test]
fn storage_rejects_a_second_slot_for_the_same_user() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "owner@example.com");
    let vendor = seed_vendor(&conn, owner);
    let ada = seed_user(&conn, "ada@example.com");
    let service = service(&conn);
    let deal = service
        .create_group_deal(new_group_deal(owner, vendor, 2, far_future()))
        .unwrap();
    service.reserve_slot(deal.id, ada).unwrap();

    let duplicate = conn.execute(
        "UPDATE group_deal_slots
         SET user_id = ?2, status = 'reserved', reserved_at = 1
         WHERE group_deal_id = ?1 AND position = 1;",
        [deal.id.to_string(), ada.to_string()],
    );
    match duplicate {
        Err(rusqlite::Error::SqliteFailure(failure, _)) => {
            assert_eq!(failure.extended_code, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE);
        }
        other => panic!("expected unique violation, got {other:?}"),
    }
}

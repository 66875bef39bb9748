use dealshub_core::db::open_db_in_memory;
use dealshub_core::model::order::{
    NewOrder, NewOrderItem, OrderPatch, OrderStatus, ShippingAddress, ShippingMethodInput,
};
use dealshub_core::model::user::User;
use dealshub_core::model::UserId;
use dealshub_core::repo::order_repo::SqliteOrderRepository;
use dealshub_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use dealshub_core::service::order_service::OrderService;
use dealshub_core::ServiceError;
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> OrderService<SqliteOrderRepository<'_>, SqliteUserRepository<'_>> {
    OrderService::new(SqliteOrderRepository::new(conn), SqliteUserRepository::new(conn))
}

fn seed_user(conn: &Connection, email: &str) -> UserId {
    let user = User::new(Uuid::new_v4(), email, 0).unwrap();
    SqliteUserRepository::new(conn).insert_user(&user).unwrap();
    user.id
}

fn item(product: &str, original: f64, discounted: f64, quantity: i64) -> NewOrderItem {
    NewOrderItem {
        product_id: Some(product.into()),
        title: Some(format!("Product {product}")),
        original_price: Some(original),
        discounted_price: Some(discounted),
        quantity: Some(quantity),
        currency: Some("NGN".into()),
        images: vec!["https://cdn.example.com/p.png".into()],
        ..NewOrderItem::default()
    }
}

fn new_order(user_id: UserId) -> NewOrder {
    NewOrder {
        user_id: Some(user_id),
        items: vec![item("rice-50kg", 60_000.0, 52_500.0, 2), item("oil-5l", 9_000.0, 9_000.0, 1)],
        currency: Some("NGN".into()),
        shipping_address: Some(ShippingAddress {
            name: "Ada Obi".into(),
            address: "12 Allen Avenue".into(),
            lga: "Ikeja".into(),
            state: "Lagos".into(),
            postal_code: "100001".into(),
            phone: "+2348000000000".into(),
        }),
        shipping_method: Some(ShippingMethodInput {
            label: Some("Express".into()),
            price: Some(2_500.0),
            courier: Some("GIG".into()),
            ..ShippingMethodInput::default()
        }),
        payment_reference: None,
    }
}

#[test]
fn orders_store_items_and_derived_totals() {
    let conn = open_db_in_memory().unwrap();
    let user = seed_user(&conn, "buyer@example.com");
    let service = service(&conn);

    let created = service.create_order(new_order(user)).unwrap();
    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.items_total, 114_000.0);
    assert_eq!(created.discount_total, 15_000.0);
    assert_eq!(created.shipping_fee, 2_500.0);
    assert_eq!(created.grand_total, 116_500.0);

    let stored = service.get_order(created.id).unwrap();
    assert_eq!(stored, created);

    assert!(matches!(
        service.create_order(new_order(Uuid::new_v4())),
        Err(ServiceError::NotFound { entity: "user", .. })
    ));
    assert!(matches!(
        service.create_order(NewOrder {
            items: Vec::new(),
            ..new_order(user)
        }),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn listing_is_scoped_per_user() {
    let conn = open_db_in_memory().unwrap();
    let alice = seed_user(&conn, "alice@example.com");
    let bob = seed_user(&conn, "bob@example.com");
    let service = service(&conn);

    service.create_order(new_order(alice)).unwrap();
    service.create_order(new_order(alice)).unwrap();
    let bobs = service.create_order(new_order(bob)).unwrap();

    assert_eq!(service.list_orders(Some(alice)).unwrap().len(), 2);
    assert_eq!(service.list_orders(Some(bob)).unwrap(), vec![bobs]);
    assert_eq!(service.list_orders(None).unwrap().len(), 3);
    assert!(matches!(
        service.list_orders(Some(Uuid::new_v4())),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn status_updates_follow_the_order_lifecycle() {
    let conn = open_db_in_memory().unwrap();
    let user = seed_user(&conn, "buyer@example.com");
    let service = service(&conn);
    let order = service.create_order(new_order(user)).unwrap();

    assert!(matches!(
        service.update_order(
            order.id,
            OrderPatch {
                status: Some("paid".into()),
                ..OrderPatch::default()
            }
        ),
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.update_order(
            order.id,
            OrderPatch {
                status: Some("shipped".into()),
                ..OrderPatch::default()
            }
        ),
        Err(ServiceError::Validation(_))
    ));

    let paid = service
        .update_order(
            order.id,
            OrderPatch {
                status: Some("paid".into()),
                payment_reference: Some("PSK_ref_123".into()),
                ..OrderPatch::default()
            },
        )
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(service.get_order(order.id).unwrap().status, OrderStatus::Paid);

    assert!(matches!(
        service.update_order(
            order.id,
            OrderPatch {
                shipping_method: Some(ShippingMethodInput {
                    label: Some("Pickup".into()),
                    price: Some(0.0),
                    ..ShippingMethodInput::default()
                }),
                ..OrderPatch::default()
            }
        ),
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.update_order(
            order.id,
            OrderPatch {
                status: Some("cancelled".into()),
                ..OrderPatch::default()
            }
        ),
        Err(ServiceError::Conflict(_))
    ));

    let refunded = service
        .update_order(
            order.id,
            OrderPatch {
                status: Some("refunded".into()),
                ..OrderPatch::default()
            },
        )
        .unwrap();
    assert_eq!(refunded.status, OrderStatus::Refunded);
}

#[test]
fn pending_orders_can_change_shipping_and_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let user = seed_user(&conn, "buyer@example.com");
    let service = service(&conn);
    let order = service.create_order(new_order(user)).unwrap();

    let updated = service
        .update_order(
            order.id,
            OrderPatch {
                shipping_method: Some(ShippingMethodInput {
                    label: Some("Pickup".into()),
                    price: Some(0.0),
                    ..ShippingMethodInput::default()
                }),
                ..OrderPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.shipping_fee, 0.0);
    assert_eq!(updated.grand_total, updated.items_total);
    assert_eq!(service.get_order(order.id).unwrap().shipping_method.label, "Pickup");

    service.delete_order(order.id).unwrap();
    assert!(matches!(
        service.get_order(order.id),
        Err(ServiceError::NotFound { entity: "order", .. })
    ));
}

#[test]
fn deleting_a_user_removes_their_orders() {
    let conn = open_db_in_memory().unwrap();
    let user = seed_user(&conn, "buyer@example.com");
    let order = service(&conn).create_order(new_order(user)).unwrap();

    conn.execute("DELETE FROM users WHERE id = ?1;", [user.to_string()])
        .unwrap();
    assert!(matches!(
        service(&conn).get_order(order.id),
        Err(ServiceError::NotFound { .. })
    ));
}

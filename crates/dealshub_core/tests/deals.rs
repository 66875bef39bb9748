use dealshub_core::db::open_db_in_memory;
use dealshub_core::model::comment::{CommentTarget, NewComment};
use dealshub_core::model::deal::{
    Availability, Deal, DealFilter, DealPatch, DealSort, DealStatus, NewDeal, VoteKind,
};
use dealshub_core::repo::comment_repo::SqliteCommentRepository;
use dealshub_core::repo::deal_repo::{DealRepository, SqliteDealRepository};
use dealshub_core::repo::reaction_repo::SqliteReactionRepository;
use dealshub_core::{CommentService, DealService, DealServiceError, PageRequest};
use rusqlite::Connection;
use uuid::Uuid;

fn new_deal(title: &str, original: f64, discounted: f64) -> NewDeal {
    NewDeal {
        title: title.to_string(),
        original_price: Some(original),
        discounted_price: Some(discounted),
        ..NewDeal::default()
    }
}

fn seed(conn: &Connection, input: NewDeal, created_at: i64) -> Deal {
    let deal = Deal::from_new(input, Uuid::new_v4(), created_at).unwrap();
    SqliteDealRepository::new(conn).insert_deal(&deal).unwrap();
    deal
}

fn titles(deals: &[Deal]) -> Vec<&str> {
    deals.iter().map(|deal| deal.title.as_str()).collect()
}

#[test]
fn create_deal_applies_defaults_and_reads_back() {
    let conn = open_db_in_memory().unwrap();
    let service = DealService::new(SqliteDealRepository::new(&conn));

    let mut input = new_deal("Noise Cancelling Headphones", 400.0, 300.0);
    input.shipping_cost = Some("5".to_string());
    input.specifications.insert("color".into(), "black".into());
    let deal = service.create_deal(input).unwrap();

    assert_eq!(deal.slug, "noise-cancelling-headphones");
    assert_eq!(deal.discount_percentage, Some(25.0));
    assert_eq!(deal.shipping_cost, "5.00");
    assert_eq!(deal.currency, "USD");
    assert_eq!(deal.status, DealStatus::Pending);
    assert_eq!(deal.availability, Availability::InStock);
    assert_eq!(deal.specifications["color"], "black");
}

#[test]
fn create_deal_requires_title_and_prices() {
    let conn = open_db_in_memory().unwrap();
    let service = DealService::new(SqliteDealRepository::new(&conn));

    let err = service.create_deal(new_deal("  ", 10.0, 5.0)).unwrap_err();
    assert!(matches!(err, DealServiceError::Validation(_)));

    let mut missing_price = new_deal("Lamp", 10.0, 5.0);
    missing_price.discounted_price = None;
    assert!(matches!(
        service.create_deal(missing_price),
        Err(DealServiceError::Validation(_))
    ));
}

#[test]
fn list_deals_filters_sorts_and_paginates() {
    let conn = open_db_in_memory().unwrap();
    let mut phone = new_deal("Galaxy Phone", 900.0, 600.0);
    phone.category = Some("Electronics".into());
    phone.brand = Some("Samsung".into());
    seed(&conn, phone, 1);
    let mut tv = new_deal("OLED TV", 2000.0, 1800.0);
    tv.category = Some("electronics".into());
    tv.is_saved = true;
    seed(&conn, tv, 2);
    let mut shoes = new_deal("Running Shoes 100%_off", 100.0, 20.0);
    shoes.category = Some("Fashion".into());
    seed(&conn, shoes, 3);

    let service = DealService::new(SqliteDealRepository::new(&conn));
    let all = service
        .list_deals(&DealFilter::default(), PageRequest::default())
        .unwrap();
    assert_eq!(titles(&all.items), vec!["Running Shoes 100%_off", "OLED TV", "Galaxy Phone"]);
    assert_eq!(all.total, 3);

    let electronics = service
        .list_deals(
            &DealFilter {
                category: Some("ELECTRONICS".into()),
                sort: DealSort::PriceLow,
                ..DealFilter::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(titles(&electronics.items), vec!["Galaxy Phone", "OLED TV"]);

    let everything = service
        .list_deals(
            &DealFilter {
                category: Some("all".into()),
                ..DealFilter::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(everything.total, 3);

    let search = service
        .list_deals(
            &DealFilter {
                search: Some("samsung".into()),
                ..DealFilter::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(titles(&search.items), vec!["Galaxy Phone"]);

    let wildcard = service
        .list_deals(
            &DealFilter {
                search: Some("%_".into()),
                ..DealFilter::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(titles(&wildcard.items), vec!["Running Shoes 100%_off"]);

    let discounted = service
        .list_deals(
            &DealFilter {
                min_discount: Some(30.0),
                sort: DealSort::DiscountHigh,
                ..DealFilter::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(titles(&discounted.items), vec!["Running Shoes 100%_off", "Galaxy Phone"]);

    let saved = service
        .list_deals(
            &DealFilter {
                saved_only: true,
                ..DealFilter::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(titles(&saved.items), vec!["OLED TV"]);

    let second_page = service
        .list_deals(
            &DealFilter {
                sort: DealSort::Oldest,
                ..DealFilter::default()
            },
            PageRequest::new(Some(2), Some(2)),
        )
        .unwrap();
    assert_eq!(titles(&second_page.items), vec!["Running Shoes 100%_off"]);
    assert_eq!(second_page.pages, 2);
    assert_eq!(second_page.page, 2);
}

#[test]
fn brand_listing_matches_substrings_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let mut first = new_deal("Air Max", 150.0, 120.0);
    first.brand = Some("Nike Sportswear".into());
    seed(&conn, first, 1);
    let mut second = new_deal("Ultraboost", 180.0, 140.0);
    second.brand = Some("Adidas".into());
    seed(&conn, second, 2);

    let service = DealService::new(SqliteDealRepository::new(&conn));
    let page = service
        .list_by_brand("nike", DealSort::Newest, PageRequest::default())
        .unwrap();
    assert_eq!(titles(&page.items), vec!["Air Max"]);
}

#[test]
fn viewing_a_deal_counts_views() {
    let conn = open_db_in_memory().unwrap();
    let deal = seed(&conn, new_deal("Blender", 80.0, 60.0), 1);
    let service = DealService::new(SqliteDealRepository::new(&conn));

    assert_eq!(service.view_deal(deal.id).unwrap().views, 1);
    assert_eq!(service.view_deal(deal.id).unwrap().views, 2);
    assert!(matches!(
        service.view_deal(Uuid::new_v4()),
        Err(DealServiceError::DealNotFound(_))
    ));
}

#[test]
fn update_deal_patches_fields_and_reslugs() {
    let conn = open_db_in_memory().unwrap();
    let deal = seed(&conn, new_deal("Old Name", 50.0, 40.0), 1);
    let service = DealService::new(SqliteDealRepository::new(&conn));

    let updated = service
        .update_deal(
            deal.id,
            DealPatch {
                title: Some("Brand New Name".into()),
                featured: Some(true),
                ..DealPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.slug, "brand-new-name");
    assert!(updated.featured);
    assert_eq!(updated.original_price, 50.0);
    assert_eq!(titles(&service.list_featured(5).unwrap()), vec!["Brand New Name"]);
}

#[test]
fn moderation_rejects_repeated_status() {
    let conn = open_db_in_memory().unwrap();
    let deal = seed(&conn, new_deal("Kettle", 30.0, 20.0), 1);
    let service = DealService::new(SqliteDealRepository::new(&conn));

    assert_eq!(service.approve_deal(deal.id).unwrap().status, DealStatus::Active);
    assert!(matches!(
        service.approve_deal(deal.id),
        Err(DealServiceError::StatusUnchanged(DealStatus::Active))
    ));
    assert_eq!(service.reject_deal(deal.id).unwrap().status, DealStatus::Rejected);
}

#[test]
fn votes_toggle_per_user_and_kind() {
    let conn = open_db_in_memory().unwrap();
    let deal = seed(&conn, new_deal("Desk", 300.0, 200.0), 1);
    let service = DealService::new(SqliteDealRepository::new(&conn));
    let ada = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let first = service.toggle_vote(deal.id, ada, VoteKind::Like).unwrap();
    assert!(first.active);
    assert_eq!(first.count, 1);
    assert_eq!(service.toggle_vote(deal.id, bob, VoteKind::Like).unwrap().count, 2);
    assert_eq!(service.toggle_vote(deal.id, ada, VoteKind::Upvote).unwrap().count, 1);

    let undone = service.toggle_vote(deal.id, ada, VoteKind::Like).unwrap();
    assert!(!undone.active);
    assert_eq!(undone.count, 1);

    let reloaded = service.view_deal(deal.id).unwrap();
    assert_eq!((reloaded.likes, reloaded.upvotes, reloaded.bookmarks), (1, 1, 0));
}

#[test]
fn ratings_replace_per_user_and_round_average() {
    let conn = open_db_in_memory().unwrap();
    let deal = seed(&conn, new_deal("Chair", 120.0, 90.0), 1);
    let service = DealService::new(SqliteDealRepository::new(&conn));
    let ada = Uuid::new_v4();

    service.rate_deal(deal.id, ada, 5).unwrap();
    service.rate_deal(deal.id, Uuid::new_v4(), 4).unwrap();
    let summary = service.rate_deal(deal.id, Uuid::new_v4(), 4).unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.average, 4.3);

    let replaced = service.rate_deal(deal.id, ada, 1).unwrap();
    assert_eq!(replaced.count, 3);
    assert_eq!(replaced.average, 3.0);

    assert!(matches!(
        service.rate_deal(deal.id, ada, 6),
        Err(DealServiceError::Validation(_))
    ));
    assert!(matches!(
        service.rate_deal(deal.id, ada, 0),
        Err(DealServiceError::Validation(_))
    ));
}

#[test]
fn creator_listing_requires_at_least_one_deal() {
    let conn = open_db_in_memory().unwrap();
    let author = Uuid::new_v4();
    let mut input = new_deal("Mixer", 70.0, 50.0);
    input.created_by = Some(author);
    seed(&conn, input, 1);
    let service = DealService::new(SqliteDealRepository::new(&conn));

    assert_eq!(service.list_by_creator(author).unwrap().len(), 1);
    assert!(matches!(
        service.list_by_creator(Uuid::new_v4()),
        Err(DealServiceError::NoDealsForUser(_))
    ));
}

#[test]
fn deleting_a_deal_removes_its_comment_thread() {
    let conn = open_db_in_memory().unwrap();
    let deal = seed(&conn, new_deal("Toaster", 40.0, 25.0), 1);
    let comments = CommentService::new(
        SqliteCommentRepository::new(&conn),
        SqliteReactionRepository::new(&conn),
    );
    comments
        .add_comment(
            CommentTarget::Deal,
            deal.id,
            NewComment {
                author_name: "Ada".into(),
                body: "Great price".into(),
                ..NewComment::default()
            },
        )
        .unwrap();

    let service = DealService::new(SqliteDealRepository::new(&conn));
    service.delete_deal(deal.id).unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM comments;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(matches!(
        service.delete_deal(deal.id),
        Err(DealServiceError::DealNotFound(_))
    ));
}

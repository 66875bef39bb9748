use dealshub_core::db::open_db_in_memory;
use dealshub_core::model::curated::CuratedCategoryInput;
use dealshub_core::model::hero::HeroInput;
use dealshub_core::model::vendor_plan::{PlanDuration, VendorPlanInput};
use dealshub_core::repo::curated_repo::SqliteCuratedCategoryRepository;
use dealshub_core::repo::hero_repo::SqliteHeroRepository;
use dealshub_core::repo::vendor_plan_repo::SqliteVendorPlanRepository;
use dealshub_core::service::curated_service::CuratedCategoryService;
use dealshub_core::service::hero_service::HeroService;
use dealshub_core::service::vendor_plan_service::VendorPlanService;
use dealshub_core::ServiceError;
use uuid::Uuid;

fn hero(title: &str) -> HeroInput {
    HeroInput {
        title: Some(title.into()),
        subtitle: Some("This week only".into()),
        description: Some("Up to 70% off electronics".into()),
        image: Some("https://cdn.example.com/hero.png".into()),
        gradient: Some("from-orange-500 to-pink-500".into()),
    }
}

fn category(id: i64, title: &str) -> CuratedCategoryInput {
    CuratedCategoryInput {
        id: Some(id),
        title: Some(title.into()),
        description: Some("Hand-picked offers".into()),
        image: Some("https://cdn.example.com/category.png".into()),
        deals_count: Some(12),
        max_discount: Some(45.0),
        color: Some("bg-green-500".into()),
    }
}

fn plan(name: &str, price: f64, duration: Option<&str>) -> VendorPlanInput {
    VendorPlanInput {
        name: Some(name.into()),
        price: Some(price),
        duration: duration.map(str::to_string),
        features: Some(vec!["Featured listing".into()]),
    }
}

#[test]
fn heroes_round_trip_through_storage() {
    let conn = open_db_in_memory().unwrap();
    let service = HeroService::new(SqliteHeroRepository::new(&conn));

    let created = service.create_hero(hero(" Black Friday ")).unwrap();
    assert_eq!(created.title, "Black Friday");
    assert_eq!(service.get_hero(created.id).unwrap(), created);
    assert!(matches!(
        service.create_hero(HeroInput::default()),
        Err(ServiceError::Validation(_))
    ));

    let updated = service
        .update_hero(
            created.id,
            HeroInput {
                subtitle: Some("Ends Sunday".into()),
                ..HeroInput::default()
            },
        )
        .unwrap();
    assert_eq!(updated.subtitle, "Ends Sunday");
    assert_eq!(updated.title, "Black Friday");
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(service.list_heroes().unwrap(), vec![updated]);

    service.delete_hero(created.id).unwrap();
    assert!(matches!(
        service.get_hero(created.id),
        Err(ServiceError::NotFound { entity: "hero", .. })
    ));
    assert!(matches!(
        service.delete_hero(created.id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn curated_categories_keep_their_numeric_ids() {
    let conn = open_db_in_memory().unwrap();
    let service = CuratedCategoryService::new(SqliteCuratedCategoryRepository::new(&conn));

    service.create_category(category(2, "Fashion")).unwrap();
    service.create_category(category(1, "Tech")).unwrap();
    assert!(matches!(
        service.create_category(category(1, "Duplicate")),
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.create_category(category(0, "Zero")),
        Err(ServiceError::Validation(_))
    ));

    let ids: Vec<i64> = service
        .list_categories()
        .unwrap()
        .into_iter()
        .map(|category| category.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let updated = service
        .update_category(
            2,
            CuratedCategoryInput {
                deals_count: Some(30),
                ..CuratedCategoryInput::default()
            },
        )
        .unwrap();
    assert_eq!(updated.deals_count, 30);
    assert_eq!(service.get_category(2).unwrap().deals_count, 30);
    assert!(matches!(
        service.update_category(
            2,
            CuratedCategoryInput {
                id: Some(9),
                ..CuratedCategoryInput::default()
            }
        ),
        Err(ServiceError::Validation(_))
    ));

    service.delete_category(1).unwrap();
    assert!(matches!(
        service.get_category(1),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn vendor_plans_list_cheapest_first_and_validate_duration() {
    let conn = open_db_in_memory().unwrap();
    let service = VendorPlanService::new(SqliteVendorPlanRepository::new(&conn));

    let pro = service.create_plan(plan("Pro", 50_000.0, Some("yearly"))).unwrap();
    let starter = service.create_plan(plan("Starter", 5_000.0, None)).unwrap();
    assert_eq!(pro.duration, PlanDuration::Yearly);
    assert_eq!(starter.duration, PlanDuration::Monthly);
    assert!(matches!(
        service.create_plan(plan("Weekly", 1_000.0, Some("weekly"))),
        Err(ServiceError::Validation(_))
    ));

    let names: Vec<String> = service
        .list_plans()
        .unwrap()
        .into_iter()
        .map(|plan| plan.name)
        .collect();
    assert_eq!(names, vec!["Starter", "Pro"]);

    let updated = service
        .update_plan(
            starter.id,
            VendorPlanInput {
                duration: Some("yearly".into()),
                features: Some(vec!["Unlimited deals".into(), "Analytics".into()]),
                ..VendorPlanInput::default()
            },
        )
        .unwrap();
    assert_eq!(updated.duration, PlanDuration::Yearly);
    assert_eq!(updated.price, 5_000.0);
    assert_eq!(service.get_plan(starter.id).unwrap().features.len(), 2);

    service.delete_plan(pro.id).unwrap();
    assert!(matches!(
        service.get_plan(pro.id),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        service.update_plan(Uuid::new_v4(), VendorPlanInput::default()),
        Err(ServiceError::NotFound { .. })
    ));
}

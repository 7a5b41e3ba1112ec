//! Macro-generated test suite for the `EntityStore<T>` contract.
//!
//! The `entity_store_tests!` macro generates a test module that runs the
//! store against any `Database` backend: pagination, filtering, tracking,
//! removal, constraints and eager-loading.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//!
//! entity_store_tests!(Arc::new(InMemoryDatabase::new()) as Arc<dyn Database>);
//! ```
//!
//! `$factory` must evaluate to an `Arc<dyn Database>` holding no harness
//! rows. It is re-evaluated for each test. Identities are never assumed to
//! start at 1 because some backends share one sequence across tables.

macro_rules! entity_store_tests {
    ($factory:expr) => {
        mod entity_store_contract_tests {
            use super::*;
            use std::sync::Arc;
            use villa::core::error::{PersistenceError, StoreError, ValidationError};
            use villa::core::filter::Filter;
            use villa::core::query::{IncludeSpec, Page};
            use villa::core::store::{Database, EntityStore};
            use villa::core::tracking::TrackingMode;

            async fn database() -> Arc<dyn Database> {
                $factory
            }

            fn products(db: &Arc<dyn Database>) -> EntityStore<Product> {
                EntityStore::new(db.clone())
            }

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_create_assigns_identity() {
                let db = database().await;
                let store = products(&db);

                let created = store.create(product(1)).await.unwrap();
                assert!(created.id > 0);

                let fetched = store
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap();
                assert_eq!(fetched, created);
            }

            #[tokio::test]
            async fn test_get_without_match_is_none() {
                let db = database().await;
                seed_products(&db, 3).await;

                let found = products(&db)
                    .get(
                        Some(&Filter::eq("sku", "SKU-999")),
                        TrackingMode::Detached,
                        &IncludeSpec::none(),
                    )
                    .await
                    .unwrap();
                assert!(found.is_none());
            }

            #[tokio::test]
            async fn test_update_persists() {
                let db = database().await;
                let store = products(&db);
                let mut created = store.create(product(1)).await.unwrap();

                created.name = "Renamed".to_string();
                created.stock = 42;
                store.update(&created).await.unwrap();

                let fetched = products(&db)
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap();
                assert_eq!(fetched.name, "Renamed");
                assert_eq!(fetched.stock, 42);
            }

            #[tokio::test]
            async fn test_update_missing_is_not_found() {
                let db = database().await;
                let ghost = Product {
                    id: i64::MAX / 2,
                    ..product(1)
                };

                let err = products(&db).update(&ghost).await.unwrap_err();
                assert!(err.is_not_found(), "unexpected error: {}", err);
            }

            #[tokio::test]
            async fn test_remove_then_get_is_not_found() {
                let db = database().await;
                let store = products(&db);
                let created = store.create(product(1)).await.unwrap();

                store.remove(&created).await.unwrap();

                let found = store
                    .get(
                        Some(&Filter::id(created.id)),
                        TrackingMode::Detached,
                        &IncludeSpec::none(),
                    )
                    .await
                    .unwrap();
                assert!(found.is_none());

                let err = store
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap_err();
                assert!(err.is_not_found());

                let err = store.remove(&created).await.unwrap_err();
                assert!(err.is_not_found());
            }

            #[tokio::test]
            async fn test_concurrent_creates() {
                let db = database().await;
                let creates = (1..=10).map(|i| {
                    let store = products(&db);
                    async move { store.create(product(i)).await.unwrap() }
                });
                let created = futures::future::join_all(creates).await;

                let mut ids: Vec<i64> = created.iter().map(|p| p.id).collect();
                ids.sort_unstable();
                ids.dedup();
                assert_count(&ids, 10);

                let all = products(&db)
                    .get_all(None, &IncludeSpec::none(), Page::default())
                    .await
                    .unwrap();
                assert_count(&all, 10);
            }

            // ==================================================================
            // Pagination
            // ==================================================================

            #[tokio::test]
            async fn test_second_page_of_ten() {
                let db = database().await;
                let seeded = seed_products(&db, 25).await;

                let page = products(&db)
                    .get_all(None, &IncludeSpec::none(), Page::new(10, 2))
                    .await
                    .unwrap();

                assert_eq!(skus(&page), skus(&seeded[10..20]));
            }

            #[tokio::test]
            async fn test_pages_cover_dataset_without_gaps() {
                let db = database().await;
                let store = products(&db);
                seed_products(&db, 25).await;

                let full = store
                    .get_all(None, &IncludeSpec::none(), Page::default())
                    .await
                    .unwrap();
                assert_count(&full, 25);

                let mut stitched = Vec::new();
                for number in 1..=4 {
                    let page = store
                        .get_all(None, &IncludeSpec::none(), Page::new(7, number))
                        .await
                        .unwrap();
                    assert!(page.len() <= 7);
                    stitched.extend(page);
                }
                assert_eq!(skus(&stitched), skus(&full));

                let beyond = store
                    .get_all(None, &IncludeSpec::none(), Page::new(7, 5))
                    .await
                    .unwrap();
                assert!(beyond.is_empty());
            }

            #[tokio::test]
            async fn test_paging_applies_after_filter() {
                let db = database().await;
                let seeded = seed_products(&db, 25).await;
                let active = Filter::eq("active", true);

                let expected: Vec<Product> =
                    seeded.iter().filter(|p| p.active).cloned().collect();
                let page = products(&db)
                    .get_all(Some(&active), &IncludeSpec::none(), Page::new(5, 2))
                    .await
                    .unwrap();

                assert_eq!(skus(&page), skus(&expected[5..10]));
            }

            #[tokio::test]
            async fn test_page_size_is_clamped() {
                let db = database().await;
                seed_products(&db, 120).await;
                let store = products(&db);

                let first = store
                    .get_all(None, &IncludeSpec::none(), Page::new(500, 1))
                    .await
                    .unwrap();
                assert_count(&first, 100);

                let second = store
                    .get_all(None, &IncludeSpec::none(), Page::new(500, 2))
                    .await
                    .unwrap();
                assert_count(&second, 20);

                let unbounded = store
                    .get_all(None, &IncludeSpec::none(), Page::default())
                    .await
                    .unwrap();
                assert_count(&unbounded, 120);
            }

            #[tokio::test]
            async fn test_page_number_zero_rejected() {
                let db = database().await;
                let err = products(&db)
                    .get_all(None, &IncludeSpec::none(), Page::new(10, 0))
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::Validation(ValidationError::InvalidPage { number: 0 })
                ));
            }

            // ==================================================================
            // Filters
            // ==================================================================

            #[tokio::test]
            async fn test_filter_correctness() {
                let db = database().await;
                let seeded = seed_products(&db, 25).await;
                let store = products(&db);

                let cases: Vec<(Filter, Box<dyn Fn(&Product) -> bool>)> = vec![
                    (Filter::gte("stock", 3i64), Box::new(|p: &Product| p.stock >= 3)),
                    (Filter::lt("price", 10.0), Box::new(|p: &Product| p.price < 10.0)),
                    (Filter::eq("active", true), Box::new(|p: &Product| p.active)),
                    (Filter::ne("stock", 2i64), Box::new(|p: &Product| p.stock != 2)),
                    (
                        Filter::contains("name", "PRODUCT 1"),
                        Box::new(|p: &Product| p.name.to_lowercase().contains("product 1")),
                    ),
                    (
                        Filter::eq_ignore_case("sku", "sku-004"),
                        Box::new(|p: &Product| p.sku == "SKU-004"),
                    ),
                    (
                        Filter::is_in("stock", [0i64, 6]),
                        Box::new(|p: &Product| p.stock == 0 || p.stock == 6),
                    ),
                    (
                        Filter::gt("price", 30.0).or(Filter::lte("stock", 1i64)),
                        Box::new(|p: &Product| p.price > 30.0 || p.stock <= 1),
                    ),
                    (
                        Filter::eq("active", true)
                            .and(Filter::gte("stock", 2i64))
                            .and(Filter::lt("stock", 5i64)),
                        Box::new(|p: &Product| p.active && p.stock >= 2 && p.stock < 5),
                    ),
                    (
                        Filter::eq("active", true).negate(),
                        Box::new(|p: &Product| !p.active),
                    ),
                    (Filter::eq("name", "nothing"), Box::new(|_: &Product| false)),
                ];

                for (filter, predicate) in cases {
                    let expected: Vec<Product> =
                        seeded.iter().filter(|p| predicate(p)).cloned().collect();
                    let actual = store
                        .get_all(Some(&filter), &IncludeSpec::none(), Page::default())
                        .await
                        .unwrap();
                    assert_eq!(skus(&actual), skus(&expected), "filter {:?}", filter);
                }
            }

            #[tokio::test]
            async fn test_query_string_filter_orders_timestamps_as_instants() {
                let db = database().await;
                let store = products(&db);
                let base: chrono::DateTime<chrono::Utc> =
                    "2024-01-01T00:00:00Z".parse().unwrap();

                let mut on_the_second = product(1);
                on_the_second.restocked_at = Some(base);
                store.create(on_the_second).await.unwrap();

                let mut half_second_later = product(2);
                half_second_later.restocked_at =
                    Some(base + chrono::Duration::milliseconds(500));
                store.create(half_second_later).await.unwrap();

                store.create(product(3)).await.unwrap();

                let filter = Filter::from_json(&serde_json::json!({
                    "restocked_at>": "2024-01-01T00:00:00Z"
                }))
                .unwrap()
                .unwrap();
                let found = store
                    .get_all(Some(&filter), &IncludeSpec::none(), Page::default())
                    .await
                    .unwrap();
                assert_eq!(skus(&found), vec!["SKU-002".to_string()]);

                let filter = Filter::from_json(&serde_json::json!({
                    "restocked_at<=": "2024-01-01T00:00:00.500Z"
                }))
                .unwrap()
                .unwrap();
                let found = store
                    .get_all(Some(&filter), &IncludeSpec::none(), Page::default())
                    .await
                    .unwrap();
                assert_eq!(skus(&found), vec!["SKU-001".to_string(), "SKU-002".to_string()]);

                // same instant, different offset spelling
                let filter = Filter::from_json(&serde_json::json!({
                    "restocked_at": ["2024-01-01T01:00:00.000+01:00"]
                }))
                .unwrap()
                .unwrap();
                let found = store
                    .get_all(Some(&filter), &IncludeSpec::none(), Page::default())
                    .await
                    .unwrap();
                assert_eq!(skus(&found), vec!["SKU-001".to_string()]);
            }

            #[tokio::test]
            async fn test_filter_by_identity() {
                let db = database().await;
                let seeded = seed_products(&db, 5).await;
                let wanted = [seeded[1].id, seeded[3].id];

                let found = products(&db)
                    .get_all(
                        Some(&Filter::is_in("id", wanted)),
                        &IncludeSpec::none(),
                        Page::default(),
                    )
                    .await
                    .unwrap();
                assert_eq!(skus(&found), vec!["SKU-002".to_string(), "SKU-004".to_string()]);
            }

            #[tokio::test]
            async fn test_filter_unknown_field_rejected() {
                let db = database().await;
                let err = products(&db)
                    .get_all(
                        Some(&Filter::eq("colour", "red")),
                        &IncludeSpec::none(),
                        Page::default(),
                    )
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::Validation(ValidationError::UnknownField { ref field, .. })
                        if field == "colour"
                ));
            }

            #[tokio::test]
            async fn test_ordering_against_boolean_rejected() {
                let db = database().await;
                let err = products(&db)
                    .get_all(
                        Some(&Filter::gt("active", true)),
                        &IncludeSpec::none(),
                        Page::default(),
                    )
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::Validation(ValidationError::InvalidFilter { .. })
                ));
            }

            // ==================================================================
            // Tracking
            // ==================================================================

            #[tokio::test]
            async fn test_detached_changes_never_persist() {
                let db = database().await;
                let created = products(&db).create(product(1)).await.unwrap();

                let store = products(&db);
                let mut detached = store
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap();
                assert!(!store.is_tracked(&detached));

                detached.name = "Changed in memory".to_string();
                let err = store.save(&detached).await.unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::Validation(ValidationError::NotTracked { .. })
                ));

                let fresh = products(&db)
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap();
                assert_eq!(fresh.name, "Product 01");
            }

            #[tokio::test]
            async fn test_save_matches_on_identity_once_tracked() {
                let db = database().await;
                let created = products(&db).create(product(1)).await.unwrap();

                let store = products(&db);
                store
                    .get_by_id(created.id, TrackingMode::Tracked, &IncludeSpec::none())
                    .await
                    .unwrap();
                let mut detached = store
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap();

                detached.name = "Written through identity".to_string();
                assert!(store.save(&detached).await.unwrap());

                let fresh = products(&db)
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap();
                assert_eq!(fresh.name, "Written through identity");
            }

            #[tokio::test]
            async fn test_tracked_save_writes_only_changes() {
                let db = database().await;
                let created = products(&db).create(product(1)).await.unwrap();

                let store = products(&db);
                let mut tracked = store
                    .get_by_id(created.id, TrackingMode::Tracked, &IncludeSpec::none())
                    .await
                    .unwrap();
                assert!(store.is_tracked(&tracked));
                assert!(!store.save(&tracked).await.unwrap());

                tracked.stock = 99;
                assert!(store.save(&tracked).await.unwrap());
                assert!(!store.save(&tracked).await.unwrap());

                let fresh = products(&db)
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap();
                assert_eq!(fresh.stock, 99);
            }

            #[tokio::test]
            async fn test_get_all_results_are_untracked() {
                let db = database().await;
                seed_products(&db, 3).await;

                let store = products(&db);
                let all = store
                    .get_all(None, &IncludeSpec::none(), Page::default())
                    .await
                    .unwrap();
                assert!(all.iter().all(|p| !store.is_tracked(p)));
            }

            // ==================================================================
            // Constraints
            // ==================================================================

            #[tokio::test]
            async fn test_unique_violation_on_create() {
                let db = database().await;
                let store = products(&db);
                store.create(product(1)).await.unwrap();

                let duplicate = Product {
                    name: "Other".to_string(),
                    ..product(1)
                };
                let err = store.create(duplicate).await.unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::Persistence(PersistenceError::ConstraintViolation { .. })
                ));

                let all = store
                    .get_all(None, &IncludeSpec::none(), Page::default())
                    .await
                    .unwrap();
                assert_count(&all, 1);
            }

            #[tokio::test]
            async fn test_unique_violation_on_update() {
                let db = database().await;
                let store = products(&db);
                store.create(product(1)).await.unwrap();
                let mut second = store.create(product(2)).await.unwrap();

                second.sku = "SKU-001".to_string();
                let err = store.update(&second).await.unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::Persistence(PersistenceError::ConstraintViolation { .. })
                ));

                // rewriting a row with its own unique value is fine
                second.sku = "SKU-002".to_string();
                second.stock = 50;
                store.update(&second).await.unwrap();
            }

            #[tokio::test]
            async fn test_foreign_key_violation() {
                let db = database().await;
                let orphan = Product {
                    category_id: Some(i64::MAX / 2),
                    ..product(1)
                };

                let err = products(&db).create(orphan).await.unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::Persistence(PersistenceError::ConstraintViolation { .. })
                ));
            }

            // ==================================================================
            // Eager-loading
            // ==================================================================

            #[tokio::test]
            async fn test_include_loads_navigation() {
                let db = database().await;
                let garden = EntityStore::<Category>::new(db.clone())
                    .create(category("Garden"))
                    .await
                    .unwrap();

                let store = products(&db);
                let created = store
                    .create(Product {
                        category_id: Some(garden.id),
                        ..product(1)
                    })
                    .await
                    .unwrap();
                store.create(product(2)).await.unwrap();

                let loaded = store
                    .get_by_id(
                        created.id,
                        TrackingMode::Detached,
                        &IncludeSpec::parse("category"),
                    )
                    .await
                    .unwrap();
                assert_eq!(loaded.category, Some(garden.clone()));

                let plain = store
                    .get_by_id(created.id, TrackingMode::Detached, &IncludeSpec::none())
                    .await
                    .unwrap();
                assert_eq!(plain.category, None);

                let all = store
                    .get_all(None, &IncludeSpec::parse("category"), Page::default())
                    .await
                    .unwrap();
                assert_count(&all, 2);
                assert_eq!(all[0].category, Some(garden));
                assert_eq!(all[1].category, None);
            }

            #[tokio::test]
            async fn test_include_with_dangling_reference() {
                let db = database().await;
                let categories = EntityStore::<Category>::new(db.clone());
                let garden = categories.create(category("Garden")).await.unwrap();

                let store = products(&db);
                let created = store
                    .create(Product {
                        category_id: Some(garden.id),
                        ..product(1)
                    })
                    .await
                    .unwrap();

                categories.remove(&garden).await.unwrap();

                let loaded = store
                    .get_by_id(
                        created.id,
                        TrackingMode::Detached,
                        &IncludeSpec::parse("category"),
                    )
                    .await
                    .unwrap();
                assert_eq!(loaded.category, None);
                assert_eq!(loaded.category_id, Some(garden.id));
            }

            #[tokio::test]
            async fn test_unknown_include_rejected() {
                let db = database().await;
                let err = products(&db)
                    .get_all(None, &IncludeSpec::parse("supplier"), Page::default())
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::Validation(ValidationError::UnknownInclude { .. })
                ));
            }

            #[tokio::test]
            async fn test_tracked_entity_with_include_saves_without_navigation() {
                let db = database().await;
                let garden = EntityStore::<Category>::new(db.clone())
                    .create(category("Garden"))
                    .await
                    .unwrap();
                let store = products(&db);
                let created = store
                    .create(Product {
                        category_id: Some(garden.id),
                        ..product(1)
                    })
                    .await
                    .unwrap();

                let mut tracked = store
                    .get_by_id(
                        created.id,
                        TrackingMode::Tracked,
                        &IncludeSpec::parse("category"),
                    )
                    .await
                    .unwrap();
                assert!(!store.save(&tracked).await.unwrap());

                tracked.price = 1.0;
                assert!(store.save(&tracked).await.unwrap());
            }
        }
    };
}

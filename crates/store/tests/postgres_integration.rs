//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{
    AddressId, DistributionCenterId, Money, PageRequest, ProductId, ReservationId, ShippingId,
    ShippingStatus, TransportMethodId, UserId, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    AddressRepository, DistributionCenterRepository, LocalityQuery, LocalityRepository, NewAddress,
    NewShipment, PostgresLogisticsStore, ProductLine, ReferenceData, ShipmentQuery, ShipmentRepository,
    StatusChange, StoreError, TravelRepository,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_logistics_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with cleared tables and the built-in reference data
async fn get_test_store() -> PostgresLogisticsStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE shipping_logs, shipments, travels, distribution_centers, addresses, localities RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    let store = PostgresLogisticsStore::new(pool);
    store
        .seed_reference_data(&ReferenceData::builtin())
        .await
        .unwrap();
    store
}

async fn insert_sample(
    store: &PostgresLogisticsStore,
    user: i64,
    created_at: chrono::DateTime<Utc>,
) -> ShippingId {
    let address = store
        .find_or_create_address(&NewAddress {
            street: "Av. Siempre Viva".to_string(),
            number: 742,
            postal_code: "H3500".to_string(),
            locality_name: "Resistencia".to_string(),
        })
        .await
        .unwrap();
    let travel = store
        .find_or_create_travel(DistributionCenterId::new(3), TransportMethodId::new(1))
        .await
        .unwrap();

    store
        .insert_shipment(NewShipment {
            order_id: ReservationId::new(500 + user),
            user_id: UserId::new(user),
            travel_id: travel.id,
            delivery_address_id: address.id,
            products: vec![
                ProductLine {
                    product_id: ProductId::new(1),
                    quantity: 2,
                },
                ProductLine {
                    product_id: ProductId::new(2),
                    quantity: 1,
                },
            ],
            total_cost: Money::from_cents(98_765),
            currency: "ARS".to_string(),
            tracking_number: Uuid::new_v4(),
            carrier_name: "PENDING".to_string(),
            created_at,
            estimated_delivery_at: created_at + Duration::days(7),
            initial_log: "Shipping created.".to_string(),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
#[serial]
async fn reference_data_is_seeded() {
    let store = get_test_store().await;

    let haedo_and_moron = store.localities_by_postal_code("B1708").await.unwrap();
    assert_eq!(haedo_and_moron.len(), 2);

    let found = store.locality("H3500", "RESISTENCIA").await.unwrap();
    assert_eq!(found.unwrap().locality_name, "Resistencia");

    let centers = store.distribution_centers().await.unwrap();
    assert_eq!(centers.len(), 3);
    assert!(centers.iter().all(|c| c.address.is_some()));

    let center = store
        .distribution_center(DistributionCenterId::new(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(center.address.unwrap().postal_code, "X5000");
}

#[tokio::test]
#[serial]
async fn locality_search_filters_and_pages() {
    let store = get_test_store().await;

    let (found, total) = store
        .search_localities(&LocalityQuery::new().state("buenos aires"))
        .await
        .unwrap();
    assert_eq!(total, 2);
    let names: Vec<_> = found.iter().map(|l| l.locality_name.as_str()).collect();
    assert_eq!(names, ["Haedo", "Moron"]);

    let (second, total) = store
        .search_localities(
            &LocalityQuery::new()
                .postal_code("B1708")
                .page(PageRequest::new(Some(2), Some(1))),
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].locality_name, "Moron");

    let (partial, _) = store
        .search_localities(&LocalityQuery::new().locality_name("sisten"))
        .await
        .unwrap();
    assert_eq!(partial[0].postal_code, "H3500");
}

#[tokio::test]
#[serial]
async fn addresses_and_travels_are_reused() {
    let store = get_test_store().await;
    let fields = NewAddress {
        street: "San Martin".to_string(),
        number: 10,
        postal_code: "X5000".to_string(),
        locality_name: "Cordoba".to_string(),
    };

    let a = store.find_or_create_address(&fields).await.unwrap();
    let b = store.find_or_create_address(&fields).await.unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(store.address(a.id).await.unwrap(), Some(a.clone()));
    assert!(store.address(AddressId::new(9_999)).await.unwrap().is_none());

    let center = DistributionCenterId::new(1);
    let t1 = store
        .find_or_create_travel(center, TransportMethodId::new(3))
        .await
        .unwrap();
    let t2 = store
        .find_or_create_travel(center, TransportMethodId::new(3))
        .await
        .unwrap();
    assert_eq!(t1.id, t2.id);
}

#[tokio::test]
#[serial]
async fn shipment_roundtrip_with_logs() {
    let store = get_test_store().await;
    let id = insert_sample(&store, 1, Utc::now()).await;

    let stored = store.shipment(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ShippingStatus::Created);
    assert_eq!(stored.products.len(), 2);
    assert_eq!(stored.total_cost, Money::from_cents(98_765));
    assert_eq!(stored.logs.len(), 1);
    assert_eq!(stored.version, Version::first());
}

#[tokio::test]
#[serial]
async fn status_change_is_version_checked() {
    let store = get_test_store().await;
    let id = insert_sample(&store, 1, Utc::now()).await;

    let change = |status: ShippingStatus| StatusChange {
        status,
        message: format!("moved to {status}"),
        at: Utc::now(),
    };

    let updated = store
        .apply_status_change(id, Version::first(), change(ShippingStatus::InTransit))
        .await
        .unwrap();
    assert_eq!(updated.status, ShippingStatus::InTransit);
    assert_eq!(updated.version, Version::new(2));
    assert_eq!(updated.logs.len(), 2);
    assert_eq!(updated.logs[1].message, "moved to in_transit");

    let stale = store
        .apply_status_change(id, Version::first(), change(ShippingStatus::Cancelled))
        .await;
    assert!(matches!(
        stale,
        Err(StoreError::ConcurrencyConflict { .. })
    ));

    let missing = store
        .apply_status_change(
            ShippingId::new(424_242),
            Version::first(),
            change(ShippingStatus::Cancelled),
        )
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));

    let stored = store.shipment(id).await.unwrap().unwrap();
    assert_eq!(stored.logs.len(), 2);
}

#[tokio::test]
#[serial]
async fn list_filters_and_paginates() {
    let store = get_test_store().await;
    let now = Utc::now();
    let old = insert_sample(&store, 1, now - Duration::days(10)).await;
    let recent = insert_sample(&store, 1, now - Duration::days(1)).await;
    insert_sample(&store, 2, now).await;

    let (items, total) = store
        .list_shipments(&ShipmentQuery::new().user_id(UserId::new(1)))
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(items[0].id, recent);
    assert_eq!(items[1].id, old);

    let (items, total) = store
        .list_shipments(&ShipmentQuery::new().created_from(now - Duration::days(2)))
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(items.iter().all(|s| s.id != old));

    let (items, total) = store
        .list_shipments(&ShipmentQuery::new().page(PageRequest::new(Some(2), Some(2))))
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, old);

    let (items, _) = store
        .list_shipments(&ShipmentQuery::new().status(ShippingStatus::Delivered))
        .await
        .unwrap();
    assert!(items.is_empty());
}

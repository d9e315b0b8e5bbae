//! Integration tests for the shipment lifecycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{PageRequest, ProductId, ReservationId, ShippingId, ShippingStatus, TransportType, UserId};
use logistics::{
    CreateShipment, InMemoryPurchasingNotifier, ShipmentError, ShipmentService, StaticCatalog,
    UpdateStatus,
};
use store::{InMemoryLogisticsStore, NewAddress, ProductLine, ReferenceData, ShipmentQuery};

type TestService = ShipmentService<InMemoryLogisticsStore, StaticCatalog, InMemoryPurchasingNotifier>;

struct TestHarness {
    service: Arc<TestService>,
    store: InMemoryLogisticsStore,
    notifier: InMemoryPurchasingNotifier,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryLogisticsStore::with_reference_data(&ReferenceData::builtin());
        let notifier = InMemoryPurchasingNotifier::new();
        let service = ShipmentService::new(store.clone(), StaticCatalog::new(), notifier.clone());
        Self {
            service: Arc::new(service),
            store,
            notifier,
        }
    }

    fn request(&self, user: i64, order: i64, transport: Option<TransportType>) -> CreateShipment {
        CreateShipment {
            order_id: ReservationId::new(order),
            user_id: UserId::new(user),
            delivery_address: NewAddress {
                street: "Av. Siempre Viva".to_string(),
                number: 742,
                postal_code: "H3500".to_string(),
                locality_name: "Resistencia".to_string(),
            },
            transport_type: transport,
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
        }
    }

    async fn create(&self, user: i64, order: i64) -> ShippingId {
        self.service
            .create(self.request(user, order, None))
            .await
            .unwrap()
            .shipping_id
    }

    async fn advance(&self, id: ShippingId, status: ShippingStatus) {
        self.service
            .update_status(UpdateStatus::new(id, status))
            .await
            .unwrap();
    }
}

mod create {
    use super::*;

    #[tokio::test]
    async fn test_create_returns_quote_fields() {
        let h = TestHarness::new();
        let before = Utc::now();

        let created = h
            .service
            .create(h.request(1, 10, Some(TransportType::Air)))
            .await
            .unwrap();

        assert_eq!(created.status, ShippingStatus::Created);
        assert_eq!(created.transport_type, TransportType::Air);
        assert!(created.estimated_delivery_at > before);
        assert!(created.total_cost.is_positive());
    }

    #[tokio::test]
    async fn test_create_defaults_to_road() {
        let h = TestHarness::new();
        let created = h.service.create(h.request(1, 10, None)).await.unwrap();
        assert_eq!(created.transport_type, TransportType::Road);
    }

    #[tokio::test]
    async fn test_addresses_are_deduplicated() {
        let h = TestHarness::new();
        let seeded = h.store.address_count().await;

        h.create(1, 10).await;
        h.create(2, 11).await;

        assert_eq!(h.store.address_count().await, seeded + 1);
        assert_eq!(h.store.shipment_count().await, 2);
    }

    #[tokio::test]
    async fn test_empty_products_is_rejected() {
        let h = TestHarness::new();
        let mut req = h.request(1, 10, None);
        req.products.clear();

        let err = h.service.create(req).await.unwrap_err();
        assert!(matches!(err, ShipmentError::NoProducts));
        assert_eq!(h.store.shipment_count().await, 0);
    }
}

mod transitions {
    use super::*;

    #[tokio::test]
    async fn test_full_forward_path_appends_one_log_per_change() {
        let h = TestHarness::new();
        let id = h.create(1, 10).await;

        for status in [
            ShippingStatus::Reserved,
            ShippingStatus::InDistribution,
            ShippingStatus::InTransit,
            ShippingStatus::Arrived,
            ShippingStatus::Delivered,
        ] {
            h.advance(id, status).await;
        }

        let view = h.service.get(id).await.unwrap();
        assert_eq!(view.status, ShippingStatus::Delivered);
        assert_eq!(view.logs.len(), 6);
        assert!(view.logs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(view.logs[1].message, "Status updated by logistics operator.");
    }

    #[tokio::test]
    async fn test_custom_message_is_logged() {
        let h = TestHarness::new();
        let id = h.create(1, 10).await;

        h.service
            .update_status(
                UpdateStatus::new(id, ShippingStatus::InTransit).with_message("left the hub"),
            )
            .await
            .unwrap();

        let view = h.service.get(id).await.unwrap();
        assert_eq!(view.logs.last().unwrap().message, "left the hub");
    }

    #[tokio::test]
    async fn test_back_to_created_is_rejected() {
        let h = TestHarness::new();
        let id = h.create(1, 10).await;
        h.advance(id, ShippingStatus::Reserved).await;

        let err = h
            .service
            .update_status(UpdateStatus::new(id, ShippingStatus::Created))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_state_transition");
    }

    #[tokio::test]
    async fn test_delivered_is_terminal() {
        let h = TestHarness::new();
        let id = h.create(1, 10).await;
        h.advance(id, ShippingStatus::Delivered).await;

        let err = h.service.cancel(id).await.unwrap_err();
        assert!(matches!(err, ShipmentError::InvalidTransition { .. }));

        let err = h
            .service
            .update_status(UpdateStatus::new(id, ShippingStatus::Arrived))
            .await
            .unwrap_err();
        assert!(matches!(err, ShipmentError::InvalidTransition { .. }));
        assert_eq!(h.service.get(id).await.unwrap().logs.len(), 2);
    }

    #[tokio::test]
    async fn test_update_to_cancelled_notifies_purchasing() {
        let h = TestHarness::new();
        let id = h.create(1, 10).await;

        let updated = h
            .service
            .update_status(UpdateStatus::new(id, ShippingStatus::Cancelled))
            .await
            .unwrap();

        assert!(updated.changed);
        assert_eq!(updated.previous_status, ShippingStatus::Created);
        assert!(h.notifier.wait_for(1, Duration::from_secs(1)).await);
        assert_eq!(h.notifier.sent()[0].shipping_id, id);
    }

    #[tokio::test]
    async fn test_second_cancel_conflicts() {
        let h = TestHarness::new();
        let id = h.create(1, 10).await;

        h.service.cancel(id).await.unwrap();
        let before = h.service.get(id).await.unwrap();

        let err = h.service.cancel(id).await.unwrap_err();
        assert!(matches!(err, ShipmentError::InvalidTransition { .. }));

        let after = h.service.get(id).await.unwrap();
        assert_eq!(after.logs.len(), before.logs.len());
        assert_eq!(after.logs.len(), 2);
        assert_eq!(after.status, ShippingStatus::Cancelled);

        assert!(h.notifier.wait_for(1, Duration::from_secs(1)).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cancels_only_one_wins() {
        let h = TestHarness::new();
        let id = h.create(1, 10).await;

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&h.service);
                tokio::spawn(async move { service.cancel(id).await })
            })
            .collect();

        let mut succeeded = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(ShipmentError::InvalidTransition { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(h.service.get(id).await.unwrap().logs.len(), 2);
    }
}

mod queries {
    use super::*;

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let h = TestHarness::new();
        let err = h.service.get(ShippingId::new(99)).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_list_filters_by_user_and_status() {
        let h = TestHarness::new();
        let a = h.create(1, 10).await;
        h.create(1, 11).await;
        h.create(2, 12).await;
        h.advance(a, ShippingStatus::InTransit).await;

        let mine = h
            .service
            .list(&ShipmentQuery::new().user_id(UserId::new(1)))
            .await
            .unwrap();
        assert_eq!(mine.pagination.total_items, 2);
        assert!(mine.items.iter().all(|s| s.user_id == UserId::new(1)));

        let moving = h
            .service
            .list(&ShipmentQuery::new().status(ShippingStatus::InTransit))
            .await
            .unwrap();
        assert_eq!(moving.items.len(), 1);
        assert_eq!(moving.items[0].shipping_id, a);
        assert_eq!(moving.items[0].transport_type, Some(TransportType::Road));
    }

    #[tokio::test]
    async fn test_list_paginates_newest_first() {
        let h = TestHarness::new();
        for order in 0..5 {
            h.create(1, order).await;
        }

        let page = h
            .service
            .list(&ShipmentQuery::new().page(PageRequest::new(Some(2), Some(2))))
            .await
            .unwrap();

        assert_eq!(page.pagination.total_items, 5);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].shipping_id > page.items[1].shipping_id);
    }

    #[tokio::test]
    async fn test_list_date_range_excludes_future_window() {
        let h = TestHarness::new();
        h.create(1, 10).await;

        let tomorrow = Utc::now() + chrono::Duration::days(1);
        let page = h
            .service
            .list(&ShipmentQuery::new().created_from(tomorrow))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
    }
}

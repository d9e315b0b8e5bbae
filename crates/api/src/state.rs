//! Shared application state for both servers.

use std::sync::Arc;

use logistics::{
    CatalogClient, HttpCatalogClient, HttpPurchasingNotifier, LocalityDirectory, LoggingNotifier,
    PurchasingNotifier, ShipmentService, StaticCatalog,
};
use purchasing::{
    CheckoutCoordinator, HttpShippingClient, HttpStockClient, InMemoryCartStore,
    InMemoryOrderBook, InMemoryUserDirectory, ShippingClient, StockClient,
};
use store::{InMemoryLogisticsStore, LogisticsStore, ReferenceData};

use crate::config::{LogisticsConfig, PurchasingConfig};
use crate::error::StartupError;

pub type DynCatalog = Arc<dyn CatalogClient>;
pub type DynNotifier = Arc<dyn PurchasingNotifier>;

/// Shipment service with its collaborators chosen at startup.
pub type Shipments<S> = ShipmentService<S, DynCatalog, DynNotifier>;

/// State of the logistics server.
pub struct LogisticsState<S> {
    pub shipments: Shipments<S>,
    pub localities: LocalityDirectory<S>,
}

impl<S: LogisticsStore + Clone + 'static> LogisticsState<S> {
    pub fn new(store: S, catalog: DynCatalog, notifier: DynNotifier) -> Self {
        Self {
            localities: LocalityDirectory::new(store.clone()),
            shipments: ShipmentService::new(store, catalog, notifier),
        }
    }

    /// Wires the HTTP catalog and notifier when their URLs are configured,
    /// the built-in catalog and a logging notifier otherwise.
    pub fn from_config(store: S, config: &LogisticsConfig) -> Result<Self, StartupError> {
        let catalog: DynCatalog = match &config.catalog_url {
            Some(url) => Arc::new(HttpCatalogClient::new(url, config.upstream_timeout)?),
            None => {
                tracing::info!("CATALOG_URL not set, using the built-in catalog");
                Arc::new(StaticCatalog::new())
            }
        };
        let notifier: DynNotifier = match &config.purchasing_url {
            Some(url) => Arc::new(HttpPurchasingNotifier::new(url, config.upstream_timeout)?),
            None => {
                tracing::info!("PURCHASING_URL not set, cancellation notices are only logged");
                Arc::new(LoggingNotifier)
            }
        };
        Ok(Self::new(store, catalog, notifier))
    }
}

impl LogisticsState<InMemoryLogisticsStore> {
    /// In-memory store seeded with `data`, built-in catalog, logging notifier.
    pub fn in_memory(data: &ReferenceData) -> Self {
        Self::new(
            InMemoryLogisticsStore::with_reference_data(data),
            Arc::new(StaticCatalog::new()),
            Arc::new(LoggingNotifier),
        )
    }
}

/// Checkout coordinator with in-process carts, users and orders.
pub type Checkout = CheckoutCoordinator<
    InMemoryCartStore,
    InMemoryUserDirectory,
    InMemoryOrderBook,
    Arc<dyn StockClient>,
    Arc<dyn ShippingClient>,
>;

/// State of the purchasing server.
pub struct PurchasingState {
    pub checkout: Checkout,
}

impl PurchasingState {
    pub fn new(stock: Arc<dyn StockClient>, shipping: Arc<dyn ShippingClient>) -> Self {
        Self {
            checkout: CheckoutCoordinator::new(
                InMemoryCartStore::new(),
                InMemoryUserDirectory::new(),
                InMemoryOrderBook::new(),
                stock,
                shipping,
            ),
        }
    }

    pub fn from_config(config: &PurchasingConfig) -> Result<Self, StartupError> {
        let stock = HttpStockClient::new(&config.stock_url, config.upstream_timeout)?;
        let shipping = HttpShippingClient::new(&config.logistics_url, config.upstream_timeout)?;
        let state = Self::new(Arc::new(stock), Arc::new(shipping));
        Ok(Self {
            checkout: state.checkout.with_call_timeout(config.upstream_timeout),
        })
    }
}

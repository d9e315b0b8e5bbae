//! Shopping carts.
//!
//! One cart per user. Every mutation is a compare-and-swap on the cart
//! [`Version`]; a lost race reloads the cart and applies the change again.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, ProductId, UserId, Version};
use serde::{Deserialize, Serialize};

use crate::error::CartError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Highest accepted unit price, 99 999 999.99.
pub const MAX_UNIT_PRICE: Money = Money::from_cents(9_999_999_999);

/// A product in the cart with the price it had when it was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub version: Version,
}

impl Cart {
    /// A cart that was never saved.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            version: Version::initial(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of unit price times quantity over all lines.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// The subtotal, or `None` when it does not fit in a [`Money`].
    pub fn checked_subtotal(&self) -> Option<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.unit_price.checked_multiply(item.quantity)?)
        })
    }

    /// Rejects carts whose total cannot be represented.
    fn ensure_total(&self) -> Result<(), CartError> {
        self.checked_subtotal()
            .map(|_| ())
            .ok_or(CartError::TotalTooLarge)
    }

    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    fn item_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }
}

/// Cart persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's cart, or an empty one at the initial version.
    async fn load(&self, user_id: UserId) -> Result<Cart, CartError>;

    /// Stores `cart` if the stored version is still `expected`. Returns the
    /// cart at its new version.
    async fn save(&self, cart: Cart, expected: Version) -> Result<Cart, CartError>;
}

/// In-memory cart store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, user_id: UserId) -> Result<Cart, CartError> {
        let carts = self
            .carts
            .read()
            .map_err(|e| CartError::Storage(e.to_string()))?;
        Ok(carts
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id)))
    }

    async fn save(&self, mut cart: Cart, expected: Version) -> Result<Cart, CartError> {
        let mut carts = self
            .carts
            .write()
            .map_err(|e| CartError::Storage(e.to_string()))?;

        let actual = carts
            .get(&cart.user_id)
            .map(|c| c.version)
            .unwrap_or_else(Version::initial);
        if actual != expected {
            return Err(CartError::Conflict {
                user_id: cart.user_id,
                expected,
                actual,
            });
        }

        cart.version = expected.next();
        carts.insert(cart.user_id, cart.clone());
        Ok(cart)
    }
}

/// Cart operations with validation and version-checked writes.
pub struct CartService<S> {
    store: S,
    max_attempts: u32,
}

impl<S: CartStore> CartService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn items(&self, user_id: UserId) -> Result<Cart, CartError> {
        self.store.load(user_id).await
    }

    pub async fn subtotal(&self, user_id: UserId) -> Result<Money, CartError> {
        Ok(self.store.load(user_id).await?.subtotal())
    }

    /// Adds a line, or increases the quantity of an existing one. The price
    /// of an existing line is kept.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Money,
    ) -> Result<Cart, CartError> {
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(CartError::InvalidQuantity)?;
        if !unit_price.is_positive() || unit_price > MAX_UNIT_PRICE {
            return Err(CartError::InvalidPrice);
        }

        self.mutate(user_id, |cart| {
            match cart.item_mut(product_id) {
                Some(item) => {
                    item.quantity = item
                        .quantity
                        .checked_add(quantity)
                        .ok_or(CartError::TotalTooLarge)?;
                }
                None => cart.items.push(CartItem {
                    product_id,
                    quantity,
                    unit_price,
                }),
            }
            cart.ensure_total()?;
            Ok(true)
        })
        .await
    }

    /// Sets the quantity of a line. Zero or less removes it.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        self.mutate(user_id, |cart| {
            if cart.item(product_id).is_none() {
                return Err(CartError::ItemNotFound(product_id));
            }
            if quantity <= 0 {
                cart.items.retain(|i| i.product_id != product_id);
            } else if let Some(item) = cart.item_mut(product_id) {
                item.quantity = u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity)?;
                cart.ensure_total()?;
            }
            Ok(true)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        self.mutate(user_id, |cart| {
            let before = cart.items.len();
            cart.items.retain(|i| i.product_id != product_id);
            if cart.items.len() == before {
                return Err(CartError::ItemNotFound(product_id));
            }
            Ok(true)
        })
        .await
    }

    /// Empties the cart. Clearing an empty cart changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<Cart, CartError> {
        self.mutate(user_id, |cart| {
            if cart.is_empty() {
                return Ok(false);
            }
            cart.items.clear();
            Ok(true)
        })
        .await
    }

    /// Loads the cart, applies `change` and saves against the loaded
    /// version. `change` returns false when there is nothing to save.
    async fn mutate<F>(&self, user_id: UserId, change: F) -> Result<Cart, CartError>
    where
        F: Fn(&mut Cart) -> Result<bool, CartError>,
    {
        for attempt in 1..=self.max_attempts {
            let mut cart = self.store.load(user_id).await?;
            let expected = cart.version;
            if !change(&mut cart)? {
                return Ok(cart);
            }

            match self.store.save(cart, expected).await {
                Ok(saved) => return Ok(saved),
                Err(CartError::Conflict { .. }) => {
                    tracing::debug!(attempt, "cart version conflict, reloading");
                }
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Contention(user_id))
    }
}

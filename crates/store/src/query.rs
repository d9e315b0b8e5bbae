use chrono::{DateTime, Utc};
use common::{PageRequest, ShippingStatus, UserId};

use crate::Locality;

/// Filters for listing shipments.
///
/// Every filter is optional; date bounds are inclusive on `created_at`.
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct ShipmentQuery {
    /// Filter by owning user.
    pub user_id: Option<UserId>,

    /// Filter by current status.
    pub status: Option<ShippingStatus>,

    /// Shipments created at or after this instant.
    pub created_from: Option<DateTime<Utc>>,

    /// Shipments created at or before this instant.
    pub created_to: Option<DateTime<Utc>>,

    pub page: PageRequest,
}

impl ShipmentQuery {
    /// Creates a new unfiltered query for the first page.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn status(mut self, status: ShippingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_from(mut self, from: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self
    }

    pub fn created_to(mut self, to: DateTime<Utc>) -> Self {
        self.created_to = Some(to);
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// Returns true if a shipment with these attributes passes every filter.
    pub fn matches(&self, user_id: UserId, status: ShippingStatus, created_at: DateTime<Utc>) -> bool {
        if let Some(wanted) = self.user_id
            && wanted != user_id
        {
            return false;
        }
        if let Some(wanted) = self.status
            && wanted != status
        {
            return false;
        }
        if let Some(from) = self.created_from
            && created_at < from
        {
            return false;
        }
        if let Some(to) = self.created_to
            && created_at > to
        {
            return false;
        }
        true
    }
}

/// Filters for searching the locality table.
///
/// `state` matches exactly and `locality_name` as a substring, both ignoring
/// case; `postal_code` matches exactly. Results are ordered by state, name
/// and postal code.
#[derive(Debug, Clone)]
pub struct LocalityQuery {
    pub state: Option<String>,
    pub locality_name: Option<String>,
    pub postal_code: Option<String>,
    pub page: PageRequest,
}

impl LocalityQuery {
    /// Default page size for locality searches.
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn new() -> Self {
        Self {
            state: None,
            locality_name: None,
            postal_code: None,
            page: PageRequest::parse_with_default_limit(None, None, Self::DEFAULT_LIMIT),
        }
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn locality_name(mut self, name: impl Into<String>) -> Self {
        self.locality_name = Some(name.into());
        self
    }

    pub fn postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// True when no filter is set.
    pub fn is_unfiltered(&self) -> bool {
        self.state.is_none() && self.locality_name.is_none() && self.postal_code.is_none()
    }

    pub fn matches(&self, locality: &Locality) -> bool {
        if let Some(state) = &self.state
            && !locality.state.eq_ignore_ascii_case(state)
        {
            return false;
        }
        if let Some(name) = &self.locality_name
            && !locality
                .locality_name
                .to_lowercase()
                .contains(&name.to_lowercase())
        {
            return false;
        }
        if let Some(postal_code) = &self.postal_code
            && locality.postal_code != *postal_code
        {
            return false;
        }
        true
    }
}

impl Default for LocalityQuery {
    fn default() -> Self {
        Self::new()
    }
}

//! Locality lookup for address forms and diagnostics.

use common::Paginated;
use serde::Serialize;
use store::{Locality, LocalityQuery, LocalityRepository, StoreError};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum LocalityError {
    #[error("At least one of state, locality_name or postal_code is required")]
    MissingParameters,

    #[error("Locality '{locality_name}' with postal code {postal_code} not found")]
    NotFound {
        postal_code: String,
        locality_name: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl LocalityError {
    pub fn code(&self) -> &'static str {
        match self {
            LocalityError::MissingParameters => "missing_parameters",
            LocalityError::NotFound { .. } => "not_found",
            LocalityError::Store(_) => "internal_error",
        }
    }
}

/// Result of a lookup: the composite key names one locality, anything
/// else is a page of matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocalityLookup {
    One(Locality),
    Page(Paginated<Locality>),
}

/// Read-only view over the locality table.
#[derive(Clone)]
pub struct LocalityDirectory<L> {
    repo: L,
}

impl<L: LocalityRepository> LocalityDirectory<L> {
    pub fn new(repo: L) -> Self {
        Self { repo }
    }

    /// Resolves a lookup. Postal code plus name is an exact key; any other
    /// non-empty combination is a search.
    #[instrument(skip(self, query), fields(
        state = query.state.as_deref(),
        locality_name = query.locality_name.as_deref(),
        postal_code = query.postal_code.as_deref(),
    ))]
    pub async fn lookup(&self, query: LocalityQuery) -> Result<LocalityLookup, LocalityError> {
        if let (Some(postal_code), Some(name)) = (&query.postal_code, &query.locality_name) {
            return match self.repo.locality(postal_code, name).await? {
                Some(found) => Ok(LocalityLookup::One(found)),
                None => Err(LocalityError::NotFound {
                    postal_code: postal_code.clone(),
                    locality_name: name.clone(),
                }),
            };
        }
        self.search(&query).await.map(LocalityLookup::Page)
    }

    pub async fn search(
        &self,
        query: &LocalityQuery,
    ) -> Result<Paginated<Locality>, LocalityError> {
        if query.is_unfiltered() {
            return Err(LocalityError::MissingParameters);
        }
        let (items, total) = self.repo.search_localities(query).await?;
        tracing::debug!(total, "locality search");
        Ok(Paginated::new(items, query.page, total))
    }
}

#[cfg(test)]
mod tests {
    use store::{InMemoryLogisticsStore, ReferenceData};

    use super::*;

    fn directory() -> LocalityDirectory<InMemoryLogisticsStore> {
        LocalityDirectory::new(InMemoryLogisticsStore::with_reference_data(
            &ReferenceData::builtin(),
        ))
    }

    #[tokio::test]
    async fn composite_key_returns_one_locality() {
        let found = directory()
            .lookup(LocalityQuery::new().postal_code("H3500").locality_name("resistencia"))
            .await
            .unwrap();
        let LocalityLookup::One(locality) = found else {
            panic!("expected a single locality");
        };
        assert_eq!(locality.state, "Chaco");

        let err = directory()
            .lookup(LocalityQuery::new().postal_code("H3500").locality_name("Posadas"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn partial_filters_search() {
        let found = directory()
            .lookup(LocalityQuery::new().postal_code("B1708"))
            .await
            .unwrap();
        let LocalityLookup::Page(page) = found else {
            panic!("expected a page");
        };
        assert_eq!(page.pagination.total_items, 2);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let err = directory().lookup(LocalityQuery::new()).await.unwrap_err();
        assert!(matches!(err, LocalityError::MissingParameters));
        assert_eq!(err.code(), "missing_parameters");
    }
}

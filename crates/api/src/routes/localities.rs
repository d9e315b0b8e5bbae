//! Locality lookup endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use common::PageRequest;
use logistics::LocalityLookup;
use serde::Deserialize;
use store::{LocalityQuery, LogisticsStore};

use crate::error::ApiError;
use crate::state::LogisticsState;

#[derive(Debug, Default, Deserialize)]
pub struct LocalityParams {
    pub postal_code: Option<String>,
    pub locality_name: Option<String>,
    pub state: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn present(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Blank filters count as missing; pagination parses leniently.
pub fn locality_query(params: LocalityParams) -> LocalityQuery {
    let mut query = LocalityQuery::new().page(PageRequest::parse_with_default_limit(
        params.page.as_deref(),
        params.limit.as_deref(),
        LocalityQuery::DEFAULT_LIMIT,
    ));
    if let Some(postal_code) = present(params.postal_code) {
        query = query.postal_code(postal_code);
    }
    if let Some(name) = present(params.locality_name) {
        query = query.locality_name(name);
    }
    if let Some(state) = present(params.state) {
        query = query.state(state);
    }
    query
}

/// GET /localities — one locality for postal_code + locality_name, a page
/// of matches for any other filter combination.
pub async fn lookup<S: LogisticsStore + Clone + 'static>(
    State(state): State<Arc<LogisticsState<S>>>,
    Query(params): Query<LocalityParams>,
) -> Result<Json<LocalityLookup>, ApiError> {
    Ok(Json(state.localities.lookup(locality_query(params)).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_dropped() {
        let query = locality_query(LocalityParams {
            postal_code: Some(" ".to_string()),
            state: Some(" Chaco ".to_string()),
            ..LocalityParams::default()
        });
        assert_eq!(query.postal_code, None);
        assert_eq!(query.state.as_deref(), Some("Chaco"));
        assert_eq!(query.page.limit(), LocalityQuery::DEFAULT_LIMIT);
    }
}

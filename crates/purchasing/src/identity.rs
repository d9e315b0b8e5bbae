//! Caller identity and local user records.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::UserId;
use serde::Serialize;

use crate::error::IdentityError;

/// Claims forwarded by the authenticating gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: String,
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// Who is calling. There is no fallback user: an unauthenticated caller
/// cannot check out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(TokenClaims),
    Unauthenticated,
}

impl Identity {
    /// Builds an identity from raw claim values. A missing or blank subject
    /// or email yields `Unauthenticated`.
    pub fn from_claims(
        subject: Option<&str>,
        email: Option<&str>,
        given_name: Option<&str>,
        family_name: Option<&str>,
    ) -> Self {
        let present = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match (present(subject), present(email)) {
            (Some(subject), Some(email)) => Identity::Authenticated(TokenClaims {
                subject,
                email,
                given_name: present(given_name),
                family_name: present(family_name),
            }),
            _ => Identity::Unauthenticated,
        }
    }

    pub fn claims(&self) -> Result<&TokenClaims, IdentityError> {
        match self {
            Identity::Authenticated(claims) => Ok(claims),
            Identity::Unauthenticated => Err(IdentityError::Unauthenticated),
        }
    }
}

/// A user known to purchasing, provisioned on first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUser {
    pub id: UserId,
    pub subject: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Maps identity claims to local users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the user for `claims.subject`, creating it from the claims
    /// if it does not exist yet.
    async fn resolve_or_provision(&self, claims: &TokenClaims) -> Result<LocalUser, IdentityError>;

    async fn find_by_subject(&self, subject: &str) -> Result<Option<LocalUser>, IdentityError>;
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for Arc<T> {
    async fn resolve_or_provision(&self, claims: &TokenClaims) -> Result<LocalUser, IdentityError> {
        (**self).resolve_or_provision(claims).await
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Option<LocalUser>, IdentityError> {
        (**self).find_by_subject(subject).await
    }
}

/// Resolves the identity to a local user, failing for anonymous callers.
pub async fn resolve_user<U: UserDirectory + ?Sized>(
    directory: &U,
    identity: &Identity,
) -> Result<LocalUser, IdentityError> {
    let claims = identity.claims()?;
    directory.resolve_or_provision(claims).await
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<String, LocalUser>,
    next_id: i64,
}

/// In-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.state.read().map(|s| s.users.len()).unwrap_or(0)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    #[tracing::instrument(skip(self, claims), fields(subject = %claims.subject))]
    async fn resolve_or_provision(&self, claims: &TokenClaims) -> Result<LocalUser, IdentityError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| IdentityError::Directory(e.to_string()))?;

        if let Some(user) = state.users.get(&claims.subject) {
            return Ok(user.clone());
        }

        state.next_id += 1;
        let user = LocalUser {
            id: UserId::new(state.next_id),
            subject: claims.subject.clone(),
            email: claims.email.clone(),
            first_name: claims.given_name.clone().unwrap_or_default(),
            last_name: claims.family_name.clone().unwrap_or_default(),
            created_at: Utc::now(),
        };
        state.users.insert(claims.subject.clone(), user.clone());
        tracing::info!(user_id = %user.id, "provisioned local user");
        Ok(user)
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Option<LocalUser>, IdentityError> {
        let state = self
            .state
            .read()
            .map_err(|e| IdentityError::Directory(e.to_string()))?;
        Ok(state.users.get(subject).cloned())
    }
}

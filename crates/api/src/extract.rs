//! Request extractors.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use purchasing::Identity;

/// Headers carrying the claims forwarded by the authenticating gateway.
pub const SUBJECT_HEADER: &str = "x-auth-subject";
pub const EMAIL_HEADER: &str = "x-auth-email";
pub const GIVEN_NAME_HEADER: &str = "x-auth-given-name";
pub const FAMILY_NAME_HEADER: &str = "x-auth-family-name";

/// The caller's identity. Never rejects: anonymous requests yield
/// `Identity::Unauthenticated` and the handler decides.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(Identity::from_claims(
            header(parts, SUBJECT_HEADER),
            header(parts, EMAIL_HEADER),
            header(parts, GIVEN_NAME_HEADER),
            header(parts, FAMILY_NAME_HEADER),
        )))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

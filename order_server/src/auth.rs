//! Caller identity.
//!
//! Authentication happens upstream. The authenticating proxy forwards the caller's opaque user id and role in the
//! `X-User-Id` and `X-User-Role` headers, and this module turns those into an engine [`Caller`]. A request without
//! both headers, or with an unknown role, is unauthenticated.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpMessage, HttpRequest};
use log::debug;
use order_engine::db_types::{Caller, Role};

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Reads the caller from the identity headers.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ServerError> {
    let user_id = required_header(headers, USER_ID_HEADER)?;
    let role = required_header(headers, USER_ROLE_HEADER)?.parse::<Role>().map_err(|e| {
        debug!("💻️ Rejecting request from {user_id}. {e}");
        ServerError::Unauthenticated(e.to_string())
    })?;
    Ok(Caller::new(user_id, role))
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ServerError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::Unauthenticated(format!("{name} header is missing")))
}

/// Handler argument carrying the authenticated caller.
///
/// The ACL middleware stores the caller in the request extensions after checking it. Handlers on routes without the
/// middleware fall back to reading the headers directly.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Caller);

impl FromRequest for CallerIdentity {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let caller = req.extensions().get::<Caller>().cloned();
        let result = match caller {
            Some(caller) => Ok(caller),
            None => caller_from_headers(req.headers()),
        };
        ready(result.map(CallerIdentity))
    }
}

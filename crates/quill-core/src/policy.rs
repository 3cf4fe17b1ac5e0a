//! Authorization policy - the ordered predicate chain every handler runs.
//!
//! The contract is authenticate -> authorize -> execute: a missing actor is
//! always reported as [`DomainError::Unauthenticated`] before any ownership
//! comparison happens, so an anonymous caller can never learn whether a
//! resource belongs to someone else.

use uuid::Uuid;

use crate::error::DomainError;

/// Require an acting identity. Reads never call this; every write does.
pub fn require_actor(actor: Option<Uuid>) -> Result<Uuid, DomainError> {
    actor.ok_or(DomainError::Unauthenticated)
}

/// Require that the acting identity is the author of the resource.
///
/// Runs [`require_actor`] first, so unauthenticated callers get
/// `Unauthenticated` even when they also fail the ownership check.
pub fn require_author(actor: Option<Uuid>, author_id: Uuid) -> Result<Uuid, DomainError> {
    let actor = require_actor(actor)?;
    if actor != author_id {
        return Err(DomainError::Forbidden);
    }
    Ok(actor)
}

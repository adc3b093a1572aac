//! Reference resolution: an `idref` becomes the identity of an existing
//! object or of a freshly created placeholder.

use crate::context::ImportContext;
use crate::identity::parse_revision_timestamp;
use crate::report::ImportIssue;
use stixgraph_core::{Existence, IdentityKey, ObjectId, ObjectStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub identity: IdentityKey,
    pub object: ObjectId,
    pub existence: Existence,
}

/// Resolve `idref` to an object, creating a placeholder when the identity is
/// unknown. The placeholder is stamped with `timestamp` when it parses, else
/// with the run's timestamp. Only store failures are errors.
pub fn resolve_reference(
    store: &mut dyn ObjectStore,
    ctx: &ImportContext,
    idref: &str,
    timestamp: Option<&str>,
    issues: &mut Vec<ImportIssue>,
) -> Result<ResolvedReference, StoreError> {
    let identity = ctx.split_id(idref, issues).identity();
    let timestamp = timestamp
        .and_then(parse_revision_timestamp)
        .unwrap_or(ctx.timestamp);
    let (object, existence) = store.get_or_create_placeholder(&identity, timestamp)?;
    tracing::debug!(identity = %identity, ?existence, "resolved reference");
    Ok(ResolvedReference {
        identity,
        object,
        existence,
    })
}

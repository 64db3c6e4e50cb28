//! Bootstrap vs. continuation.

use carryover_config::Resource;
use carryover_store::SnapshotQuery;

/// What a synchronization has to do for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  /// First run for the resource: there is nothing to restore.
  Bootstrap,

  /// A previous run captured state; `query` selects its snapshot.
  Continue { query: SnapshotQuery },
}

/// Decide whether `resource` is bootstrapping or continuing, and build the
/// store query for a continuation.
///
/// A missing or empty prior content identifier means bootstrap.
pub fn resolve(resource: &Resource) -> Resolution {
  match resource.prior_content_id() {
    Some(content_id) => Resolution::Continue {
      query: SnapshotQuery::new(content_id),
    },
    None => Resolution::Bootstrap,
  }
}

//! Symbol resolution boundary contract.

use scanspec_shared::Result;

/// Resolves a dotted unit name to a loadable handle.
///
/// Dispatch calls this lazily, once per matched name, after the scan has
/// finished. Registration never resolves anything.
pub trait SymbolResolverPort: Send + Sync {
    /// Handle passed to match callbacks.
    type Handle;

    /// Resolve one name.
    fn resolve(&self, name: &str) -> Result<Self::Handle>;
}

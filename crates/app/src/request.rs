//! Direct requests for one named unit.

use scanspec_domain::ScanSpec;
use scanspec_ports::SymbolResolverPort;
use scanspec_shared::{ErrorCode, ErrorEnvelope, Result};

/// Resolve a unit the caller asked for by name.
///
/// Unlike dispatch, a failure here is fatal to the request: a name the spec
/// excludes is rejected before resolution, and a resolver error is wrapped as
/// `resolve:failed`.
pub fn resolve_requested_unit<H>(
    spec: &ScanSpec,
    resolver: &dyn SymbolResolverPort<Handle = H>,
    name: &str,
) -> Result<H> {
    spec.check_requested_unit(name)
        .map_err(ErrorEnvelope::from)?;
    resolver.resolve(name).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("resolve", "failed"),
            format!("could not resolve {name}: {}", error.message),
            error.class,
        )
        .with_metadata("unit", name)
        .with_metadata("cause", error.code.to_string())
    })
}

//! Symbol resolver backed by the unit graph.

use crate::graph::InMemoryUnitGraph;
use scanspec_domain::UnitKind;
use scanspec_ports::{SymbolResolverPort, UnitGraphPort};
use scanspec_shared::{ErrorCode, ErrorEnvelope, Result};
use serde::Serialize;
use std::sync::Arc;

/// Handle produced by [`GraphBackedResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUnit {
    /// Dotted unit name.
    pub name: String,
    /// Declared kind.
    pub kind: UnitKind,
}

/// Resolves names that the graph declares.
#[derive(Debug, Clone)]
pub struct GraphBackedResolver {
    graph: Arc<InMemoryUnitGraph>,
}

impl GraphBackedResolver {
    /// Resolve against `graph`.
    #[must_use]
    pub const fn new(graph: Arc<InMemoryUnitGraph>) -> Self {
        Self { graph }
    }
}

impl SymbolResolverPort for GraphBackedResolver {
    type Handle = ResolvedUnit;

    fn resolve(&self, name: &str) -> Result<ResolvedUnit> {
        let kind = self.graph.unit_kind(name).ok_or_else(|| {
            ErrorEnvelope::expected(ErrorCode::not_found(), format!("unit {name} was not scanned"))
                .with_metadata("unit", name)
        })?;
        Ok(ResolvedUnit {
            name: name.to_owned(),
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanspec_domain::UnitFacts;

    #[test]
    fn declared_units_resolve_and_others_do_not() -> Result<()> {
        let graph = InMemoryUnitGraph::from_facts([
            UnitFacts::new("a.A", UnitKind::Standard).extends("ext.Missing"),
        ])?;
        let resolver = GraphBackedResolver::new(Arc::new(graph));

        assert_eq!(
            resolver.resolve("a.A")?,
            ResolvedUnit {
                name: "a.A".to_owned(),
                kind: UnitKind::Standard,
            }
        );
        let error = resolver.resolve("ext.Missing").err();
        assert!(matches!(
            error,
            Some(ref error) if error.code == ErrorCode::not_found()
        ));
        Ok(())
    }
}

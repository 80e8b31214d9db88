//! In-memory unit graph built from scanner facts.

use scanspec_domain::{UnitFacts, UnitKind};
use scanspec_ports::UnitGraphPort;
use scanspec_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Relationship graph answering transitive queries over recorded facts.
///
/// Names referenced by facts but never declared (for example a superclass
/// outside the scanned tree) take part in relationships but have no kind.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitGraph {
    kinds: BTreeMap<String, UnitKind>,
    direct_subclasses: BTreeMap<String, BTreeSet<String>>,
    direct_subinterfaces: BTreeMap<String, BTreeSet<String>>,
    direct_implementors: BTreeMap<String, BTreeSet<String>>,
    field_type_users: BTreeMap<String, BTreeSet<String>>,
    metadata_users: BTreeMap<String, BTreeSet<String>>,
}

fn link(index: &mut BTreeMap<String, BTreeSet<String>>, target: &str, unit: &str) {
    index
        .entry(target.to_owned())
        .or_default()
        .insert(unit.to_owned());
}

fn lookup(index: &BTreeMap<String, BTreeSet<String>>, key: &str) -> BTreeSet<String> {
    index.get(key).cloned().unwrap_or_default()
}

/// Every node reachable from `start` through `edges`, excluding `start`.
fn reachable(edges: &BTreeMap<String, BTreeSet<String>>, start: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in edges.get(current).into_iter().flatten() {
            if next != start && seen.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Parse a JSON array of unit facts.
pub fn parse_facts_json(text: &str) -> Result<Vec<UnitFacts>> {
    serde_json::from_str(text).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("graph", "invalid_facts"),
            format!("invalid unit facts JSON: {error}"),
        )
    })
}

impl InMemoryUnitGraph {
    /// Build the graph; a name declared twice is rejected.
    pub fn from_facts<I>(facts: I) -> Result<Self>
    where
        I: IntoIterator<Item = UnitFacts>,
    {
        let mut graph = Self::default();
        for unit in facts {
            if graph.kinds.insert(unit.name.clone(), unit.kind).is_some() {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::new("graph", "duplicate_unit"),
                    format!("unit {} is declared more than once", unit.name),
                )
                .with_metadata("unit", unit.name));
            }
            if let Some(superclass) = &unit.superclass {
                link(&mut graph.direct_subclasses, superclass, &unit.name);
            }
            for interface in &unit.interfaces {
                match unit.kind {
                    UnitKind::Interface => {
                        link(&mut graph.direct_subinterfaces, interface, &unit.name);
                    },
                    UnitKind::Standard => {
                        link(&mut graph.direct_implementors, interface, &unit.name);
                    },
                    UnitKind::Metadata => {},
                }
            }
            for type_name in &unit.field_types {
                link(&mut graph.field_type_users, type_name, &unit.name);
            }
            for metadata in &unit.metadata {
                link(&mut graph.metadata_users, metadata, &unit.name);
            }
        }
        Ok(graph)
    }

    /// Parse a JSON array of unit facts and build the graph.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_facts(parse_facts_json(text)?)
    }

    /// Number of declared units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// True when no unit is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn is_standard(&self, name: &str) -> bool {
        self.kinds.get(name) == Some(&UnitKind::Standard)
    }
}

impl UnitGraphPort for InMemoryUnitGraph {
    fn all_unit_names(&self) -> BTreeSet<String> {
        self.kinds.keys().cloned().collect()
    }

    fn unit_names_of_kind(&self, kind: UnitKind) -> BTreeSet<String> {
        self.kinds
            .iter()
            .filter(|(_, unit_kind)| **unit_kind == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn unit_kind(&self, name: &str) -> Option<UnitKind> {
        self.kinds.get(name).copied()
    }

    fn subclasses_of(&self, superclass: &str) -> BTreeSet<String> {
        reachable(&self.direct_subclasses, superclass)
            .into_iter()
            .filter(|name| self.is_standard(name))
            .collect()
    }

    fn subinterfaces_of(&self, interface: &str) -> BTreeSet<String> {
        reachable(&self.direct_subinterfaces, interface)
    }

    fn implementors_of(&self, interface: &str) -> BTreeSet<String> {
        let mut interfaces = self.subinterfaces_of(interface);
        interfaces.insert(interface.to_owned());

        let direct: BTreeSet<String> = interfaces
            .iter()
            .flat_map(|name| lookup(&self.direct_implementors, name))
            .collect();
        let mut implementors = direct.clone();
        for unit in &direct {
            implementors.extend(self.subclasses_of(unit));
        }
        implementors
            .into_iter()
            .filter(|name| self.is_standard(name))
            .collect()
    }

    fn units_with_field_of_type(&self, type_name: &str) -> BTreeSet<String> {
        lookup(&self.field_type_users, type_name)
    }

    fn units_with_metadata(&self, metadata: &str) -> BTreeSet<String> {
        lookup(&self.metadata_users, metadata)
    }
}

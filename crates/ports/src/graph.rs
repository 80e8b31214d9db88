//! Completed relationship graph consumed by dispatch.

use scanspec_domain::UnitKind;
use std::collections::BTreeSet;

/// Read-only view over the unit graph built by an external scan.
///
/// Every query answers with dotted unit names. Relationship queries are
/// transitive: subclasses include indirect subclasses, and implementors
/// include subclasses of implementing units.
pub trait UnitGraphPort: Send + Sync {
    /// Every unit in the graph.
    fn all_unit_names(&self) -> BTreeSet<String>;

    /// Units of one declaration kind.
    fn unit_names_of_kind(&self, kind: UnitKind) -> BTreeSet<String>;

    /// Recorded kind of a unit, if the graph knows it.
    fn unit_kind(&self, name: &str) -> Option<UnitKind>;

    /// Standard units extending `superclass`, directly or indirectly.
    fn subclasses_of(&self, superclass: &str) -> BTreeSet<String>;

    /// Interfaces extending `interface`, directly or indirectly.
    fn subinterfaces_of(&self, interface: &str) -> BTreeSet<String>;

    /// Standard units implementing `interface` or one of its sub-interfaces.
    fn implementors_of(&self, interface: &str) -> BTreeSet<String>;

    /// Units declaring a field whose type is `type_name`.
    fn units_with_field_of_type(&self, type_name: &str) -> BTreeSet<String>;

    /// Units carrying the metadata declaration `metadata`.
    fn units_with_metadata(&self, metadata: &str) -> BTreeSet<String>;
}

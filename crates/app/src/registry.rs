//! Deferred matcher registration.
//!
//! Matchers are recorded while the scan is configured and only run after the
//! scan has produced a complete unit graph. Registration validates the target
//! names it is given but never resolves them.

use crate::files::{FileMatchCallback, FileMatcher, FilePathTest};
use scanspec_domain::{ConstantValue, ScanSpec, UnitKind, split_field_name};
use scanspec_shared::{ErrorCode, ErrorEnvelope, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Registration-order identifier of a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MatcherId(usize);

impl MatcherId {
    /// Zero-based registration index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for MatcherId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// The graph query a unit matcher runs at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitQuery {
    /// Every unit.
    AllUnits,
    /// Units that are neither interfaces nor metadata declarations.
    StandardUnits,
    /// Interface units.
    InterfaceUnits,
    /// Metadata declaration units.
    MetadataUnits,
    /// Standard units extending the target.
    SubclassesOf(String),
    /// Interfaces extending the target.
    SubinterfacesOf(String),
    /// Standard units implementing the target interface.
    ImplementorsOf(String),
    /// Units declaring a field of the target type.
    WithFieldOfType(String),
    /// Units carrying the target metadata declaration.
    WithMetadata(String),
}

impl UnitQuery {
    /// Target name, for queries that have one.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::AllUnits | Self::StandardUnits | Self::InterfaceUnits | Self::MetadataUnits => {
                None
            },
            Self::SubclassesOf(target)
            | Self::SubinterfacesOf(target)
            | Self::ImplementorsOf(target)
            | Self::WithFieldOfType(target)
            | Self::WithMetadata(target) => Some(target),
        }
    }

    /// Kind the target must have in the graph, when the query constrains it.
    #[must_use]
    pub const fn expected_target_kind(&self) -> Option<UnitKind> {
        match self {
            Self::SubclassesOf(_) => Some(UnitKind::Standard),
            Self::SubinterfacesOf(_) | Self::ImplementorsOf(_) => Some(UnitKind::Interface),
            Self::WithMetadata(_) => Some(UnitKind::Metadata),
            _ => None,
        }
    }

    /// Stable label for logs and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AllUnits => "all_units",
            Self::StandardUnits => "standard_units",
            Self::InterfaceUnits => "interface_units",
            Self::MetadataUnits => "metadata_units",
            Self::SubclassesOf(_) => "subclasses_of",
            Self::SubinterfacesOf(_) => "subinterfaces_of",
            Self::ImplementorsOf(_) => "implementors_of",
            Self::WithFieldOfType(_) => "with_field_of_type",
            Self::WithMetadata(_) => "with_metadata",
        }
    }
}

/// Callback receiving the resolved handle of one matched unit.
pub type UnitCallback<H> = Box<dyn Fn(&H) -> Result<()> + Send + Sync>;

/// Callback receiving `(unit name, field name, constant value)`.
pub type FieldCallback = Arc<dyn Fn(&str, &str, &ConstantValue) -> Result<()> + Send + Sync>;

/// A recorded unit query plus its callback.
pub struct UnitMatcher<H> {
    pub(crate) id: MatcherId,
    pub(crate) query: UnitQuery,
    pub(crate) callback: UnitCallback<H>,
}

impl<H> UnitMatcher<H> {
    /// Registration identifier.
    #[must_use]
    pub const fn id(&self) -> MatcherId {
        self.id
    }

    /// Recorded query.
    #[must_use]
    pub const fn query(&self) -> &UnitQuery {
        &self.query
    }
}

impl<H> fmt::Debug for UnitMatcher<H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UnitMatcher")
            .field("id", &self.id)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

/// Field callbacks keyed by unit then field, plus the unit → fields view.
#[derive(Default, Clone)]
pub struct FieldMatchIndex {
    callbacks: BTreeMap<String, BTreeMap<String, Vec<(MatcherId, FieldCallback)>>>,
    fields_by_unit: BTreeMap<String, BTreeSet<String>>,
}

impl FieldMatchIndex {
    fn insert(&mut self, id: MatcherId, unit: &str, field: &str, callback: FieldCallback) {
        self.callbacks
            .entry(unit.to_owned())
            .or_default()
            .entry(field.to_owned())
            .or_default()
            .push((id, callback));
        self.fields_by_unit
            .entry(unit.to_owned())
            .or_default()
            .insert(field.to_owned());
    }

    /// Callbacks registered for one field, in registration order.
    pub(crate) fn callbacks_for(&self, unit: &str, field: &str) -> &[(MatcherId, FieldCallback)] {
        self.callbacks
            .get(unit)
            .and_then(|fields| fields.get(field))
            .map_or(&[], Vec::as_slice)
    }

    /// Field names of interest per unit, for restricting constant extraction.
    #[must_use]
    pub const fn fields_by_unit(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.fields_by_unit
    }

    /// True when no field callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for FieldMatchIndex {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FieldMatchIndex")
            .field("fields_by_unit", &self.fields_by_unit)
            .finish_non_exhaustive()
    }
}

struct RegistryState<H> {
    next_id: usize,
    unit_matchers: Vec<UnitMatcher<H>>,
    field_index: FieldMatchIndex,
    file_matchers: Vec<FileMatcher>,
}

impl<H> RegistryState<H> {
    fn allocate_id(&mut self) -> MatcherId {
        let id = MatcherId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Append-only matcher registry bound to one compiled spec.
///
/// Registration takes `&self` and is serialized internally, so the registry
/// can be shared while several configuration paths add matchers.
pub struct MatcherRegistry<H> {
    spec: Arc<ScanSpec>,
    max_content_bytes: u64,
    state: Mutex<RegistryState<H>>,
}

fn poisoned() -> ErrorEnvelope {
    ErrorEnvelope::invariant(
        ErrorCode::new("registry", "poisoned"),
        "matcher registry lock poisoned by an earlier panic",
    )
}

impl<H> MatcherRegistry<H> {
    /// Create an empty registry.
    #[must_use]
    pub fn new(spec: Arc<ScanSpec>, max_content_bytes: u64) -> Self {
        Self {
            spec,
            max_content_bytes,
            state: Mutex::new(RegistryState {
                next_id: 0,
                unit_matchers: Vec::new(),
                field_index: FieldMatchIndex::default(),
                file_matchers: Vec::new(),
            }),
        }
    }

    /// The spec this registry validates against.
    #[must_use]
    pub fn spec(&self) -> &Arc<ScanSpec> {
        &self.spec
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState<H>>> {
        self.state.lock().map_err(|_| poisoned())
    }

    fn push_unit_matcher(&self, query: UnitQuery, callback: UnitCallback<H>) -> Result<MatcherId> {
        if let Some(target) = query.target() {
            self.spec
                .check_requested_unit(target)
                .map_err(ErrorEnvelope::from)?;
        }
        let mut state = self.lock()?;
        let id = state.allocate_id();
        state.unit_matchers.push(UnitMatcher {
            id,
            query,
            callback,
        });
        Ok(id)
    }

    /// Register a query with a boxed callback.
    pub fn register(&self, query: UnitQuery, callback: UnitCallback<H>) -> Result<MatcherId> {
        self.push_unit_matcher(query, callback)
    }

    /// Call back for every unit in scope.
    pub fn match_all_units<F>(&self, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(UnitQuery::AllUnits, Box::new(callback))
    }

    /// Call back for every standard unit in scope.
    pub fn match_standard_units<F>(&self, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(UnitQuery::StandardUnits, Box::new(callback))
    }

    /// Call back for every interface in scope.
    pub fn match_interface_units<F>(&self, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(UnitQuery::InterfaceUnits, Box::new(callback))
    }

    /// Call back for every metadata declaration in scope.
    pub fn match_metadata_units<F>(&self, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(UnitQuery::MetadataUnits, Box::new(callback))
    }

    /// Call back for every subclass of `superclass`.
    pub fn match_subclasses_of<F>(&self, superclass: &str, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(UnitQuery::SubclassesOf(superclass.to_owned()), Box::new(callback))
    }

    /// Call back for every sub-interface of `interface`.
    pub fn match_subinterfaces_of<F>(&self, interface: &str, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(
            UnitQuery::SubinterfacesOf(interface.to_owned()),
            Box::new(callback),
        )
    }

    /// Call back for every implementor of `interface`.
    pub fn match_implementors_of<F>(&self, interface: &str, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(
            UnitQuery::ImplementorsOf(interface.to_owned()),
            Box::new(callback),
        )
    }

    /// Call back for every unit with a field of type `type_name`.
    pub fn match_with_field_of_type<F>(&self, type_name: &str, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(
            UnitQuery::WithFieldOfType(type_name.to_owned()),
            Box::new(callback),
        )
    }

    /// Call back for every unit carrying the `metadata` declaration.
    pub fn match_with_metadata<F>(&self, metadata: &str, callback: F) -> Result<MatcherId>
    where
        F: Fn(&H) -> Result<()> + Send + Sync + 'static,
    {
        self.push_unit_matcher(UnitQuery::WithMetadata(metadata.to_owned()), Box::new(callback))
    }

    /// Call back for constant initializers of the named `Unit.field`s.
    ///
    /// All names are validated before any is recorded.
    pub fn match_constant_fields<I, S, F>(&self, qualified_fields: I, callback: F) -> Result<MatcherId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str, &str, &ConstantValue) -> Result<()> + Send + Sync + 'static,
    {
        let mut targets = Vec::new();
        for qualified in qualified_fields {
            let qualified = qualified.as_ref();
            let (unit, field) = split_field_name(qualified).ok_or_else(|| {
                ErrorEnvelope::expected(
                    ErrorCode::invalid_input(),
                    format!("`{qualified}` is not a fully-qualified field name (Unit.field)"),
                )
                .with_metadata("field", qualified)
            })?;
            self.spec
                .check_requested_unit(unit)
                .map_err(ErrorEnvelope::from)?;
            targets.push((unit.to_owned(), field.to_owned()));
        }

        let callback: FieldCallback = Arc::new(callback);
        let mut state = self.lock()?;
        let id = state.allocate_id();
        for (unit, field) in &targets {
            state.field_index.insert(id, unit, field, Arc::clone(&callback));
        }
        Ok(id)
    }

    /// Call back for discovered files passing `test`.
    pub fn match_files(&self, test: FilePathTest, callback: FileMatchCallback) -> Result<MatcherId> {
        let mut state = self.lock()?;
        let id = state.allocate_id();
        state.file_matchers.push(FileMatcher { id, test, callback });
        Ok(id)
    }

    /// Field names of interest per unit registered so far.
    pub fn fields_of_interest(&self) -> Result<BTreeMap<String, BTreeSet<String>>> {
        Ok(self.lock()?.field_index.fields_by_unit().clone())
    }

    /// Number of registrations so far: unit, field, and file matchers alike.
    ///
    /// A `match_constant_fields` call counts once however many fields it names.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.next_id)
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Stop accepting registrations and hand the matchers to dispatch.
    pub fn seal(self) -> Result<SealedRegistry<H>> {
        let state = self.state.into_inner().map_err(|_| poisoned())?;
        Ok(SealedRegistry {
            spec: self.spec,
            max_content_bytes: self.max_content_bytes,
            unit_matchers: state.unit_matchers,
            field_index: state.field_index,
            file_matchers: state.file_matchers,
        })
    }
}

/// Registry that no longer accepts matchers.
///
/// File matchers can be driven during the scan; unit and field matchers run
/// once through [`SealedRegistry::run_all`], which consumes the registry.
pub struct SealedRegistry<H> {
    pub(crate) spec: Arc<ScanSpec>,
    pub(crate) max_content_bytes: u64,
    pub(crate) unit_matchers: Vec<UnitMatcher<H>>,
    pub(crate) field_index: FieldMatchIndex,
    pub(crate) file_matchers: Vec<FileMatcher>,
}

impl<H> SealedRegistry<H> {
    /// Recorded unit matchers in registration order.
    #[must_use]
    pub fn unit_matchers(&self) -> &[UnitMatcher<H>] {
        &self.unit_matchers
    }

    /// Recorded field callbacks.
    #[must_use]
    pub const fn field_index(&self) -> &FieldMatchIndex {
        &self.field_index
    }

    /// The spec used for filtering query results.
    #[must_use]
    pub fn spec(&self) -> &ScanSpec {
        &self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(tokens: &[&str]) -> MatcherRegistry<String> {
        MatcherRegistry::new(Arc::new(ScanSpec::compile(tokens.iter().copied())), 1024)
    }

    #[test]
    fn registration_assigns_sequential_ids() -> Result<()> {
        let registry = registry(&["com.foo"]);
        let first = registry.match_all_units(|_| Ok(()))?;
        let second = registry.match_subclasses_of("com.foo.Base", |_| Ok(()))?;
        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(registry.len()?, 2);
        Ok(())
    }

    #[test]
    fn len_counts_every_registration_kind() -> Result<()> {
        let registry = registry(&["com.foo"]);
        assert!(registry.is_empty()?);
        registry.match_standard_units(|_| Ok(()))?;
        registry.match_constant_fields(["com.foo.A.X", "com.foo.A.Y"], |_, _, _| Ok(()))?;
        registry.match_files(
            FilePathTest::extension("xml"),
            FileMatchCallback::contents(|_, _| Ok(())),
        )?;
        assert_eq!(registry.len()?, 3);
        assert!(!registry.is_empty()?);
        Ok(())
    }

    #[test]
    fn blacklisted_target_is_rejected_at_registration() -> Result<()> {
        let registry = registry(&["com.foo"]);
        let error = registry
            .match_implementors_of("java.util.List", |_| Ok(()))
            .err();
        assert!(matches!(
            error,
            Some(ref error) if error.has_code("spec", "blacklisted_system_unit")
        ));
        assert_eq!(registry.len()?, 0);
        Ok(())
    }

    #[test]
    fn constant_fields_populate_both_index_views() -> Result<()> {
        let registry = registry(&["com.foo"]);
        registry.match_constant_fields(
            ["com.foo.Config.TIMEOUT", "com.foo.Config.NAME", "com.foo.Other.X"],
            |_, _, _| Ok(()),
        )?;
        let fields = registry.fields_of_interest()?;
        assert_eq!(
            fields.get("com.foo.Config").map(BTreeSet::len),
            Some(2)
        );
        assert!(fields.contains_key("com.foo.Other"));

        let sealed = registry.seal()?;
        assert_eq!(sealed.field_index().callbacks_for("com.foo.Config", "TIMEOUT").len(), 1);
        assert!(sealed.field_index().callbacks_for("com.foo.Config", "MISSING").is_empty());
        assert!(sealed.field_index().callbacks_for("com.foo.Other", "TIMEOUT").is_empty());
        assert_eq!(sealed.field_index().callbacks_for("com.foo.Other", "X").len(), 1);
        Ok(())
    }

    #[test]
    fn constant_field_batch_is_all_or_nothing() -> Result<()> {
        let registry = registry(&["-com.secret"]);
        let result = registry.match_constant_fields(["com.open.A.X", "com.secret.B.Y"], |_, _, _| Ok(()));
        assert!(result.is_err());
        assert!(registry.fields_of_interest()?.is_empty());

        let unqualified = registry.match_constant_fields(["NOFIELD"], |_, _, _| Ok(()));
        assert!(matches!(
            unqualified,
            Err(ref error) if error.code == ErrorCode::invalid_input()
        ));
        Ok(())
    }

    #[test]
    fn query_metadata_is_consistent() {
        let query = UnitQuery::ImplementorsOf("a.Api".to_owned());
        assert_eq!(query.target(), Some("a.Api"));
        assert_eq!(query.expected_target_kind(), Some(UnitKind::Interface));
        assert_eq!(query.label(), "implementors_of");
        assert_eq!(UnitQuery::AllUnits.target(), None);
        assert_eq!(UnitQuery::WithFieldOfType("a.B".to_owned()).expected_target_kind(), None);
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MatcherRegistry<String>>();
    }
}

//! Schema snapshots and the DDL-source contract.
//!
//! The engine never talks to a server. A [`DdlSource`] hands it `SHOW
//! CREATE` output; [`SchemaSnapshot::load`] materializes one immutable,
//! name-ordered snapshot per side, and everything downstream is a pure
//! function of the two snapshots.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Result;
use crate::model::ObjectKind;

/// Supplies DDL text for named schema objects.
///
/// Implementations must follow the server conventions for `SHOW CREATE`
/// output so emitted scripts reproduce the server's own spelling:
///
/// - `tables`, `views`, `sequences`: the second column of
///   `SHOW CREATE TABLE|VIEW|SEQUENCE`.
/// - `procedures`, `functions`, `triggers`: the third column of the
///   corresponding `SHOW CREATE` statement.
/// - `events`: the fourth column of `SHOW CREATE EVENT`.
///
/// `list_objects(Tables)` must exclude view rows, and sources backed by
/// servers without sequence support must report an empty sequence set.
pub trait DdlSource {
    /// Enumerates the objects of one kind.
    fn list_objects(&self, kind: ObjectKind) -> Result<BTreeSet<String>>;

    /// Returns the DDL for one object, or `None` if it does not exist.
    fn get_ddl(&self, kind: ObjectKind, name: &str) -> Result<Option<String>>;
}

/// A named, immutable collection of schema objects with their DDL.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    name: String,
    objects: BTreeMap<ObjectKind, BTreeMap<String, String>>,
}

impl SchemaSnapshot {
    /// Loads every object of every kind from `source`.
    pub fn load(name: impl Into<String>, source: &dyn DdlSource) -> Result<Self> {
        let name = name.into();
        let mut objects = BTreeMap::new();
        for kind in ObjectKind::ALL {
            let mut ddls = BTreeMap::new();
            for object_name in source.list_objects(kind)? {
                if let Some(ddl) = source.get_ddl(kind, &object_name)? {
                    ddls.insert(object_name, ddl);
                }
            }
            debug!(schema = %name, kind = %kind, count = ddls.len(), "loaded objects");
            objects.insert(kind, ddls);
        }
        Ok(Self { name, objects })
    }

    /// Builds a snapshot directly from in-memory objects.
    pub fn from_objects(
        name: impl Into<String>,
        objects: BTreeMap<ObjectKind, BTreeMap<String, String>>,
    ) -> Self {
        Self {
            name: name.into(),
            objects,
        }
    }

    /// The schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object names of one kind, lexicographically ordered.
    pub fn names(&self, kind: ObjectKind) -> BTreeSet<String> {
        self.objects
            .get(&kind)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The DDL of one object, if present.
    pub fn ddl(&self, kind: ObjectKind, name: &str) -> Option<&str> {
        self.objects
            .get(&kind)
            .and_then(|m| m.get(name))
            .map(String::as_str)
    }

    /// Total number of objects across all kinds.
    pub fn object_count(&self) -> usize {
        self.objects.values().map(BTreeMap::len).sum()
    }
}

/// In-memory [`DdlSource`] for tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    objects: BTreeMap<ObjectKind, BTreeMap<String, String>>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one object, replacing any existing DDL under the same name.
    pub fn insert(
        &mut self,
        kind: ObjectKind,
        name: impl Into<String>,
        ddl: impl Into<String>,
    ) -> &mut Self {
        self.objects
            .entry(kind)
            .or_default()
            .insert(name.into(), ddl.into());
        self
    }

    /// Builder-style [`MemorySource::insert`].
    pub fn with(mut self, kind: ObjectKind, name: impl Into<String>, ddl: impl Into<String>) -> Self {
        self.insert(kind, name, ddl);
        self
    }
}

impl DdlSource for MemorySource {
    fn list_objects(&self, kind: ObjectKind) -> Result<BTreeSet<String>> {
        Ok(self
            .objects
            .get(&kind)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn get_ddl(&self, kind: ObjectKind, name: &str) -> Result<Option<String>> {
        Ok(self
            .objects
            .get(&kind)
            .and_then(|m| m.get(name))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snapshot_load_collects_all_kinds() {
        let source = MemorySource::new()
            .with(ObjectKind::Tables, "users", "CREATE TABLE `users` (`id` int)")
            .with(ObjectKind::Tables, "orders", "CREATE TABLE `orders` (`id` int)")
            .with(ObjectKind::Views, "v_users", "CREATE VIEW `v_users` AS SELECT 1");

        let snapshot = SchemaSnapshot::load("app", &source).unwrap();
        assert_eq!(snapshot.name(), "app");
        assert_eq!(snapshot.object_count(), 3);
        assert_eq!(
            snapshot.names(ObjectKind::Tables),
            ["orders".to_string(), "users".to_string()].into()
        );
        assert!(snapshot.ddl(ObjectKind::Views, "v_users").is_some());
        assert!(snapshot.ddl(ObjectKind::Tables, "missing").is_none());
        assert!(snapshot.names(ObjectKind::Sequences).is_empty());
    }

    #[test]
    fn names_are_sorted() {
        let source = MemorySource::new()
            .with(ObjectKind::Tables, "zebra", "CREATE TABLE `zebra` (`id` int)")
            .with(ObjectKind::Tables, "alpha", "CREATE TABLE `alpha` (`id` int)");
        let snapshot = SchemaSnapshot::load("s", &source).unwrap();
        let names: Vec<String> = snapshot.names(ObjectKind::Tables).into_iter().collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }
}

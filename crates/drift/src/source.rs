//! Filesystem-backed DDL source.
//!
//! A schema dump is a directory tree of exported `SHOW CREATE` output:
//!
//! ```text
//! <dump>/
//!   tables/<name>.sql
//!   views/<name>.sql
//!   procedures/<name>.sql
//!   functions/<name>.sql
//!   triggers/<name>.sql
//!   events/<name>.sql
//!   sequences/<name>.sql
//! ```
//!
//! A missing kind directory simply means no objects of that kind (servers
//! without sequence support export no `sequences/` directory).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use drift_core::error::{EngineError, Result};
use drift_core::model::ObjectKind;
use drift_core::snapshot::DdlSource;

/// Reads DDL from a dump directory.
#[derive(Debug, Clone)]
pub struct DumpSource {
    root: PathBuf,
}

impl DumpSource {
    /// Creates a source rooted at `root`. The directory must exist.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(EngineError::Internal(format!(
                "schema dump directory not found: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// The final path component, used as the default schema label.
    pub fn label(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    fn kind_dir(&self, kind: ObjectKind) -> PathBuf {
        self.root.join(kind.as_str())
    }
}

impl DdlSource for DumpSource {
    fn list_objects(&self, kind: ObjectKind) -> Result<BTreeSet<String>> {
        let dir = self.kind_dir(kind);
        if !dir.is_dir() {
            return Ok(BTreeSet::new());
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            EngineError::Internal(format!("cannot read {}: {e}", dir.display()))
        })?;

        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                EngineError::Internal(format!("cannot read {}: {e}", dir.display()))
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.insert(stem.to_string());
            }
        }
        Ok(names)
    }

    fn get_ddl(&self, kind: ObjectKind, name: &str) -> Result<Option<String>> {
        let path = self.kind_dir(kind).join(format!("{name}.sql"));
        if !path.is_file() {
            return Ok(None);
        }
        let ddl = std::fs::read_to_string(&path).map_err(|e| {
            EngineError::Internal(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(Some(ddl.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_dump(root: &Path, kind: &str, name: &str, ddl: &str) {
        let dir = root.join(kind);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{name}.sql")), ddl).unwrap();
    }

    #[test]
    fn lists_sql_files_as_objects() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(dir.path(), "tables", "users", "CREATE TABLE `users` (`id` int)");
        write_dump(dir.path(), "tables", "orders", "CREATE TABLE `orders` (`id` int)");
        std::fs::write(dir.path().join("tables/README.md"), "not sql").unwrap();

        let source = DumpSource::open(dir.path()).unwrap();
        let names = source.list_objects(ObjectKind::Tables).unwrap();
        assert_eq!(
            names,
            ["orders".to_string(), "users".to_string()].into()
        );
    }

    #[test]
    fn missing_kind_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = DumpSource::open(dir.path()).unwrap();
        assert!(source.list_objects(ObjectKind::Sequences).unwrap().is_empty());
    }

    #[test]
    fn reads_and_trims_ddl() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(
            dir.path(),
            "views",
            "v",
            "CREATE VIEW `v` AS SELECT 1\n",
        );
        let source = DumpSource::open(dir.path()).unwrap();
        assert_eq!(
            source.get_ddl(ObjectKind::Views, "v").unwrap().as_deref(),
            Some("CREATE VIEW `v` AS SELECT 1")
        );
        assert_eq!(source.get_ddl(ObjectKind::Views, "missing").unwrap(), None);
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(DumpSource::open("/definitely/not/here").is_err());
    }

    #[test]
    fn label_is_the_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("app_prod");
        std::fs::create_dir_all(&dump).unwrap();
        let source = DumpSource::open(&dump).unwrap();
        assert_eq!(source.label(), "app_prod");
    }
}

//! Schema-versioned SQLite package index.
//!
//! A [`PackageIndex`] owns one connection and the [`SchemaInterface`]
//! implementation bound to the version recorded in the file. Every mutation
//! is a single transaction: it either applies completely or not at all.

mod error;
pub mod registry;
pub mod schema;
pub mod search;
pub mod tables;
mod version;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pkgdex_schema::{Manifest, PackageDependency};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

pub use error::{IndexError, Result};
pub use registry::SchemaRegistry;
pub use schema::{IndexedInstaller, ManifestProperty, SchemaInterface, VersionKey, manifest_hash};
pub use search::{
    MatchType, PackageMatchField, PackageMatchFilter, RequestMatch, SearchMatch, SearchRequest,
    SearchResult,
};
pub use tables::RowId;
pub use version::SchemaVersion;

const MAJOR_VERSION: &str = "majorVersion";
const MINOR_VERSION: &str = "minorVersion";
const LAST_WRITE_TIME: &str = "lastWriteTime";
const PACKAGED: &str = "packaged";

/// How to open an index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDisposition {
    /// Existing file, no mutation. Newer minors of a known major are
    /// read through the latest implementation.
    ReadOnly,
    /// Existing file, mutable.
    ReadWrite,
    /// Open read-write, creating a default-version index if missing.
    Create,
}

pub struct PackageIndex {
    conn: Connection,
    schema: Box<dyn SchemaInterface>,
    /// Version recorded in the file; newer than `schema` for clamped
    /// read-only opens.
    on_disk: SchemaVersion,
    read_only: bool,
    packaged: bool,
    path: PathBuf,
}

impl std::fmt::Debug for PackageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageIndex")
            .field("path", &self.path)
            .field("on_disk", &self.on_disk)
            .field("schema", &self.schema.version())
            .field("read_only", &self.read_only)
            .field("packaged", &self.packaged)
            .finish()
    }
}

impl PackageIndex {
    /// Create a new index file at `path` with the requested schema.
    ///
    /// The recorded version is the one the registry resolves `version` to.
    pub fn create_new(
        path: &Path,
        version: SchemaVersion,
        registry: &SchemaRegistry,
    ) -> Result<Self> {
        if path.exists() {
            return Err(IndexError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let schema = registry.create(version)?;
        let actual = schema.version();
        let mut conn = Connection::open(path)?;

        let tx = conn.transaction()?;
        tx.execute_batch(
            "CREATE TABLE metadata (name TEXT PRIMARY KEY, value TEXT NOT NULL);",
        )?;
        set_metadata(&tx, MAJOR_VERSION, &actual.major.to_string())?;
        set_metadata(&tx, MINOR_VERSION, &actual.minor.to_string())?;
        set_metadata(&tx, PACKAGED, "0")?;
        schema.create_tables(&tx)?;
        set_metadata(&tx, LAST_WRITE_TIME, &Utc::now().to_rfc3339())?;
        tx.commit()?;

        info!(path = %path.display(), version = %actual, "Created index");

        Ok(Self {
            conn,
            schema,
            on_disk: actual,
            read_only: false,
            packaged: false,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing index, binding the implementation for its recorded
    /// schema version.
    pub fn open(
        path: &Path,
        disposition: OpenDisposition,
        registry: &SchemaRegistry,
    ) -> Result<Self> {
        if !path.exists() {
            return match disposition {
                OpenDisposition::Create => Self::create_new(path, SchemaVersion::DEFAULT, registry),
                _ => Err(IndexError::NotFound(path.to_path_buf())),
            };
        }

        let read_only = disposition == OpenDisposition::ReadOnly;
        let conn = if read_only {
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            Connection::open(path)?
        };

        let on_disk = read_version(&conn)?;
        let schema = registry.create(on_disk)?;
        if !read_only && schema.version() != on_disk {
            return Err(if on_disk > schema.version() {
                IndexError::NewerSchemaNotWritable {
                    found: on_disk,
                    latest: schema.version(),
                }
            } else {
                IndexError::SchemaNotSupported(on_disk)
            });
        }
        let packaged = get_metadata(&conn, PACKAGED)?.as_deref() == Some("1");

        debug!(
            path = %path.display(),
            on_disk = %on_disk,
            schema = %schema.version(),
            read_only,
            packaged,
            "Opened index"
        );

        Ok(Self {
            conn,
            schema,
            on_disk,
            read_only,
            packaged,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version recorded in the file.
    pub fn schema_version(&self) -> SchemaVersion {
        self.on_disk
    }

    /// Implementation bound at open time.
    pub fn schema(&self) -> &dyn SchemaInterface {
        self.schema.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_packaged(&self) -> bool {
        self.packaged
    }

    pub fn last_write_time(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = get_metadata(&self.conn, LAST_WRITE_TIME)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| IndexError::InvalidVersionRecord(format!("{LAST_WRITE_TIME}={raw}")))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(IndexError::ReadOnly);
        }
        if self.packaged {
            return Err(IndexError::Packaged);
        }
        Ok(())
    }

    /// Run `op` in one transaction and stamp the write time.
    fn write<T>(
        &mut self,
        op: impl FnOnce(&dyn SchemaInterface, &Connection) -> Result<T>,
    ) -> Result<T> {
        self.ensure_writable()?;
        let tx = self.conn.transaction()?;
        let value = op(self.schema.as_ref(), &tx)?;
        set_metadata(&tx, LAST_WRITE_TIME, &Utc::now().to_rfc3339())?;
        tx.commit()?;
        Ok(value)
    }

    /// Report operations missing from the bound implementation against the
    /// outermost version rather than the base that refused them.
    fn at_schema<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| match e {
            IndexError::NotSupportedBySchema { operation, .. } => IndexError::NotSupportedBySchema {
                operation,
                version: self.schema.version(),
            },
            other => other,
        })
    }

    /// Add a manifest. An already indexed (id, version, channel) is
    /// rejected with [`IndexError::ManifestAlreadyExists`].
    pub fn add_manifest(
        &mut self,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<RowId> {
        self.write(|schema, conn| schema.add_manifest(conn, manifest, relative_path))
    }

    /// Replace the indexed copy of a manifest. Returns false when the
    /// content and path are unchanged.
    pub fn update_manifest(
        &mut self,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<bool> {
        self.write(|schema, conn| schema.update_manifest(conn, manifest, relative_path))
    }

    pub fn remove_manifest(&mut self, id: &str, version: &str, channel: &str) -> Result<()> {
        self.write(|schema, conn| schema.remove_manifest(conn, id, version, channel))
            .map(|_| ())
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        self.schema.search(&self.conn, request)
    }

    pub fn get_property(
        &self,
        manifest: RowId,
        property: ManifestProperty,
    ) -> Result<Option<String>> {
        self.schema.get_property(&self.conn, manifest, property)
    }

    pub fn get_multi_property(
        &self,
        manifest: RowId,
        field: PackageMatchField,
    ) -> Result<Vec<String>> {
        self.schema.get_multi_property(&self.conn, manifest, field)
    }

    pub fn get_versions(&self, id: &str) -> Result<Vec<VersionKey>> {
        self.schema.get_versions(&self.conn, id)
    }

    pub fn get_manifest_id_by_version(
        &self,
        id: &str,
        version: &str,
        channel: &str,
    ) -> Result<Option<RowId>> {
        self.schema.find_manifest(&self.conn, id, version, channel)
    }

    /// Installer rows of a manifest; schema 1.7 and later.
    pub fn installers_for(&self, manifest: RowId) -> Result<Vec<IndexedInstaller>> {
        self.at_schema(self.schema.get_installers(&self.conn, manifest))
    }

    /// Dependencies of a manifest; schema 1.4 and later.
    pub fn dependencies_for(&self, manifest: RowId) -> Result<Vec<PackageDependency>> {
        self.at_schema(self.schema.get_dependencies(&self.conn, manifest))
    }

    /// Walk every relationship the schema defines. With `log` set each
    /// violation is reported as a warning; the walk never stops early.
    pub fn check_consistency(&self, log: bool) -> Result<bool> {
        let ok = self.schema.check_consistency(&self.conn, log)?;
        if ok {
            debug!(path = %self.path.display(), "Index is consistent");
        }
        Ok(ok)
    }

    /// Strip build-only data and mark the index packaged. Irreversible; the
    /// index refuses mutation afterwards.
    pub fn prepare_for_packaging(&mut self, vacuum: bool) -> Result<()> {
        self.write(|schema, conn| {
            schema.prepare_for_packaging(conn)?;
            set_metadata(conn, PACKAGED, "1")
        })?;
        self.packaged = true;

        if vacuum {
            self.conn.execute_batch("VACUUM;")?;
        }
        info!(path = %self.path.display(), vacuum, "Prepared index for packaging");
        Ok(())
    }

    /// Upgrade the file to a newer minor of the same major, creating each
    /// intermediate version's delta in turn.
    pub fn migrate_to(&mut self, target: SchemaVersion, registry: &SchemaRegistry) -> Result<()> {
        self.ensure_writable()?;
        let from = self.on_disk;
        if target == from {
            return Ok(());
        }
        if target.major != from.major || target < from {
            return Err(IndexError::MigrationNotSupported { from, to: target });
        }

        let schema = registry.create(target)?;
        if schema.version() != target {
            return Err(IndexError::SchemaNotSupported(target));
        }

        let tx = self.conn.transaction()?;
        {
            let mut steps: Vec<&dyn SchemaInterface> = schema::schema_chain(schema.as_ref())
                .into_iter()
                .filter(|s| s.version() > from)
                .collect();
            steps.reverse();
            for step in steps {
                debug!(version = %step.version(), "Applying schema delta");
                step.create_delta(&tx)?;
                step.backfill(&tx)?;
            }
        }
        set_metadata(&tx, MAJOR_VERSION, &target.major.to_string())?;
        set_metadata(&tx, MINOR_VERSION, &target.minor.to_string())?;
        set_metadata(&tx, LAST_WRITE_TIME, &Utc::now().to_rfc3339())?;
        tx.commit()?;

        info!(from = %from, to = %target, "Migrated index");
        self.schema = schema;
        self.on_disk = target;
        Ok(())
    }
}

fn get_metadata(conn: &Connection, name: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM metadata WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn set_metadata(conn: &Connection, name: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (name, value) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value",
        params![name, value],
    )?;
    Ok(())
}

fn read_version(conn: &Connection) -> Result<SchemaVersion> {
    let parse = |name: &str| -> Result<u32> {
        let raw = get_metadata(conn, name)
            .map_err(|_| IndexError::MissingVersionRecord)?
            .ok_or(IndexError::MissingVersionRecord)?;
        raw.trim()
            .parse()
            .map_err(|_| IndexError::InvalidVersionRecord(format!("{name}={raw}")))
    };
    Ok(SchemaVersion::new(parse(MAJOR_VERSION)?, parse(MINOR_VERSION)?))
}

#[cfg(test)]
mod tests;

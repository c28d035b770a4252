//! Schema 1.4: package dependencies.

use pkgdex_schema::{Manifest, PackageDependency};
use rusqlite::{Connection, params};

use super::v1_0::MANIFEST;
use super::{SchemaInterface, V1_3};
use crate::index::error::Result;
use crate::index::tables::{Column, RowId, StringTable, check_owned};
use crate::index::version::SchemaVersion;

const DEPENDENCIES: &str = "dependencies";

#[derive(Debug, Default)]
pub struct V1_4 {
    base: V1_3,
}

impl V1_4 {
    pub fn new() -> Self {
        Self { base: V1_3::new() }
    }

    fn strings(&self, name: &str) -> Option<StringTable> {
        self.string_tables().into_iter().find(|t| t.name == name)
    }
}

impl SchemaInterface for V1_4 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1, 4)
    }

    fn base(&self) -> Option<&dyn SchemaInterface> {
        Some(&self.base)
    }

    fn create_delta(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE dependencies (
                manifest INTEGER NOT NULL,
                package_id INTEGER NOT NULL,
                min_version INTEGER,
                PRIMARY KEY(manifest, package_id)
            ) WITHOUT ROWID;
            CREATE INDEX dependencies_package_id_index ON dependencies(package_id);",
        )?;
        Ok(())
    }

    /// Dependencies intern their package ids and minimum versions in the
    /// same tables manifests use.
    fn string_tables(&self) -> Vec<StringTable> {
        let mut tables = self.base.string_tables();
        for table in &mut tables {
            match table.name {
                "ids" => table
                    .referenced_by
                    .push(Column::new(DEPENDENCIES, "package_id")),
                "versions" => table
                    .referenced_by
                    .push(Column::new(DEPENDENCIES, "min_version")),
                _ => {}
            }
        }
        tables
    }

    fn insert_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<RowId> {
        let rowid = self.base.insert_manifest(conn, manifest, relative_path)?;
        let (Some(ids), Some(versions)) = (self.strings("ids"), self.strings("versions")) else {
            return Ok(rowid);
        };

        for dependency in &manifest.dependencies.package_dependencies {
            let package_id = ids.ensure_exists(conn, &dependency.package_identifier)?;
            let min_version = dependency
                .minimum_version
                .as_deref()
                .map(|v| versions.ensure_exists(conn, v))
                .transpose()?;
            conn.execute(
                "INSERT OR REPLACE INTO dependencies (manifest, package_id, min_version)
                 VALUES (?1, ?2, ?3)",
                params![rowid, package_id, min_version],
            )?;
        }
        Ok(rowid)
    }

    fn delete_manifest_row(&self, conn: &Connection, manifest: RowId) -> Result<()> {
        conn.execute(
            "DELETE FROM dependencies WHERE manifest = ?1",
            params![manifest],
        )?;
        self.base.delete_manifest_row(conn, manifest)
    }

    fn get_dependencies(
        &self,
        conn: &Connection,
        manifest: RowId,
    ) -> Result<Vec<PackageDependency>> {
        let mut stmt = conn.prepare(
            "SELECT i.id, v.version FROM dependencies d
             JOIN ids i ON i.rowid = d.package_id
             LEFT JOIN versions v ON v.rowid = d.min_version
             WHERE d.manifest = ?1
             ORDER BY i.id",
        )?;
        let rows = stmt.query_map(params![manifest], |row| {
            Ok(PackageDependency {
                package_identifier: row.get(0)?,
                minimum_version: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn check_specific(&self, conn: &Connection, log: bool) -> Result<bool> {
        let mut ok = self.base.check_specific(conn, log)?;
        ok &= check_owned(conn, DEPENDENCIES, "manifest", MANIFEST, log)?;
        Ok(ok)
    }
}

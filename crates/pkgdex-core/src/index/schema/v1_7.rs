//! Schema 1.7: one row per installer.

use pkgdex_schema::Manifest;
use rusqlite::{Connection, params};

use super::v1_0::MANIFEST;
use super::{IndexedInstaller, SchemaInterface, V1_6};
use crate::index::error::Result;
use crate::index::tables::{RowId, check_owned};
use crate::index::version::SchemaVersion;

#[derive(Debug, Default)]
pub struct V1_7 {
    base: V1_6,
}

impl V1_7 {
    pub fn new() -> Self {
        Self { base: V1_6::new() }
    }
}

impl SchemaInterface for V1_7 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1, 7)
    }

    fn base(&self) -> Option<&dyn SchemaInterface> {
        Some(&self.base)
    }

    fn create_delta(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE installers (
                manifest INTEGER NOT NULL,
                architecture TEXT NOT NULL,
                installer_type TEXT NOT NULL,
                scope TEXT NOT NULL,
                locale TEXT NOT NULL
            );
            CREATE INDEX installers_manifest_index ON installers(manifest);",
        )?;
        Ok(())
    }

    fn insert_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<RowId> {
        let rowid = self.base.insert_manifest(conn, manifest, relative_path)?;
        let mut stmt = conn.prepare(
            "INSERT INTO installers (manifest, architecture, installer_type, scope, locale)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for installer in &manifest.installers {
            stmt.execute(params![
                rowid,
                installer.architecture.as_str(),
                installer.installer_type.as_str(),
                installer.scope.as_str(),
                installer.locale,
            ])?;
        }
        Ok(rowid)
    }

    fn delete_manifest_row(&self, conn: &Connection, manifest: RowId) -> Result<()> {
        conn.execute("DELETE FROM installers WHERE manifest = ?1", params![manifest])?;
        self.base.delete_manifest_row(conn, manifest)
    }

    fn get_installers(&self, conn: &Connection, manifest: RowId) -> Result<Vec<IndexedInstaller>> {
        let mut stmt = conn.prepare(
            "SELECT architecture, installer_type, scope, locale FROM installers
             WHERE manifest = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![manifest], |row| {
            Ok(IndexedInstaller {
                architecture: row.get(0)?,
                installer_type: row.get(1)?,
                scope: row.get(2)?,
                locale: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn check_specific(&self, conn: &Connection, log: bool) -> Result<bool> {
        let mut ok = self.base.check_specific(conn, log)?;
        ok &= check_owned(conn, "installers", "manifest", MANIFEST, log)?;
        Ok(ok)
    }
}

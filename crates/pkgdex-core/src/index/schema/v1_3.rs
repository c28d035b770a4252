//! Schema 1.3: manifest content hash.

use pkgdex_schema::Manifest;
use rusqlite::{Connection, OptionalExtension, params};

use super::{ManifestProperty, SchemaInterface, V1_2, manifest_hash};
use crate::index::error::Result;
use crate::index::tables::RowId;
use crate::index::version::SchemaVersion;

#[derive(Debug, Default)]
pub struct V1_3 {
    base: V1_2,
}

impl V1_3 {
    pub fn new() -> Self {
        Self { base: V1_2::new() }
    }
}

impl SchemaInterface for V1_3 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1, 3)
    }

    fn base(&self) -> Option<&dyn SchemaInterface> {
        Some(&self.base)
    }

    // Manifests indexed before 1.3 keep a NULL hash; updating them always
    // rewrites the row.
    fn create_delta(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch("ALTER TABLE manifest ADD COLUMN hash TEXT;")?;
        Ok(())
    }

    fn insert_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<RowId> {
        let rowid = self.base.insert_manifest(conn, manifest, relative_path)?;
        conn.execute(
            "UPDATE manifest SET hash = ?1 WHERE rowid = ?2",
            params![manifest_hash(manifest)?, rowid],
        )?;
        Ok(rowid)
    }

    fn get_property(
        &self,
        conn: &Connection,
        manifest: RowId,
        property: ManifestProperty,
    ) -> Result<Option<String>> {
        if property != ManifestProperty::ManifestHash {
            return self.base.get_property(conn, manifest, property);
        }
        let hash = conn
            .query_row(
                "SELECT hash FROM manifest WHERE rowid = ?1",
                params![manifest],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
        Ok(hash)
    }
}

//! Schema 1.1: package family names, product codes and build metadata.

use pkgdex_schema::Manifest;
use rusqlite::{Connection, OptionalExtension, params};

use super::v1_0::MANIFEST;
use super::{ManifestProperty, SchemaInterface, V1_0, extract};
use crate::index::error::Result;
use crate::index::search::PackageMatchField;
use crate::index::tables::{MapTable, RowId, check_owned};
use crate::index::version::SchemaVersion;

const PACKAGE_FAMILY_NAMES: MapTable = MapTable {
    field: PackageMatchField::PackageFamilyName,
    value_table: "pfns",
    value_column: "pfn",
    map_table: "pfns_map",
    owner_table: MANIFEST,
    owner_column: "manifest",
    extract: extract::package_family_names,
};

const PRODUCT_CODES: MapTable = MapTable {
    field: PackageMatchField::ProductCode,
    value_table: "productcodes",
    value_column: "productcode",
    map_table: "productcodes_map",
    owner_table: MANIFEST,
    owner_column: "manifest",
    extract: extract::product_codes,
};

#[derive(Debug, Default)]
pub struct V1_1 {
    base: V1_0,
}

impl V1_1 {
    pub fn new() -> Self {
        Self { base: V1_0::new() }
    }
}

impl SchemaInterface for V1_1 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1, 1)
    }

    fn base(&self) -> Option<&dyn SchemaInterface> {
        Some(&self.base)
    }

    fn create_delta(&self, conn: &Connection) -> Result<()> {
        PACKAGE_FAMILY_NAMES.create(conn)?;
        PRODUCT_CODES.create(conn)?;
        conn.execute_batch(
            "CREATE TABLE manifest_metadata (
                manifest INTEGER PRIMARY KEY,
                indexed_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn map_tables(&self) -> Vec<MapTable> {
        let mut maps = self.base.map_tables();
        maps.extend([PACKAGE_FAMILY_NAMES, PRODUCT_CODES]);
        maps
    }

    fn insert_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<RowId> {
        let rowid = self.base.insert_manifest(conn, manifest, relative_path)?;
        conn.execute(
            "INSERT INTO manifest_metadata (manifest, indexed_at) VALUES (?1, ?2)",
            params![rowid, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(rowid)
    }

    fn delete_manifest_row(&self, conn: &Connection, manifest: RowId) -> Result<()> {
        conn.execute(
            "DELETE FROM manifest_metadata WHERE manifest = ?1",
            params![manifest],
        )?;
        self.base.delete_manifest_row(conn, manifest)
    }

    fn get_property(
        &self,
        conn: &Connection,
        manifest: RowId,
        property: ManifestProperty,
    ) -> Result<Option<String>> {
        if property != ManifestProperty::IndexedAt {
            return self.base.get_property(conn, manifest, property);
        }
        let value = conn
            .query_row(
                "SELECT indexed_at FROM manifest_metadata WHERE manifest = ?1",
                params![manifest],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn check_specific(&self, conn: &Connection, log: bool) -> Result<bool> {
        let mut ok = self.base.check_specific(conn, log)?;
        ok &= check_owned(conn, "manifest_metadata", "manifest", MANIFEST, log)?;
        Ok(ok)
    }

    fn prepare_for_packaging(&self, conn: &Connection) -> Result<()> {
        self.base.prepare_for_packaging(conn)?;
        conn.execute("DELETE FROM manifest_metadata", [])?;
        Ok(())
    }
}

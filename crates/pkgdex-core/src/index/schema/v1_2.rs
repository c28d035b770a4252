//! Schema 1.2: normalized names and publishers for correlation.

use pkgdex_schema::Manifest;
use rusqlite::Connection;
use tracing::debug;

use super::v1_0::MANIFEST;
use super::{SchemaInterface, V1_1, extract};
use crate::index::error::Result;
use crate::index::search::PackageMatchField;
use crate::index::tables::{MapTable, RowId};
use crate::index::version::SchemaVersion;

const NORMALIZED_NAMES: MapTable = MapTable {
    field: PackageMatchField::NormalizedName,
    value_table: "norm_names",
    value_column: "norm_name",
    map_table: "norm_names_map",
    owner_table: MANIFEST,
    owner_column: "manifest",
    extract: extract::normalized_names,
};

const NORMALIZED_PUBLISHERS: MapTable = MapTable {
    field: PackageMatchField::NormalizedPublisher,
    value_table: "norm_publishers",
    value_column: "norm_publisher",
    map_table: "norm_publishers_map",
    owner_table: MANIFEST,
    owner_column: "manifest",
    extract: extract::normalized_publishers,
};

#[derive(Debug, Default)]
pub struct V1_2 {
    base: V1_1,
}

impl V1_2 {
    pub fn new() -> Self {
        Self { base: V1_1::new() }
    }
}

impl SchemaInterface for V1_2 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1, 2)
    }

    fn base(&self) -> Option<&dyn SchemaInterface> {
        Some(&self.base)
    }

    fn create_delta(&self, conn: &Connection) -> Result<()> {
        NORMALIZED_NAMES.create(conn)?;
        NORMALIZED_PUBLISHERS.create(conn)?;
        Ok(())
    }

    /// Names and publishers are still interned, so existing rows can be
    /// normalized in place.
    fn backfill(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT m.rowid, n.name, p.publisher FROM manifest m
             JOIN names n ON n.rowid = m.name
             JOIN publishers p ON p.rowid = m.publisher",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, RowId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut count = 0usize;
        for row in rows {
            let (rowid, package_name, publisher) = row?;
            let manifest = Manifest {
                package_name,
                publisher,
                ..Manifest::default()
            };
            NORMALIZED_NAMES.insert(conn, rowid, &manifest)?;
            NORMALIZED_PUBLISHERS.insert(conn, rowid, &manifest)?;
            count += 1;
        }
        debug!(count, "Backfilled normalized names");
        Ok(())
    }

    fn map_tables(&self) -> Vec<MapTable> {
        let mut maps = self.base.map_tables();
        maps.extend([NORMALIZED_NAMES, NORMALIZED_PUBLISHERS]);
        maps
    }
}

//! Schema 1.6: upgrade codes.

use rusqlite::Connection;

use super::v1_0::MANIFEST;
use super::{SchemaInterface, V1_5, extract};
use crate::index::error::Result;
use crate::index::search::PackageMatchField;
use crate::index::tables::MapTable;
use crate::index::version::SchemaVersion;

const UPGRADE_CODES: MapTable = MapTable {
    field: PackageMatchField::UpgradeCode,
    value_table: "upgradecodes",
    value_column: "upgradecode",
    map_table: "upgradecodes_map",
    owner_table: MANIFEST,
    owner_column: "manifest",
    extract: extract::upgrade_codes,
};

#[derive(Debug, Default)]
pub struct V1_6 {
    base: V1_5,
}

impl V1_6 {
    pub fn new() -> Self {
        Self { base: V1_5::new() }
    }
}

impl SchemaInterface for V1_6 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1, 6)
    }

    fn base(&self) -> Option<&dyn SchemaInterface> {
        Some(&self.base)
    }

    fn create_delta(&self, conn: &Connection) -> Result<()> {
        UPGRADE_CODES.create(conn)
    }

    fn map_tables(&self) -> Vec<MapTable> {
        let mut maps = self.base.map_tables();
        maps.push(UPGRADE_CODES);
        maps
    }
}

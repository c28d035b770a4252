//! Schema 2.0: transport-optimized layout.
//!
//! One row per package with inline strings, one row per version, and map
//! tables keyed by version. There is no path tree; manifests are located
//! by id and version instead.

use pkgdex_schema::{Manifest, Version};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};

use super::v1_0::sort_newest_first;
use super::v1_5::arp_range;
use super::{ManifestProperty, SchemaInterface, VersionKey, extract, manifest_hash};
use crate::index::error::Result;
use crate::index::search::PackageMatchField;
use crate::index::tables::{ArpRange, MapTable, RowId, check_arp_ranges, check_owned};
use crate::index::version::SchemaVersion;

const VERSIONS: &str = "versions";

const fn version_map(
    field: PackageMatchField,
    value_table: &'static str,
    value_column: &'static str,
    map_table: &'static str,
    extract: fn(&Manifest) -> Vec<String>,
) -> MapTable {
    MapTable {
        field,
        value_table,
        value_column,
        map_table,
        owner_table: VERSIONS,
        owner_column: "version",
        extract,
    }
}

const MAPS: [MapTable; 7] = [
    version_map(PackageMatchField::Tag, "tags", "tag", "tags_map", extract::tags),
    version_map(
        PackageMatchField::Command,
        "commands",
        "command",
        "commands_map",
        extract::commands,
    ),
    version_map(
        PackageMatchField::PackageFamilyName,
        "pfns",
        "pfn",
        "pfns_map",
        extract::package_family_names,
    ),
    version_map(
        PackageMatchField::ProductCode,
        "productcodes",
        "productcode",
        "productcodes_map",
        extract::product_codes,
    ),
    version_map(
        PackageMatchField::UpgradeCode,
        "upgradecodes",
        "upgradecode",
        "upgradecodes_map",
        extract::upgrade_codes,
    ),
    version_map(
        PackageMatchField::NormalizedName,
        "norm_names",
        "norm_name",
        "norm_names_map",
        extract::normalized_names,
    ),
    version_map(
        PackageMatchField::NormalizedPublisher,
        "norm_publishers",
        "norm_publisher",
        "norm_publishers_map",
        extract::normalized_publishers,
    ),
];

#[derive(Debug, Default)]
pub struct V2_0;

impl V2_0 {
    pub fn new() -> Self {
        Self
    }

    fn ensure_package(conn: &Connection, manifest: &Manifest) -> Result<RowId> {
        conn.execute(
            "INSERT INTO packages (id, name, moniker, latest_version) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO NOTHING",
            params![
                manifest.id,
                manifest.package_name,
                manifest.moniker,
                manifest.version
            ],
        )?;
        let rowid = conn.query_row(
            "SELECT rowid FROM packages WHERE id = ?1",
            params![manifest.id],
            |row| row.get(0),
        )?;
        Ok(rowid)
    }

    /// Point the package at its newest remaining version, or delete it
    /// when none remain.
    fn refresh_package(conn: &Connection, package: RowId) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT version, name, moniker FROM versions WHERE package = ?1",
        )?;
        let latest = stmt
            .query_map(params![package], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .max_by(|a, b| Version::parse(&a.0).cmp(&Version::parse(&b.0)));

        match latest {
            Some((version, name, moniker)) => {
                conn.execute(
                    "UPDATE packages SET latest_version = ?1, name = ?2, moniker = ?3
                     WHERE rowid = ?4",
                    params![version, name, moniker, package],
                )?;
            }
            None => {
                conn.execute("DELETE FROM packages WHERE rowid = ?1", params![package])?;
                debug!(package, "Removed package with no versions");
            }
        }
        Ok(())
    }
}

impl SchemaInterface for V2_0 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(2, 0)
    }

    fn create_delta(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE packages (
                rowid INTEGER PRIMARY KEY,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                moniker TEXT NOT NULL,
                latest_version TEXT NOT NULL
            );
            CREATE UNIQUE INDEX packages_id_index ON packages(id);

            CREATE TABLE versions (
                rowid INTEGER PRIMARY KEY,
                package INTEGER NOT NULL,
                version TEXT NOT NULL,
                channel TEXT NOT NULL,
                publisher TEXT NOT NULL,
                hash TEXT NOT NULL,
                arp_min_version TEXT,
                arp_max_version TEXT,
                name TEXT NOT NULL,
                moniker TEXT NOT NULL
            );
            CREATE UNIQUE INDEX versions_package_version_channel_index
                ON versions(package, version, channel);
            ",
        )?;
        for map in MAPS {
            map.create(conn)?;
        }
        Ok(())
    }

    fn map_tables(&self) -> Vec<MapTable> {
        MAPS.to_vec()
    }

    fn manifest_table(&self) -> Option<&'static str> {
        Some(VERSIONS)
    }

    fn insert_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        _relative_path: Option<&str>,
    ) -> Result<RowId> {
        let package = Self::ensure_package(conn, manifest)?;
        let (arp_min, arp_max) = arp_range(manifest).unzip();

        conn.execute(
            "INSERT INTO versions
                (package, version, channel, publisher, hash,
                 arp_min_version, arp_max_version, name, moniker)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                package,
                manifest.version,
                manifest.channel,
                manifest.publisher,
                manifest_hash(manifest)?,
                arp_min,
                arp_max,
                manifest.package_name,
                manifest.moniker,
            ],
        )?;
        let rowid = conn.last_insert_rowid();
        Self::refresh_package(conn, package)?;
        Ok(rowid)
    }

    fn delete_manifest_row(&self, conn: &Connection, manifest: RowId) -> Result<()> {
        let package: Option<RowId> = conn
            .query_row(
                "SELECT package FROM versions WHERE rowid = ?1",
                params![manifest],
                |row| row.get(0),
            )
            .optional()?;
        conn.execute("DELETE FROM versions WHERE rowid = ?1", params![manifest])?;
        if let Some(package) = package {
            Self::refresh_package(conn, package)?;
        }
        Ok(())
    }

    fn find_manifest(
        &self,
        conn: &Connection,
        id: &str,
        version: &str,
        channel: &str,
    ) -> Result<Option<RowId>> {
        let rowid = conn
            .query_row(
                "SELECT v.rowid FROM versions v JOIN packages p ON p.rowid = v.package
                 WHERE p.id = ?1 AND v.version = ?2 AND v.channel = ?3",
                params![id, version, channel],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rowid)
    }

    fn column_sql(&self, field: PackageMatchField) -> Option<String> {
        let column = match field {
            PackageMatchField::Id => "id",
            PackageMatchField::Name => "name",
            PackageMatchField::Moniker => "moniker",
            _ => return None,
        };
        Some(format!(
            "SELECT v.rowid FROM versions v JOIN packages p ON p.rowid = v.package WHERE p.{column}"
        ))
    }

    fn package_of(&self, conn: &Connection, manifest: RowId) -> Result<Option<(RowId, String)>> {
        let package = conn
            .query_row(
                "SELECT p.rowid, p.id FROM versions v JOIN packages p ON p.rowid = v.package
                 WHERE v.rowid = ?1",
                params![manifest],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(package)
    }

    fn get_property(
        &self,
        conn: &Connection,
        manifest: RowId,
        property: ManifestProperty,
    ) -> Result<Option<String>> {
        let column = match property {
            ManifestProperty::Id => "p.id",
            ManifestProperty::Name => "p.name",
            ManifestProperty::Moniker => "p.moniker",
            ManifestProperty::Publisher => "v.publisher",
            ManifestProperty::Version => "v.version",
            ManifestProperty::Channel => "v.channel",
            ManifestProperty::ManifestHash => "v.hash",
            ManifestProperty::ArpMinVersion => "v.arp_min_version",
            ManifestProperty::ArpMaxVersion => "v.arp_max_version",
            ManifestProperty::RelativePath | ManifestProperty::IndexedAt => return Ok(None),
        };
        let value = conn
            .query_row(
                &format!(
                    "SELECT {column} FROM versions v JOIN packages p ON p.rowid = v.package
                     WHERE v.rowid = ?1"
                ),
                params![manifest],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
        Ok(value)
    }

    fn get_versions(&self, conn: &Connection, id: &str) -> Result<Vec<VersionKey>> {
        let mut stmt = conn.prepare(
            "SELECT v.rowid, v.version, v.channel FROM versions v
             JOIN packages p ON p.rowid = v.package
             WHERE p.id = ?1",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(VersionKey {
                manifest: row.get(0)?,
                version: row.get(1)?,
                channel: row.get(2)?,
            })
        })?;
        let mut versions = rows.collect::<Result<Vec<_>, _>>()?;
        sort_newest_first(&mut versions);
        Ok(versions)
    }

    fn check_specific(&self, conn: &Connection, log: bool) -> Result<bool> {
        let mut ok = check_owned(conn, VERSIONS, "package", "packages", log)?;

        let empty: i64 = conn.query_row(
            "SELECT COUNT(*) FROM packages WHERE rowid NOT IN (SELECT package FROM versions)",
            [],
            |row| row.get(0),
        )?;
        if empty > 0 {
            ok = false;
            if log {
                warn!(count = empty, "Packages without versions");
            }
        }

        let mut stmt = conn.prepare(
            "SELECT p.id, v.channel, v.version, v.arp_min_version, v.arp_max_version
             FROM versions v JOIN packages p ON p.rowid = v.package
             WHERE v.arp_min_version IS NOT NULL AND v.arp_max_version IS NOT NULL",
        )?;
        let ranges = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let channel: String = row.get(1)?;
                Ok(ArpRange {
                    package: format!("{id}|{channel}"),
                    version: row.get(2)?,
                    min: row.get(3)?,
                    max: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        ok &= check_arp_ranges(ranges, log);

        Ok(ok)
    }

    /// Per-version display strings only feed `packages`; the shipped index
    /// reads them from there.
    fn prepare_for_packaging(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "ALTER TABLE versions DROP COLUMN name;
             ALTER TABLE versions DROP COLUMN moniker;",
        )?;
        Ok(())
    }
}

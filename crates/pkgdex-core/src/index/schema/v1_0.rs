//! Schema 1.0: interned strings, the manifest table and the path tree.

use pkgdex_schema::{Manifest, Version};
use rusqlite::{Connection, OptionalExtension, params};

use super::{ManifestProperty, SchemaInterface, VersionKey, extract};
use crate::index::error::Result;
use crate::index::search::PackageMatchField;
use crate::index::tables::{Column, MapTable, RowId, StringTable, check_owned};
use crate::index::version::SchemaVersion;

pub(super) const MANIFEST: &str = "manifest";

const TAGS: MapTable = MapTable {
    field: PackageMatchField::Tag,
    value_table: "tags",
    value_column: "tag",
    map_table: "tags_map",
    owner_table: MANIFEST,
    owner_column: "manifest",
    extract: extract::tags,
};

const COMMANDS: MapTable = MapTable {
    field: PackageMatchField::Command,
    value_table: "commands",
    value_column: "command",
    map_table: "commands_map",
    owner_table: MANIFEST,
    owner_column: "manifest",
    extract: extract::commands,
};

/// (string table, column of `manifest` referencing it)
const STRING_COLUMNS: [(&str, &str); 6] = [
    ("ids", "id"),
    ("names", "name"),
    ("monikers", "moniker"),
    ("publishers", "publisher"),
    ("versions", "version"),
    ("channels", "channel"),
];

fn strings(table: &'static str, column: &'static str) -> StringTable {
    StringTable::new(table, column, vec![Column::new(MANIFEST, column)])
}

#[derive(Debug, Default)]
pub struct V1_0;

impl V1_0 {
    pub fn new() -> Self {
        Self
    }

    /// Rowid of the leaf path part for `path`, creating the chain as needed.
    fn ensure_path(conn: &Connection, path: &str) -> Result<Option<RowId>> {
        let mut parent: Option<RowId> = None;
        for part in path.split(['/', '\\']).filter(|p| !p.is_empty()) {
            let existing: Option<RowId> = conn
                .query_row(
                    "SELECT rowid FROM pathparts WHERE parent IS ?1 AND pathpart = ?2",
                    params![parent, part],
                    |row| row.get(0),
                )
                .optional()?;
            parent = Some(match existing {
                Some(id) => id,
                None => {
                    conn.execute(
                        "INSERT INTO pathparts (parent, pathpart) VALUES (?1, ?2)",
                        params![parent, part],
                    )?;
                    conn.last_insert_rowid()
                }
            });
        }
        Ok(parent)
    }

    /// Delete `part` and its ancestors once nothing uses them.
    fn remove_path(conn: &Connection, part: RowId) -> Result<()> {
        let mut current = Some(part);
        while let Some(part) = current {
            let in_use: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM manifest WHERE pathpart = ?1)
                     OR EXISTS(SELECT 1 FROM pathparts WHERE parent = ?1)",
                params![part],
                |row| row.get(0),
            )?;
            if in_use {
                break;
            }
            let parent: Option<RowId> = conn
                .query_row(
                    "SELECT parent FROM pathparts WHERE rowid = ?1",
                    params![part],
                    |row| row.get(0),
                )
                .optional()?
                .flatten();
            conn.execute("DELETE FROM pathparts WHERE rowid = ?1", params![part])?;
            current = parent;
        }
        Ok(())
    }

    fn relative_path(conn: &Connection, manifest: RowId) -> Result<Option<String>> {
        let mut current: Option<RowId> = conn
            .query_row(
                "SELECT pathpart FROM manifest WHERE rowid = ?1",
                params![manifest],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        let mut parts = Vec::new();
        while let Some(part) = current {
            let (parent, name): (Option<RowId>, String) = conn.query_row(
                "SELECT parent, pathpart FROM pathparts WHERE rowid = ?1",
                params![part],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            parts.push(name);
            current = parent;
        }

        if parts.is_empty() {
            return Ok(None);
        }
        parts.reverse();
        Ok(Some(parts.join("/")))
    }
}

impl SchemaInterface for V1_0 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1, 0)
    }

    fn create_delta(&self, conn: &Connection) -> Result<()> {
        for table in self.string_tables() {
            table.create(conn)?;
        }
        conn.execute_batch(
            "
            CREATE TABLE manifest (
                rowid INTEGER PRIMARY KEY,
                id INTEGER NOT NULL,
                name INTEGER NOT NULL,
                moniker INTEGER NOT NULL,
                publisher INTEGER NOT NULL,
                version INTEGER NOT NULL,
                channel INTEGER NOT NULL,
                pathpart INTEGER
            );
            CREATE UNIQUE INDEX manifest_id_version_channel_index
                ON manifest(id, version, channel);
            CREATE INDEX manifest_pathpart_index ON manifest(pathpart);

            CREATE TABLE pathparts (
                rowid INTEGER PRIMARY KEY,
                parent INTEGER,
                pathpart TEXT NOT NULL
            );
            CREATE UNIQUE INDEX pathparts_parent_pathpart_index
                ON pathparts(parent, pathpart);
            ",
        )?;
        TAGS.create(conn)?;
        COMMANDS.create(conn)?;
        Ok(())
    }

    fn string_tables(&self) -> Vec<StringTable> {
        STRING_COLUMNS
            .iter()
            .map(|&(table, column)| strings(table, column))
            .collect()
    }

    fn map_tables(&self) -> Vec<MapTable> {
        vec![TAGS, COMMANDS]
    }

    fn manifest_table(&self) -> Option<&'static str> {
        Some(MANIFEST)
    }

    fn tracks_relative_paths(&self) -> bool {
        true
    }

    fn insert_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<RowId> {
        let id = strings("ids", "id").ensure_exists(conn, &manifest.id)?;
        let name = strings("names", "name").ensure_exists(conn, &manifest.package_name)?;
        let moniker = strings("monikers", "moniker").ensure_exists(conn, &manifest.moniker)?;
        let publisher =
            strings("publishers", "publisher").ensure_exists(conn, &manifest.publisher)?;
        let version = strings("versions", "version").ensure_exists(conn, &manifest.version)?;
        let channel = strings("channels", "channel").ensure_exists(conn, &manifest.channel)?;
        let pathpart = match relative_path {
            Some(path) => Self::ensure_path(conn, path)?,
            None => None,
        };

        conn.execute(
            "INSERT INTO manifest (id, name, moniker, publisher, version, channel, pathpart)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, name, moniker, publisher, version, channel, pathpart],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn delete_manifest_row(&self, conn: &Connection, manifest: RowId) -> Result<()> {
        let pathpart: Option<RowId> = conn
            .query_row(
                "SELECT pathpart FROM manifest WHERE rowid = ?1",
                params![manifest],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        conn.execute("DELETE FROM manifest WHERE rowid = ?1", params![manifest])?;
        if let Some(part) = pathpart {
            Self::remove_path(conn, part)?;
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
                "SELECT m.rowid FROM manifest m
                 JOIN ids i ON i.rowid = m.id
                 JOIN versions v ON v.rowid = m.version
                 JOIN channels c ON c.rowid = m.channel
                 WHERE i.id = ?1 AND v.version = ?2 AND c.channel = ?3",
                params![id, version, channel],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rowid)
    }

    fn column_sql(&self, field: PackageMatchField) -> Option<String> {
        let (table, column) = match field {
            PackageMatchField::Id => ("ids", "id"),
            PackageMatchField::Name => ("names", "name"),
            PackageMatchField::Moniker => ("monikers", "moniker"),
            _ => return None,
        };
        Some(format!(
            "SELECT m.rowid FROM manifest m JOIN {table} s ON s.rowid = m.{column} WHERE s.{column}"
        ))
    }

    fn package_of(&self, conn: &Connection, manifest: RowId) -> Result<Option<(RowId, String)>> {
        let package = conn
            .query_row(
                "SELECT i.rowid, i.id FROM manifest m JOIN ids i ON i.rowid = m.id
                 WHERE m.rowid = ?1",
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
        let (table, column) = match property {
            ManifestProperty::Id => ("ids", "id"),
            ManifestProperty::Name => ("names", "name"),
            ManifestProperty::Moniker => ("monikers", "moniker"),
            ManifestProperty::Publisher => ("publishers", "publisher"),
            ManifestProperty::Version => ("versions", "version"),
            ManifestProperty::Channel => ("channels", "channel"),
            ManifestProperty::RelativePath => return Self::relative_path(conn, manifest),
            _ => return Ok(None),
        };
        let value = conn
            .query_row(
                &format!(
                    "SELECT s.{column} FROM manifest m JOIN {table} s ON s.rowid = m.{column}
                     WHERE m.rowid = ?1"
                ),
                params![manifest],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_versions(&self, conn: &Connection, id: &str) -> Result<Vec<VersionKey>> {
        let mut stmt = conn.prepare(
            "SELECT m.rowid, v.version, c.channel FROM manifest m
             JOIN ids i ON i.rowid = m.id
             JOIN versions v ON v.rowid = m.version
             JOIN channels c ON c.rowid = m.channel
             WHERE i.id = ?1",
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
        let mut ok = check_owned(conn, MANIFEST, "pathpart", "pathparts", log)?;
        ok &= check_owned(conn, "pathparts", "parent", "pathparts", log)?;
        Ok(ok)
    }

    fn prepare_for_packaging(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "DROP INDEX IF EXISTS manifest_pathpart_index;
             DROP INDEX IF EXISTS pathparts_parent_pathpart_index;",
        )?;
        Ok(())
    }
}

pub(super) fn sort_newest_first(versions: &mut [VersionKey]) {
    versions.sort_by(|a, b| {
        Version::parse(&b.version)
            .cmp(&Version::parse(&a.version))
            .then_with(|| a.channel.cmp(&b.channel))
    });
}

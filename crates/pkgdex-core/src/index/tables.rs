//! Table descriptors shared by every schema version.
//!
//! Schema versions describe their interned-string tables and many-to-many
//! map tables with these descriptors. Creation, interning, orphan cleanup,
//! search and consistency checks are then written once here.

use std::collections::{BTreeMap, BTreeSet};

use pkgdex_schema::{Manifest, Version};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::warn;

use super::error::Result;
use super::search::PackageMatchField;

pub type RowId = i64;

/// A column holding rowids of another table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub table: &'static str,
    pub column: &'static str,
}

impl Column {
    pub const fn new(table: &'static str, column: &'static str) -> Self {
        Self { table, column }
    }
}

/// A deduplicated string table: `rowid` plus one unique text column.
#[derive(Debug, Clone)]
pub struct StringTable {
    pub name: &'static str,
    pub column: &'static str,
    /// Columns elsewhere that store rowids of this table.
    pub referenced_by: Vec<Column>,
}

impl StringTable {
    pub fn new(name: &'static str, column: &'static str, referenced_by: Vec<Column>) -> Self {
        Self {
            name,
            column,
            referenced_by,
        }
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE {t} (rowid INTEGER PRIMARY KEY, {c} TEXT NOT NULL);
             CREATE UNIQUE INDEX {t}_pkindex ON {t}({c});",
            t = self.name,
            c = self.column,
        ))?;
        Ok(())
    }

    /// Intern `value`, returning the rowid of the existing or new row.
    pub fn ensure_exists(&self, conn: &Connection, value: &str) -> Result<RowId> {
        conn.execute(
            &format!(
                "INSERT INTO {t} ({c}) VALUES (?1) ON CONFLICT({c}) DO NOTHING",
                t = self.name,
                c = self.column,
            ),
            params![value],
        )?;
        let id = conn.query_row(
            &format!("SELECT rowid FROM {} WHERE {} = ?1", self.name, self.column),
            params![value],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn find(&self, conn: &Connection, value: &str) -> Result<Option<RowId>> {
        let id = conn
            .query_row(
                &format!("SELECT rowid FROM {} WHERE {} = ?1", self.name, self.column),
                params![value],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn value_of(&self, conn: &Connection, rowid: RowId) -> Result<Option<String>> {
        let value = conn
            .query_row(
                &format!("SELECT {} FROM {} WHERE rowid = ?1", self.column, self.name),
                params![rowid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// `SELECT` of every rowid still referenced, or `None` when nothing
    /// references this table.
    fn referenced_sql(&self) -> Option<String> {
        if self.referenced_by.is_empty() {
            return None;
        }
        Some(
            self.referenced_by
                .iter()
                .map(|r| {
                    format!(
                        "SELECT {c} FROM {t} WHERE {c} IS NOT NULL",
                        c = r.column,
                        t = r.table
                    )
                })
                .collect::<Vec<_>>()
                .join(" UNION "),
        )
    }

    /// Delete rows nothing references any more.
    pub fn remove_orphans(&self, conn: &Connection) -> Result<usize> {
        let Some(referenced) = self.referenced_sql() else {
            return Ok(0);
        };
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE rowid NOT IN ({referenced})", self.name),
            [],
        )?;
        Ok(removed)
    }

    /// Check for dangling references into this table and for orphaned rows.
    pub fn check(&self, conn: &Connection, log: bool) -> Result<bool> {
        let mut ok = true;

        for r in &self.referenced_by {
            let dangling: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {t}
                     WHERE {c} IS NOT NULL AND {c} NOT IN (SELECT rowid FROM {s})",
                    t = r.table,
                    c = r.column,
                    s = self.name,
                ),
                [],
                |row| row.get(0),
            )?;
            if dangling > 0 {
                ok = false;
                if log {
                    warn!(
                        table = r.table,
                        column = r.column,
                        target = self.name,
                        count = dangling,
                        "Rows reference missing strings"
                    );
                }
            }
        }

        if let Some(referenced) = self.referenced_sql() {
            let orphans: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE rowid NOT IN ({referenced})",
                    self.name
                ),
                [],
                |row| row.get(0),
            )?;
            if orphans > 0 {
                ok = false;
                if log {
                    warn!(table = self.name, count = orphans, "Orphaned string rows");
                }
            }
        }

        Ok(ok)
    }
}

/// Many-to-many link between an owner row and interned values, e.g. the
/// tags of a manifest.
#[derive(Debug, Clone, Copy)]
pub struct MapTable {
    /// Search field backed by this map.
    pub field: PackageMatchField,
    pub value_table: &'static str,
    pub value_column: &'static str,
    pub map_table: &'static str,
    /// Table holding the owning rows.
    pub owner_table: &'static str,
    /// Column of the map table holding the owner rowid.
    pub owner_column: &'static str,
    /// Values contributed by a manifest.
    pub extract: fn(&Manifest) -> Vec<String>,
}

impl MapTable {
    pub fn strings(&self) -> StringTable {
        StringTable::new(
            self.value_table,
            self.value_column,
            vec![Column::new(self.map_table, self.value_column)],
        )
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        self.strings().create(conn)?;
        conn.execute_batch(&format!(
            "CREATE TABLE {m} (
                 {o} INTEGER NOT NULL,
                 {v} INTEGER NOT NULL,
                 PRIMARY KEY({v}, {o})
             ) WITHOUT ROWID;
             CREATE INDEX {m}_{o}_index ON {m}({o});",
            m = self.map_table,
            o = self.owner_column,
            v = self.value_column,
        ))?;
        Ok(())
    }

    /// Link every value `extract` yields from `manifest` to `owner`.
    pub fn insert(&self, conn: &Connection, owner: RowId, manifest: &Manifest) -> Result<()> {
        let strings = self.strings();
        let values: BTreeSet<String> = (self.extract)(manifest)
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();

        for value in values {
            let value_id = strings.ensure_exists(conn, &value)?;
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {m} ({o}, {v}) VALUES (?1, ?2)",
                    m = self.map_table,
                    o = self.owner_column,
                    v = self.value_column,
                ),
                params![owner, value_id],
            )?;
        }
        Ok(())
    }

    pub fn delete_owner(&self, conn: &Connection, owner: RowId) -> Result<()> {
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                self.map_table, self.owner_column
            ),
            params![owner],
        )?;
        Ok(())
    }

    pub fn values_for(&self, conn: &Connection, owner: RowId) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT v.{v} FROM {m} m JOIN {t} v ON v.rowid = m.{v} WHERE m.{o} = ?1 ORDER BY v.{v}",
            v = self.value_column,
            m = self.map_table,
            t = self.value_table,
            o = self.owner_column,
        ))?;
        let values = stmt.query_map(params![owner], |row| row.get(0))?;
        Ok(values.collect::<Result<Vec<_>, _>>()?)
    }

    /// Search prefix selecting owner rowids; the match clause is appended
    /// to the value column.
    pub fn search_sql(&self) -> String {
        format!(
            "SELECT m.{o} FROM {m} m JOIN {t} v ON v.rowid = m.{c} WHERE v.{c}",
            o = self.owner_column,
            m = self.map_table,
            t = self.value_table,
            c = self.value_column,
        )
    }

    /// Check the map against its owner table and its value table.
    pub fn check(&self, conn: &Connection, log: bool) -> Result<bool> {
        let mut ok = self.strings().check(conn, log)?;

        let missing_owner: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {m} WHERE {o} NOT IN (SELECT rowid FROM {t})",
                m = self.map_table,
                o = self.owner_column,
                t = self.owner_table,
            ),
            [],
            |row| row.get(0),
        )?;
        if missing_owner > 0 {
            ok = false;
            if log {
                warn!(
                    table = self.map_table,
                    owner = self.owner_table,
                    count = missing_owner,
                    "Map rows reference missing owners"
                );
            }
        }
        Ok(ok)
    }
}

/// Count rows of `table` whose `column` does not point at a row of
/// `target`, logging when asked. Returns whether there were none.
pub fn check_owned(
    conn: &Connection,
    table: &str,
    column: &str,
    target: &str,
    log: bool,
) -> Result<bool> {
    let missing: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE {column} NOT IN (SELECT rowid FROM {target})"),
        [],
        |row| row.get(0),
    )?;
    if missing > 0 && log {
        warn!(table, column, target, count = missing, "Rows reference missing owners");
    }
    Ok(missing == 0)
}

/// One Add/Remove Programs version range recorded for a manifest.
#[derive(Debug, Clone)]
pub struct ArpRange {
    /// Package key the range belongs to (id plus channel).
    pub package: String,
    pub version: String,
    pub min: String,
    pub max: String,
}

/// Verify that ARP ranges are well ordered and that no two versions of one
/// package claim overlapping ranges.
pub fn check_arp_ranges(ranges: Vec<ArpRange>, log: bool) -> bool {
    let mut ok = true;
    let mut by_package: BTreeMap<String, Vec<(Version, Version, String)>> = BTreeMap::new();

    for range in ranges {
        let min = Version::parse(&range.min);
        let max = Version::parse(&range.max);
        if min > max {
            ok = false;
            if log {
                warn!(
                    package = %range.package,
                    version = %range.version,
                    min = %min,
                    max = %max,
                    "ARP range minimum is above its maximum"
                );
            }
        }
        by_package
            .entry(range.package)
            .or_default()
            .push((min, max, range.version));
    }

    for (package, mut ranges) in by_package {
        for (first, second) in overlapping_ranges(&mut ranges) {
            ok = false;
            if log {
                warn!(
                    package = %package,
                    first,
                    second,
                    "ARP version ranges overlap"
                );
            }
        }
    }

    ok
}

/// Every pair of versions whose `(min, max, version)` ranges intersect,
/// each pair listed once with the lower minimum first.
fn overlapping_ranges(ranges: &mut [(Version, Version, String)]) -> Vec<(&str, &str)> {
    ranges.sort_by(|a, b| a.0.cmp(&b.0));
    let mut overlaps = Vec::new();
    for (i, (_, max, version)) in ranges.iter().enumerate() {
        for (next_min, _, next_version) in &ranges[i + 1..] {
            if next_min > max {
                break;
            }
            overlaps.push((version.as_str(), next_version.as_str()));
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(package: &str, version: &str, min: &str, max: &str) -> ArpRange {
        ArpRange {
            package: package.to_string(),
            version: version.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    #[test]
    fn test_string_table_interning() {
        let conn = Connection::open_in_memory().unwrap();
        let table = StringTable::new("names", "name", vec![]);
        table.create(&conn).unwrap();

        let a = table.ensure_exists(&conn, "Editor").unwrap();
        let b = table.ensure_exists(&conn, "Editor").unwrap();
        let c = table.ensure_exists(&conn, "Viewer").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.value_of(&conn, c).unwrap().as_deref(), Some("Viewer"));
        assert_eq!(table.find(&conn, "Missing").unwrap(), None);
    }

    #[test]
    fn test_orphans_are_removed_and_reported() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE owner (rowid INTEGER PRIMARY KEY, name INTEGER);")
            .unwrap();
        let table = StringTable::new("names", "name", vec![Column::new("owner", "name")]);
        table.create(&conn).unwrap();

        let used = table.ensure_exists(&conn, "used").unwrap();
        table.ensure_exists(&conn, "unused").unwrap();
        conn.execute("INSERT INTO owner (name) VALUES (?1)", params![used])
            .unwrap();

        assert!(!table.check(&conn, false).unwrap());
        assert_eq!(table.remove_orphans(&conn).unwrap(), 1);
        assert!(table.check(&conn, false).unwrap());
    }

    #[test]
    fn test_arp_ranges() {
        assert!(check_arp_ranges(
            vec![
                range("a", "1.0", "1.0", "1.9"),
                range("a", "2.0", "2.0", "2.9"),
                range("b", "1.0", "1.0", "5.0"),
            ],
            false
        ));
        assert!(!check_arp_ranges(
            vec![range("a", "1.0", "1.0", "2.0"), range("a", "2.0", "2.0", "3.0")],
            false
        ));
        assert!(!check_arp_ranges(vec![range("a", "1.0", "3.0", "2.0")], false));
    }

    #[test]
    fn test_arp_overlaps_beyond_neighbours() {
        let mut ranges: Vec<(Version, Version, String)> = [
            ("4", "5", "C"),
            ("1", "10", "A"),
            ("2", "3", "B"),
            ("11", "12", "D"),
        ]
        .into_iter()
        .map(|(min, max, v)| (Version::parse(min), Version::parse(max), v.to_string()))
        .collect();

        assert_eq!(overlapping_ranges(&mut ranges), [("A", "B"), ("A", "C")]);

        assert!(!check_arp_ranges(
            vec![
                range("p", "A", "1", "10"),
                range("p", "B", "2", "3"),
                range("p", "C", "4", "5"),
            ],
            false
        ));
    }
}

//! Schema 1.5: Add/Remove Programs version range per manifest.

use pkgdex_schema::{Manifest, Version};
use rusqlite::{Connection, OptionalExtension, params};

use super::{ManifestProperty, SchemaInterface, V1_4};
use crate::index::error::Result;
use crate::index::tables::{ArpRange, RowId, check_arp_ranges};
use crate::index::version::SchemaVersion;

/// Lowest and highest `DisplayVersion` the manifest's installers register.
pub(super) fn arp_range(manifest: &Manifest) -> Option<(String, String)> {
    let versions: Vec<&str> = manifest
        .installers
        .iter()
        .flat_map(|i| i.apps_and_features_entries.iter())
        .map(|e| e.display_version.trim())
        .filter(|v| !v.is_empty())
        .collect();

    let min = versions.iter().min_by_key(|v| Version::parse(v))?;
    let max = versions.iter().max_by_key(|v| Version::parse(v))?;
    Some((min.to_string(), max.to_string()))
}

#[derive(Debug, Default)]
pub struct V1_5 {
    base: V1_4,
}

impl V1_5 {
    pub fn new() -> Self {
        Self { base: V1_4::new() }
    }
}

impl SchemaInterface for V1_5 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1, 5)
    }

    fn base(&self) -> Option<&dyn SchemaInterface> {
        Some(&self.base)
    }

    fn create_delta(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "ALTER TABLE manifest ADD COLUMN arp_min_version TEXT;
             ALTER TABLE manifest ADD COLUMN arp_max_version TEXT;",
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
        if let Some((min, max)) = arp_range(manifest) {
            conn.execute(
                "UPDATE manifest SET arp_min_version = ?1, arp_max_version = ?2 WHERE rowid = ?3",
                params![min, max, rowid],
            )?;
        }
        Ok(rowid)
    }

    fn get_property(
        &self,
        conn: &Connection,
        manifest: RowId,
        property: ManifestProperty,
    ) -> Result<Option<String>> {
        let column = match property {
            ManifestProperty::ArpMinVersion => "arp_min_version",
            ManifestProperty::ArpMaxVersion => "arp_max_version",
            _ => return self.base.get_property(conn, manifest, property),
        };
        let value = conn
            .query_row(
                &format!("SELECT {column} FROM manifest WHERE rowid = ?1"),
                params![manifest],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
        Ok(value)
    }

    fn check_specific(&self, conn: &Connection, log: bool) -> Result<bool> {
        let mut ok = self.base.check_specific(conn, log)?;

        let mut stmt = conn.prepare(
            "SELECT i.id, c.channel, v.version, m.arp_min_version, m.arp_max_version
             FROM manifest m
             JOIN ids i ON i.rowid = m.id
             JOIN channels c ON c.rowid = m.channel
             JOIN versions v ON v.rowid = m.version
             WHERE m.arp_min_version IS NOT NULL AND m.arp_max_version IS NOT NULL",
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgdex_schema::{AppsAndFeaturesEntry, ManifestInstaller};

    #[test]
    fn test_arp_range_spans_all_entries() {
        let entry = |v: &str| AppsAndFeaturesEntry {
            display_version: v.to_string(),
            ..AppsAndFeaturesEntry::default()
        };
        let manifest = Manifest {
            installers: vec![
                ManifestInstaller {
                    apps_and_features_entries: vec![entry("1.10"), entry("1.2")],
                    ..ManifestInstaller::default()
                },
                ManifestInstaller {
                    apps_and_features_entries: vec![entry("1.9")],
                    ..ManifestInstaller::default()
                },
            ],
            ..Manifest::default()
        };
        assert_eq!(
            arp_range(&manifest),
            Some(("1.2".to_string(), "1.10".to_string()))
        );
        assert_eq!(arp_range(&Manifest::default()), None);
    }
}

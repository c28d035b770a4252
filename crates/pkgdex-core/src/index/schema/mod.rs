//! Schema version implementations.
//!
//! Each `V1_N` wraps `V1_(N-1)` and overrides only the hooks its delta
//! touches; every other hook falls through to [`SchemaInterface::base`].
//! The provided operations (`add_manifest`, `search`, `check_consistency`
//! and friends) are written once against the hooks, so they always see the
//! outermost version's tables.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use pkgdex_schema::{Manifest, PackageDependency};
use rusqlite::{Connection, params};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::error::{IndexError, Result};
use super::search::{
    PackageMatchField, PackageMatchFilter, SearchMatch, SearchRequest, SearchResult,
};
use super::tables::{MapTable, RowId, StringTable};
use super::version::SchemaVersion;
use crate::normalize::{normalize_name, normalize_publisher};

mod v1_0;
mod v1_1;
mod v1_2;
mod v1_3;
mod v1_4;
mod v1_5;
mod v1_6;
mod v1_7;
mod v2_0;

pub use v1_0::V1_0;
pub use v1_1::V1_1;
pub use v1_2::V1_2;
pub use v1_3::V1_3;
pub use v1_4::V1_4;
pub use v1_5::V1_5;
pub use v1_6::V1_6;
pub use v1_7::V1_7;
pub use v2_0::V2_0;

/// Single-valued manifest properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestProperty {
    Id,
    Name,
    Moniker,
    Publisher,
    Version,
    Channel,
    /// Path of the manifest file relative to the manifest tree root.
    RelativePath,
    ManifestHash,
    ArpMinVersion,
    ArpMaxVersion,
    /// When the manifest was indexed. Build-time data, gone after packaging.
    IndexedAt,
}

/// One indexed version of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionKey {
    pub manifest: RowId,
    pub version: String,
    pub channel: String,
}

/// Installer row recorded by schema 1.7 and later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedInstaller {
    pub architecture: String,
    pub installer_type: String,
    pub scope: String,
    pub locale: String,
}

/// Behaviour of one on-disk schema version.
pub trait SchemaInterface: fmt::Debug + Send + Sync {
    fn version(&self) -> SchemaVersion;

    /// The version this one extends.
    fn base(&self) -> Option<&dyn SchemaInterface> {
        None
    }

    /// Create only what this version adds on top of its base.
    fn create_delta(&self, conn: &Connection) -> Result<()>;

    /// Fill this version's delta for manifests indexed before it existed.
    fn backfill(&self, _conn: &Connection) -> Result<()> {
        Ok(())
    }

    fn create_tables(&self, conn: &Connection) -> Result<()> {
        if let Some(base) = self.base() {
            base.create_tables(conn)?;
        }
        self.create_delta(conn)
    }

    /// Interned string tables, with every column that references them.
    fn string_tables(&self) -> Vec<StringTable> {
        self.base().map(|b| b.string_tables()).unwrap_or_default()
    }

    /// Map tables keyed by manifest row.
    fn map_tables(&self) -> Vec<MapTable> {
        self.base().map(|b| b.map_tables()).unwrap_or_default()
    }

    /// Table whose rowids identify manifests.
    fn manifest_table(&self) -> Option<&'static str> {
        self.base().and_then(|b| b.manifest_table())
    }

    fn tracks_relative_paths(&self) -> bool {
        self.base().is_some_and(|b| b.tracks_relative_paths())
    }

    /// Insert everything but map rows; returns the manifest rowid.
    fn insert_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<RowId> {
        unsupported(self, "insert_manifest")?.insert_manifest(conn, manifest, relative_path)
    }

    /// Delete everything but map rows and interned strings.
    fn delete_manifest_row(&self, conn: &Connection, manifest: RowId) -> Result<()> {
        unsupported(self, "delete_manifest_row")?.delete_manifest_row(conn, manifest)
    }

    fn find_manifest(
        &self,
        conn: &Connection,
        id: &str,
        version: &str,
        channel: &str,
    ) -> Result<Option<RowId>> {
        unsupported(self, "find_manifest")?.find_manifest(conn, id, version, channel)
    }

    /// Search prefix selecting manifest rowids for a column-backed field.
    fn column_sql(&self, field: PackageMatchField) -> Option<String> {
        self.base().and_then(|b| b.column_sql(field))
    }

    /// Package key and identifier of a manifest.
    fn package_of(&self, conn: &Connection, manifest: RowId) -> Result<Option<(RowId, String)>> {
        unsupported(self, "package_of")?.package_of(conn, manifest)
    }

    fn get_property(
        &self,
        conn: &Connection,
        manifest: RowId,
        property: ManifestProperty,
    ) -> Result<Option<String>> {
        match self.base() {
            Some(base) => base.get_property(conn, manifest, property),
            None => Ok(None),
        }
    }

    /// Every indexed version of `id`, newest first.
    fn get_versions(&self, conn: &Connection, id: &str) -> Result<Vec<VersionKey>> {
        unsupported(self, "get_versions")?.get_versions(conn, id)
    }

    fn get_installers(&self, conn: &Connection, manifest: RowId) -> Result<Vec<IndexedInstaller>> {
        unsupported(self, "get_installers")?.get_installers(conn, manifest)
    }

    fn get_dependencies(
        &self,
        conn: &Connection,
        manifest: RowId,
    ) -> Result<Vec<PackageDependency>> {
        unsupported(self, "get_dependencies")?.get_dependencies(conn, manifest)
    }

    /// Checks beyond the generic string and map table ones.
    fn check_specific(&self, conn: &Connection, log: bool) -> Result<bool> {
        match self.base() {
            Some(base) => base.check_specific(conn, log),
            None => Ok(true),
        }
    }

    /// Drop data only needed while building the index.
    fn prepare_for_packaging(&self, conn: &Connection) -> Result<()> {
        match self.base() {
            Some(base) => base.prepare_for_packaging(conn),
            None => Ok(()),
        }
    }

    /// Add a manifest. Fails if its (id, version, channel) is already indexed.
    fn add_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<RowId> {
        if self
            .find_manifest(conn, &manifest.id, &manifest.version, &manifest.channel)?
            .is_some()
        {
            return Err(IndexError::ManifestAlreadyExists {
                id: manifest.id.clone(),
                version: manifest.version.clone(),
                channel: manifest.channel.clone(),
            });
        }

        let rowid = self.insert_manifest(conn, manifest, relative_path)?;
        for map in self.map_tables() {
            map.insert(conn, rowid, manifest)?;
        }
        debug!(id = %manifest.id, version = %manifest.version, rowid, "Added manifest");
        Ok(rowid)
    }

    /// Replace an indexed manifest. Returns false when nothing changed.
    fn update_manifest(
        &self,
        conn: &Connection,
        manifest: &Manifest,
        relative_path: Option<&str>,
    ) -> Result<bool> {
        let rowid = self
            .find_manifest(conn, &manifest.id, &manifest.version, &manifest.channel)?
            .ok_or_else(|| not_found(&manifest.id, &manifest.version, &manifest.channel))?;

        let hash_unchanged = match self.get_property(conn, rowid, ManifestProperty::ManifestHash)? {
            Some(old) => old == manifest_hash(manifest)?,
            None => false,
        };
        let path_unchanged = !self.tracks_relative_paths()
            || self.get_property(conn, rowid, ManifestProperty::RelativePath)?.as_deref()
                == relative_path;
        if hash_unchanged && path_unchanged {
            debug!(id = %manifest.id, version = %manifest.version, "Manifest unchanged");
            return Ok(false);
        }

        self.delete_manifest(conn, rowid)?;
        self.add_manifest(conn, manifest, relative_path)?;
        Ok(true)
    }

    /// Remove a manifest and any strings only it referenced.
    fn remove_manifest(
        &self,
        conn: &Connection,
        id: &str,
        version: &str,
        channel: &str,
    ) -> Result<RowId> {
        let rowid = self
            .find_manifest(conn, id, version, channel)?
            .ok_or_else(|| not_found(id, version, channel))?;
        self.delete_manifest(conn, rowid)?;
        debug!(id, version, rowid, "Removed manifest");
        Ok(rowid)
    }

    fn delete_manifest(&self, conn: &Connection, rowid: RowId) -> Result<()> {
        for map in self.map_tables() {
            map.delete_owner(conn, rowid)?;
        }
        self.delete_manifest_row(conn, rowid)?;
        self.remove_orphans(conn)
    }

    fn remove_orphans(&self, conn: &Connection) -> Result<()> {
        for table in self.string_tables() {
            table.remove_orphans(conn)?;
        }
        for map in self.map_tables() {
            map.strings().remove_orphans(conn)?;
        }
        Ok(())
    }

    /// Values of a map-backed field for one manifest. Empty when the
    /// schema has no such map.
    fn get_multi_property(
        &self,
        conn: &Connection,
        manifest: RowId,
        field: PackageMatchField,
    ) -> Result<Vec<String>> {
        match self.map_tables().into_iter().find(|m| m.field == field) {
            Some(map) => map.values_for(conn, manifest),
            None => Ok(Vec::new()),
        }
    }

    /// Search prefix for `field`, from a map table or a column.
    fn field_sql(&self, field: PackageMatchField) -> Option<String> {
        self.map_tables()
            .iter()
            .find(|m| m.field == field)
            .map(MapTable::search_sql)
            .or_else(|| self.column_sql(field))
    }

    /// Manifest rowids matching a filter, or `None` when this schema does
    /// not know the field.
    fn match_field(
        &self,
        conn: &Connection,
        filter: &PackageMatchFilter,
    ) -> Result<Option<Vec<RowId>>> {
        let Some(prefix) = self.field_sql(filter.field) else {
            debug!(
                field = %filter.field,
                version = %self.version(),
                "Field not in schema, ignored"
            );
            return Ok(None);
        };
        let sql = format!("{prefix}{}", filter.match_type.clause());
        let value = filter
            .match_type
            .bind(&filter.field.prepare_value(&filter.value));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![value], |row| row.get(0))?;
        Ok(Some(rows.collect::<Result<Vec<_>, _>>()?))
    }

    fn search(&self, conn: &Connection, request: &SearchRequest) -> Result<SearchResult> {
        let mut candidates: BTreeMap<RowId, Option<PackageMatchFilter>> = BTreeMap::new();

        if request.is_unbounded() {
            if let Some(table) = self.manifest_table() {
                let mut stmt = conn.prepare(&format!("SELECT rowid FROM {table}"))?;
                let rows = stmt.query_map([], |row| row.get::<_, RowId>(0))?;
                for rowid in rows {
                    candidates.insert(rowid?, None);
                }
            }
        } else {
            let query_filters = request.query.iter().flat_map(|q| {
                PackageMatchField::QUERY_FIELDS
                    .into_iter()
                    .map(move |field| PackageMatchFilter::new(field, q.match_type, q.value.clone()))
            });
            for filter in query_filters.chain(request.inclusions.iter().cloned()) {
                for rowid in self.match_field(conn, &filter)?.unwrap_or_default() {
                    candidates
                        .entry(rowid)
                        .or_insert_with(|| Some(filter.clone()));
                }
            }
        }

        for filter in &request.filters {
            if let Some(rows) = self.match_field(conn, filter)? {
                let matched: BTreeSet<RowId> = rows.into_iter().collect();
                candidates.retain(|rowid, _| matched.contains(rowid));
            }
        }

        let mut packages: BTreeMap<String, SearchMatch> = BTreeMap::new();
        for (rowid, matched) in candidates {
            if let Some((package, id)) = self.package_of(conn, rowid)? {
                packages.entry(id.clone()).or_insert(SearchMatch {
                    package,
                    id,
                    matched,
                });
            }
        }

        let mut matches: Vec<SearchMatch> = packages.into_values().collect();
        let truncated = request.maximum_results > 0 && matches.len() > request.maximum_results;
        if truncated {
            matches.truncate(request.maximum_results);
        }
        Ok(SearchResult { matches, truncated })
    }

    /// Walk every relationship, reporting each violation when `log` is set.
    fn check_consistency(&self, conn: &Connection, log: bool) -> Result<bool> {
        let mut ok = true;
        for table in self.string_tables() {
            ok &= table.check(conn, log)?;
        }
        for map in self.map_tables() {
            ok &= map.check(conn, log)?;
        }
        ok &= self.check_specific(conn, log)?;
        Ok(ok)
    }
}

/// The base of `schema`, or the error for an operation no version in its
/// chain implements.
fn unsupported<'a, S: SchemaInterface + ?Sized>(
    schema: &'a S,
    operation: &'static str,
) -> Result<&'a dyn SchemaInterface> {
    schema.base().ok_or(IndexError::NotSupportedBySchema {
        operation,
        version: schema.version(),
    })
}

fn not_found(id: &str, version: &str, channel: &str) -> IndexError {
    IndexError::ManifestNotFound {
        id: id.to_string(),
        version: version.to_string(),
        channel: channel.to_string(),
    }
}

/// `schema` followed by each of its bases, newest first.
pub fn schema_chain(schema: &dyn SchemaInterface) -> Vec<&dyn SchemaInterface> {
    let mut chain = vec![schema];
    let mut current = schema;
    while let Some(base) = current.base() {
        chain.push(base);
        current = base;
    }
    chain
}

/// Hex SHA-256 of the manifest's canonical JSON form.
pub fn manifest_hash(manifest: &Manifest) -> Result<String> {
    let bytes = serde_json::to_vec(manifest)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Values the map tables index, shared by every schema family.
pub(crate) mod extract {
    use super::{Manifest, normalize_name, normalize_publisher};

    pub fn tags(m: &Manifest) -> Vec<String> {
        m.tags
            .iter()
            .chain(m.localizations.iter().flat_map(|l| l.tags.iter()))
            .cloned()
            .collect()
    }

    pub fn commands(m: &Manifest) -> Vec<String> {
        m.commands.clone()
    }

    pub fn package_family_names(m: &Manifest) -> Vec<String> {
        m.installers
            .iter()
            .map(|i| i.package_family_name.clone())
            .collect()
    }

    pub fn product_codes(m: &Manifest) -> Vec<String> {
        m.installers
            .iter()
            .flat_map(|i| {
                std::iter::once(i.product_code.clone()).chain(
                    i.apps_and_features_entries
                        .iter()
                        .map(|e| e.product_code.clone()),
                )
            })
            .collect()
    }

    pub fn upgrade_codes(m: &Manifest) -> Vec<String> {
        m.installers
            .iter()
            .flat_map(|i| i.apps_and_features_entries.iter())
            .map(|e| e.upgrade_code.clone())
            .collect()
    }

    pub fn normalized_names(m: &Manifest) -> Vec<String> {
        std::iter::once(m.package_name.as_str())
            .chain(m.localizations.iter().map(|l| l.package_name.as_str()))
            .chain(
                m.installers
                    .iter()
                    .flat_map(|i| i.apps_and_features_entries.iter())
                    .map(|e| e.display_name.as_str()),
            )
            .map(normalize_name)
            .collect()
    }

    pub fn normalized_publishers(m: &Manifest) -> Vec<String> {
        std::iter::once(m.publisher.as_str())
            .chain(m.localizations.iter().map(|l| l.publisher.as_str()))
            .chain(
                m.installers
                    .iter()
                    .flat_map(|i| i.apps_and_features_entries.iter())
                    .map(|e| e.publisher.as_str()),
            )
            .map(normalize_publisher)
            .collect()
    }
}

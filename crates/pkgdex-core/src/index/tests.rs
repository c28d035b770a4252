use pkgdex_schema::{
    AppsAndFeaturesEntry, Architecture, InstallerType, Manifest, ManifestInstaller,
    PackageDependency, Scope,
};
use tempfile::TempDir;

use super::*;

fn manifest(id: &str, version: &str) -> Manifest {
    let name = id.replace('.', " ");
    Manifest {
        id: id.to_string(),
        version: version.to_string(),
        moniker: id.rsplit('.').next().unwrap_or(id).to_lowercase(),
        package_locale: "en-US".to_string(),
        publisher: "Contoso Ltd.".to_string(),
        package_name: name.clone(),
        license: "MIT".to_string(),
        short_description: format!("{name} for testing"),
        tags: vec!["tool".to_string()],
        installers: vec![ManifestInstaller {
            architecture: Architecture::X64,
            installer_type: InstallerType::Msi,
            scope: Scope::Machine,
            locale: "en-US".to_string(),
            url: format!("https://example.com/{id}/{version}.msi"),
            sha256: "ab".repeat(32),
            product_code: format!("{{{id}-{version}}}"),
            apps_and_features_entries: vec![AppsAndFeaturesEntry {
                display_name: name,
                display_version: version.to_string(),
                upgrade_code: format!("{{{id}-upgrade}}"),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn create(dir: &TempDir, version: SchemaVersion) -> PackageIndex {
    let path = dir.path().join(format!("index-{version}.db"));
    PackageIndex::create_new(&path, version, &SchemaRegistry::standard()).unwrap()
}

fn count(index: &PackageIndex, table: &str) -> i64 {
    index
        .conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

fn ids(result: &SearchResult) -> Vec<&str> {
    result.matches.iter().map(|m| m.id.as_str()).collect()
}

#[test]
fn test_create_records_version() {
    let dir = TempDir::new().unwrap();
    let index = create(&dir, SchemaVersion::new(1, 4));
    assert_eq!(index.schema_version(), SchemaVersion::new(1, 4));
    assert!(index.last_write_time().unwrap().is_some());
    let path = index.path().to_path_buf();
    drop(index);

    let reopened =
        PackageIndex::open(&path, OpenDisposition::ReadWrite, &SchemaRegistry::standard()).unwrap();
    assert_eq!(reopened.schema_version(), SchemaVersion::new(1, 4));
    assert_eq!(reopened.schema().version(), SchemaVersion::new(1, 4));
    assert!(!reopened.is_packaged());
}

#[test]
fn test_create_refuses_existing_file() {
    let dir = TempDir::new().unwrap();
    let index = create(&dir, SchemaVersion::DEFAULT);
    let registry = SchemaRegistry::standard();
    let err =
        PackageIndex::create_new(index.path(), SchemaVersion::DEFAULT, &registry).unwrap_err();
    assert!(matches!(err, IndexError::AlreadyExists(_)));
}

#[test]
fn test_open_dispositions() {
    let dir = TempDir::new().unwrap();
    let registry = SchemaRegistry::standard();
    let path = dir.path().join("nested").join("index.db");

    let err = PackageIndex::open(&path, OpenDisposition::ReadWrite, &registry).unwrap_err();
    assert!(matches!(err, IndexError::NotFound(_)));

    let created = PackageIndex::open(&path, OpenDisposition::Create, &registry).unwrap();
    assert_eq!(created.schema_version(), SchemaVersion::DEFAULT);
    drop(created);

    let mut read_only = PackageIndex::open(&path, OpenDisposition::ReadOnly, &registry).unwrap();
    assert!(read_only.is_read_only());
    let err = read_only
        .add_manifest(&manifest("Contoso.Editor", "1.0"), None)
        .unwrap_err();
    assert!(matches!(err, IndexError::ReadOnly));
}

#[test]
fn test_newer_minor_is_read_only() {
    let dir = TempDir::new().unwrap();
    let registry = SchemaRegistry::standard();
    let mut index = create(&dir, SchemaVersion::new(1, 7));
    index
        .add_manifest(&manifest("Contoso.Editor", "1.0"), None)
        .unwrap();
    index
        .conn
        .execute("UPDATE metadata SET value = '9' WHERE name = 'minorVersion'", [])
        .unwrap();
    let path = index.path().to_path_buf();
    drop(index);

    let err = PackageIndex::open(&path, OpenDisposition::ReadWrite, &registry).unwrap_err();
    assert!(matches!(
        err,
        IndexError::NewerSchemaNotWritable { found, latest }
            if found == SchemaVersion::new(1, 9) && latest == SchemaVersion::new(1, 7)
    ));

    let index = PackageIndex::open(&path, OpenDisposition::ReadOnly, &registry).unwrap();
    assert_eq!(index.schema_version(), SchemaVersion::new(1, 9));
    assert_eq!(index.schema().version(), SchemaVersion::new(1, 7));
    let result = index
        .search(&SearchRequest::query(MatchType::Exact, "Contoso.Editor"))
        .unwrap();
    assert_eq!(ids(&result), ["Contoso.Editor"]);
}

#[test]
fn test_unknown_major_and_missing_version() {
    let dir = TempDir::new().unwrap();
    let registry = SchemaRegistry::standard();
    let index = create(&dir, SchemaVersion::DEFAULT);
    index
        .conn
        .execute("UPDATE metadata SET value = '3' WHERE name = 'majorVersion'", [])
        .unwrap();
    let path = index.path().to_path_buf();
    drop(index);

    let err = PackageIndex::open(&path, OpenDisposition::ReadOnly, &registry).unwrap_err();
    assert!(matches!(err, IndexError::SchemaNotSupported(v) if v.major == 3));

    let bare = dir.path().join("bare.db");
    rusqlite::Connection::open(&bare)
        .unwrap()
        .execute_batch("CREATE TABLE unrelated (x INTEGER);")
        .unwrap();
    let err = PackageIndex::open(&bare, OpenDisposition::ReadOnly, &registry).unwrap_err();
    assert!(matches!(err, IndexError::MissingVersionRecord));
}

#[test]
fn test_duplicate_add_leaves_index_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::DEFAULT);
    let editor = manifest("Contoso.Editor", "1.0");
    index.add_manifest(&editor, None).unwrap();

    let err = index.add_manifest(&editor, None).unwrap_err();
    assert!(matches!(
        err,
        IndexError::ManifestAlreadyExists { ref id, ref version, .. }
            if id == "Contoso.Editor" && version == "1.0"
    ));
    assert_eq!(index.get_versions("Contoso.Editor").unwrap().len(), 1);
    assert!(index.check_consistency(true).unwrap());
}

#[test]
fn test_remove_cleans_up_strings() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::DEFAULT);
    let mut editor = manifest("Contoso.Editor", "1.0");
    editor.commands = vec!["edit".to_string()];
    editor.dependencies.package_dependencies = vec![PackageDependency {
        package_identifier: "Contoso.Runtime".to_string(),
        minimum_version: Some("2.0".to_string()),
    }];
    index
        .add_manifest(&editor, Some("c/Contoso/Editor/1.0/Contoso.Editor.yaml"))
        .unwrap();
    index
        .add_manifest(
            &manifest("Fabrikam.Tool", "3.1"),
            Some("f/Fabrikam/Tool/3.1/Fabrikam.Tool.yaml"),
        )
        .unwrap();

    index.remove_manifest("Contoso.Editor", "1.0", "").unwrap();
    assert!(index.check_consistency(true).unwrap());
    assert_eq!(count(&index, "commands"), 0);
    assert_eq!(count(&index, "ids"), 1);

    index.remove_manifest("Fabrikam.Tool", "3.1", "").unwrap();
    assert!(index.check_consistency(true).unwrap());
    for table in ["ids", "names", "versions", "channels", "tags", "pathparts", "installers"] {
        assert_eq!(count(&index, table), 0, "{table} not empty");
    }
    assert!(index.search(&SearchRequest::default()).unwrap().matches.is_empty());

    let err = index
        .remove_manifest("Fabrikam.Tool", "3.1", "")
        .unwrap_err();
    assert!(matches!(err, IndexError::ManifestNotFound { .. }));
}

#[test]
fn test_relative_paths_share_parts() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::DEFAULT);
    let first = index
        .add_manifest(
            &manifest("Contoso.Editor", "1.0"),
            Some("manifests/c/Contoso/Editor/1.0/Contoso.Editor.yaml"),
        )
        .unwrap();
    index
        .add_manifest(
            &manifest("Contoso.Editor", "2.0"),
            Some("manifests/c/Contoso/Editor/2.0/Contoso.Editor.yaml"),
        )
        .unwrap();
    assert_eq!(
        index
            .get_property(first, ManifestProperty::RelativePath)
            .unwrap()
            .as_deref(),
        Some("manifests/c/Contoso/Editor/1.0/Contoso.Editor.yaml")
    );
    // manifests, c, Contoso, Editor, plus two version dirs and two files
    assert_eq!(count(&index, "pathparts"), 8);

    index.remove_manifest("Contoso.Editor", "1.0", "").unwrap();
    assert_eq!(count(&index, "pathparts"), 6);
    assert!(index.check_consistency(true).unwrap());
}

#[test]
fn test_update_manifest() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::DEFAULT);
    let mut editor = manifest("Contoso.Editor", "1.0");
    let path = "c/Contoso/Editor/1.0/Contoso.Editor.yaml";
    index.add_manifest(&editor, Some(path)).unwrap();

    assert!(!index.update_manifest(&editor, Some(path)).unwrap());

    editor.moniker = "contoso-edit".to_string();
    assert!(index.update_manifest(&editor, Some(path)).unwrap());
    let rowid = index
        .get_manifest_id_by_version("Contoso.Editor", "1.0", "")
        .unwrap()
        .unwrap();
    assert_eq!(
        index
            .get_property(rowid, ManifestProperty::Moniker)
            .unwrap()
            .as_deref(),
        Some("contoso-edit")
    );

    assert!(index.update_manifest(&editor, Some("moved/Contoso.Editor.yaml")).unwrap());
    assert!(index.check_consistency(true).unwrap());

    let err = index
        .update_manifest(&manifest("Contoso.Missing", "1.0"), None)
        .unwrap_err();
    assert!(matches!(err, IndexError::ManifestNotFound { .. }));
}

#[test]
fn test_search_query_filters_and_inclusions() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::DEFAULT);
    let mut viewer = manifest("Contoso.Viewer", "1.0");
    viewer.commands = vec!["view".to_string()];
    index.add_manifest(&manifest("Contoso.Editor", "1.0"), None).unwrap();
    index.add_manifest(&manifest("Contoso.Editor", "2.0"), None).unwrap();
    index.add_manifest(&viewer, None).unwrap();
    index.add_manifest(&manifest("Fabrikam.Tool", "3.1"), None).unwrap();

    let result = index
        .search(&SearchRequest::query(MatchType::Substring, "contoso"))
        .unwrap();
    assert_eq!(ids(&result), ["Contoso.Editor", "Contoso.Viewer"]);
    let matched = result.matches[0].matched.as_ref().unwrap();
    assert_eq!(matched.field, PackageMatchField::Id);

    let result = index
        .search(
            &SearchRequest::query(MatchType::Exact, "tool").with_filter(PackageMatchFilter::new(
                PackageMatchField::Id,
                MatchType::StartsWith,
                "Fabrikam",
            )),
        )
        .unwrap();
    assert_eq!(ids(&result), ["Fabrikam.Tool"]);

    let result = index
        .search(
            &SearchRequest::query(MatchType::Exact, "Contoso.Editor").with_inclusion(
                PackageMatchFilter::new(PackageMatchField::Command, MatchType::Exact, "view"),
            ),
        )
        .unwrap();
    assert_eq!(ids(&result), ["Contoso.Editor", "Contoso.Viewer"]);

    let result = index
        .search(&SearchRequest::default().with_filter(PackageMatchFilter::new(
            PackageMatchField::NormalizedName,
            MatchType::Exact,
            "Fabrikam Tool 3.1 (x64)",
        )))
        .unwrap();
    assert_eq!(ids(&result), ["Fabrikam.Tool"]);
}

#[test]
fn test_search_truncation() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::DEFAULT);
    for id in ["Contoso.Editor", "Contoso.Viewer", "Fabrikam.Tool"] {
        index.add_manifest(&manifest(id, "1.0"), None).unwrap();
    }

    let request = SearchRequest::default()
        .with_inclusion(PackageMatchFilter::new(
            PackageMatchField::Tag,
            MatchType::CaseInsensitive,
            "TOOL",
        ))
        .with_maximum_results(2);
    let result = index.search(&request).unwrap();
    assert!(result.truncated);
    assert_eq!(ids(&result), ["Contoso.Editor", "Contoso.Viewer"]);

    let result = index.search(&request.with_maximum_results(3)).unwrap();
    assert!(!result.truncated);
    assert_eq!(result.matches.len(), 3);
}

#[test]
fn test_unknown_filter_fields_are_ignored() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::new(1, 0));
    index.add_manifest(&manifest("Contoso.Editor", "1.0"), None).unwrap();

    let result = index
        .search(&SearchRequest::default().with_filter(PackageMatchFilter::new(
            PackageMatchField::ProductCode,
            MatchType::Exact,
            "{nothing}",
        )))
        .unwrap();
    assert_eq!(ids(&result), ["Contoso.Editor"]);
    let rowid = index
        .get_manifest_id_by_version("Contoso.Editor", "1.0", "")
        .unwrap()
        .unwrap();
    assert!(index
        .get_multi_property(rowid, PackageMatchField::ProductCode)
        .unwrap()
        .is_empty());
}

#[test]
fn test_unsupported_operation_reports_outer_version() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::new(1, 3));
    let rowid = index.add_manifest(&manifest("Contoso.Editor", "1.0"), None).unwrap();

    let err = index.installers_for(rowid).unwrap_err();
    assert!(matches!(
        err,
        IndexError::NotSupportedBySchema { operation: "get_installers", version }
            if version == SchemaVersion::new(1, 3)
    ));
    assert!(matches!(
        index.dependencies_for(rowid).unwrap_err(),
        IndexError::NotSupportedBySchema { .. }
    ));
}

#[test]
fn test_installers_dependencies_and_hash() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::DEFAULT);
    let mut editor = manifest("Contoso.Editor", "1.0");
    editor.dependencies.package_dependencies = vec![
        PackageDependency {
            package_identifier: "Contoso.Runtime".to_string(),
            minimum_version: Some("2.0".to_string()),
        },
        PackageDependency {
            package_identifier: "Contoso.Fonts".to_string(),
            minimum_version: None,
        },
    ];
    let rowid = index.add_manifest(&editor, None).unwrap();

    let installers = index.installers_for(rowid).unwrap();
    assert_eq!(
        installers,
        [IndexedInstaller {
            architecture: "x64".to_string(),
            installer_type: "msi".to_string(),
            scope: "machine".to_string(),
            locale: "en-US".to_string(),
        }]
    );

    let dependencies = index.dependencies_for(rowid).unwrap();
    assert_eq!(dependencies.len(), 2);
    assert_eq!(dependencies[0].package_identifier, "Contoso.Fonts");
    assert_eq!(dependencies[1].minimum_version.as_deref(), Some("2.0"));

    let hash = index.get_property(rowid, ManifestProperty::ManifestHash).unwrap();
    assert_eq!(hash, Some(manifest_hash(&editor).unwrap()));
    assert_eq!(
        index.get_property(rowid, ManifestProperty::ArpMinVersion).unwrap().as_deref(),
        Some("1.0")
    );
    assert!(index.get_property(rowid, ManifestProperty::IndexedAt).unwrap().is_some());
    assert_eq!(
        index
            .get_multi_property(rowid, PackageMatchField::UpgradeCode)
            .unwrap(),
        ["{Contoso.Editor-upgrade}"]
    );
}

#[test]
fn test_overlapping_arp_ranges_are_inconsistent() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::DEFAULT);
    let mut old = manifest("Contoso.Editor", "1.0");
    old.installers[0].apps_and_features_entries[0].display_version = "2.0".to_string();
    index.add_manifest(&old, None).unwrap();
    index.add_manifest(&manifest("Contoso.Editor", "2.0"), None).unwrap();
    assert!(!index.check_consistency(true).unwrap());
}

#[test]
fn test_packaging_every_version() {
    let dir = TempDir::new().unwrap();
    let registry = SchemaRegistry::standard();
    for version in registry.versions() {
        let mut index = create(&dir, version);
        index
            .add_manifest(&manifest("Contoso.Editor", "1.0"), Some("c/Contoso.Editor/1.0.yaml"))
            .unwrap();
        index
            .add_manifest(&manifest("Contoso.Editor", "2.0"), Some("c/Contoso.Editor/2.0.yaml"))
            .unwrap();
        index
            .add_manifest(&manifest("Fabrikam.Tool", "3.1"), Some("f/Fabrikam.Tool/3.1.yaml"))
            .unwrap();
        index.remove_manifest("Contoso.Editor", "1.0", "").unwrap();
        assert!(index.check_consistency(true).unwrap(), "{version} before packaging");

        index.prepare_for_packaging(true).unwrap();
        assert!(index.is_packaged());
        assert!(index.check_consistency(true).unwrap(), "{version} after packaging");

        let result = index
            .search(&SearchRequest::query(MatchType::CaseInsensitive, "fabrikam.tool"))
            .unwrap();
        assert_eq!(ids(&result), ["Fabrikam.Tool"], "{version}");

        let err = index
            .add_manifest(&manifest("Contoso.Viewer", "1.0"), None)
            .unwrap_err();
        assert!(matches!(err, IndexError::Packaged), "{version}");
        let path = index.path().to_path_buf();
        drop(index);

        let reopened = PackageIndex::open(&path, OpenDisposition::ReadWrite, &registry).unwrap();
        assert!(reopened.is_packaged());
    }
}

#[test]
fn test_migrate_backfills_deltas() {
    let dir = TempDir::new().unwrap();
    let registry = SchemaRegistry::standard();
    let mut index = create(&dir, SchemaVersion::new(1, 0));
    let editor = manifest("Contoso.Editor", "1.0");
    index.add_manifest(&editor, None).unwrap();

    index.migrate_to(SchemaVersion::new(1, 7), &registry).unwrap();
    assert_eq!(index.schema_version(), SchemaVersion::new(1, 7));
    assert_eq!(index.schema().version(), SchemaVersion::new(1, 7));
    assert!(index.check_consistency(true).unwrap());

    let result = index
        .search(&SearchRequest::default().with_filter(PackageMatchFilter::new(
            PackageMatchField::NormalizedName,
            MatchType::Exact,
            "Contoso Editor",
        )))
        .unwrap();
    assert_eq!(ids(&result), ["Contoso.Editor"]);

    let rowid = index
        .get_manifest_id_by_version("Contoso.Editor", "1.0", "")
        .unwrap()
        .unwrap();
    assert!(index.installers_for(rowid).unwrap().is_empty());
    assert_eq!(index.get_property(rowid, ManifestProperty::ManifestHash).unwrap(), None);

    // Migrated rows have no hash, so an update always rewrites them.
    assert!(index.update_manifest(&editor, None).unwrap());
    index.add_manifest(&manifest("Fabrikam.Tool", "3.1"), None).unwrap();
    assert!(index.check_consistency(true).unwrap());

    let path = index.path().to_path_buf();
    drop(index);
    let reopened = PackageIndex::open(&path, OpenDisposition::ReadWrite, &registry).unwrap();
    assert_eq!(reopened.schema_version(), SchemaVersion::new(1, 7));
}

#[test]
fn test_migration_limits() {
    let dir = TempDir::new().unwrap();
    let registry = SchemaRegistry::standard();
    let mut index = create(&dir, SchemaVersion::new(1, 4));

    let err = index.migrate_to(SchemaVersion::new(2, 0), &registry).unwrap_err();
    assert!(matches!(err, IndexError::MigrationNotSupported { .. }));
    let err = index.migrate_to(SchemaVersion::new(1, 2), &registry).unwrap_err();
    assert!(matches!(err, IndexError::MigrationNotSupported { .. }));
    let err = index.migrate_to(SchemaVersion::new(1, 12), &registry).unwrap_err();
    assert!(matches!(err, IndexError::SchemaNotSupported(_)));

    index.migrate_to(SchemaVersion::new(1, 4), &registry).unwrap();
    assert_eq!(index.schema_version(), SchemaVersion::new(1, 4));
}

#[test]
fn test_v2_package_rows_follow_versions() {
    let dir = TempDir::new().unwrap();
    let mut index = create(&dir, SchemaVersion::new(2, 0));
    index.add_manifest(&manifest("Contoso.Editor", "1.0"), None).unwrap();
    let mut newer = manifest("Contoso.Editor", "2.0");
    newer.package_name = "Contoso Editor Pro".to_string();
    let newest = index.add_manifest(&newer, Some("ignored.yaml")).unwrap();

    let versions = index.get_versions("Contoso.Editor").unwrap();
    let listed: Vec<&str> = versions.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(listed, ["2.0", "1.0"]);
    assert_eq!(
        index.get_property(newest, ManifestProperty::Name).unwrap().as_deref(),
        Some("Contoso Editor Pro")
    );
    assert_eq!(index.get_property(newest, ManifestProperty::RelativePath).unwrap(), None);

    let result = index
        .search(&SearchRequest::query(MatchType::Exact, "tool"))
        .unwrap();
    assert_eq!(ids(&result), ["Contoso.Editor"]);

    index.remove_manifest("Contoso.Editor", "2.0", "").unwrap();
    let latest: String = index
        .conn
        .query_row("SELECT latest_version FROM packages", [], |row| row.get(0))
        .unwrap();
    assert_eq!(latest, "1.0");
    assert!(index.check_consistency(true).unwrap());

    index.remove_manifest("Contoso.Editor", "1.0", "").unwrap();
    assert_eq!(count(&index, "packages"), 0);
    assert_eq!(count(&index, "tags"), 0);
    assert!(index.check_consistency(true).unwrap());

    let err = index.installers_for(newest).unwrap_err();
    assert!(matches!(err, IndexError::NotSupportedBySchema { .. }));
}

fn main() {
    println!("Run `cargo test -p manifest-compat` to execute manifest compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use bundlepub_protocol::{Platform, ProtocolError, VersionManifest};
    use bundlepub_publish::{BundleKind, BundleRecord, ManifestBuilder};
    use bundlepub_transfer::{remap_upload_path, version_file_path};
    use chrono::{DateTime, Utc};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Records whose paths and hashes match `assetbundlelist.json`.
    fn fixture_records() -> (Vec<BundleRecord>, Vec<BundleRecord>) {
        let fixture = load_fixture("assetbundlelist.json");
        let records: Vec<BundleRecord> = fixture["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| {
                let path = e["path"].as_str().unwrap();
                let (dir, name) = path.rsplit_once('/').unwrap();
                BundleRecord {
                    bundle_name: name.into(),
                    directory: dir.into(),
                    member_files: vec![path.into()],
                    output_path: PathBuf::from("Output/Android/build").join(path),
                    content_hash: e["hash"].as_str().unwrap().into(),
                    kind: if dir.starts_with("AssetPack") {
                        BundleKind::Packed
                    } else {
                        BundleKind::Individual
                    },
                }
            })
            .collect();
        records
            .into_iter()
            .partition(|r| r.kind == BundleKind::Individual)
    }

    #[test]
    fn fixture_roundtrip() {
        let fixture = load_fixture("assetbundlelist.json");
        let manifest = VersionManifest::from_json(&read_fixture("assetbundlelist.json")).unwrap();
        let reserialized: serde_json::Value =
            serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
    }

    #[test]
    fn fixture_entry_order_preserved() {
        let manifest = VersionManifest::from_json(&read_fixture("assetbundlelist.json")).unwrap();
        let paths: Vec<&str> = manifest.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Asset/bgm.unity3d",
                "Asset/ui/title.unity3d",
                "AssetPack/chara/hero.unity3d",
            ]
        );
    }

    #[test]
    fn fixture_created_at_is_rfc3339() {
        let manifest = VersionManifest::from_json(&read_fixture("assetbundlelist.json")).unwrap();
        let expected: DateTime<Utc> = "2026-10-19T08:30:00Z".parse().unwrap();
        assert_eq!(manifest.created_at, expected);
    }

    #[test]
    fn fixture_without_entries_is_empty() {
        let manifest =
            VersionManifest::from_json(&read_fixture("assetbundlelist_empty.json")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn fixture_duplicate_paths_rejected() {
        let result = VersionManifest::from_json(&read_fixture("assetbundlelist_duplicate.json"));
        assert!(matches!(result, Err(ProtocolError::DuplicatePath(p)) if p == "Asset/bgm.unity3d"));
    }

    #[test]
    fn builder_output_matches_fixture() {
        let (individual, packed) = fixture_records();
        let created_at: DateTime<Utc> = "2026-10-19T08:30:00Z".parse().unwrap();

        let manifest = ManifestBuilder::new("Output/Android").build(created_at, &individual, &packed);
        let built: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert_eq!(built, load_fixture("assetbundlelist.json"));
    }

    #[test]
    fn remote_layout() {
        assert_eq!(version_file_path(Platform::Windows), "StandaloneWindows/assetbundlelist.json");
        assert_eq!(version_file_path(Platform::Ios), "iOS/assetbundlelist.json");
        assert_eq!(
            remap_upload_path("Output/Android/build/x/y.bundle", Platform::Android),
            "Android/build/x/y.bundle"
        );
        assert_eq!(
            remap_upload_path("Output/Android/build/x/y.bundle", Platform::Ios),
            "iOS/build/x/y.bundle"
        );
    }
}

//! Source tree scanning and build-output listing.
//!
//! The catalog groups source files into bundles: every file under the
//! asset directory becomes its own bundle, and every directory under the
//! pack directory whose name carries the pack marker becomes one bundle
//! holding all files beneath it. Directory entries are visited in name
//! order so the grouping, and therefore the manifest, is reproducible.

use std::path::{Path, PathBuf};

use bundlepub_protocol::constants::{BUILD_DIR, UPLOAD_EXCLUDED_SUFFIXES};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PublishError;
use crate::types::{BundleGroup, BundleKind};

/// Naming rules for the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// Directory (relative to the source root) of individually bundled files.
    pub asset_dir: String,
    /// Directory (relative to the source root) searched for packed bundles.
    pub pack_dir: String,
    /// Directory-name marker that turns a directory into one packed bundle.
    pub pack_marker: String,
    /// Extension appended to every bundle name.
    pub bundle_extension: String,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            asset_dir: "Asset".into(),
            pack_dir: "AssetPack".into(),
            pack_marker: "Pack_".into(),
            bundle_extension: ".unity3d".into(),
        }
    }
}

/// Bundle groups found in a source tree, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCatalog {
    pub individual: Vec<BundleGroup>,
    pub packed: Vec<BundleGroup>,
}

impl AssetCatalog {
    /// Walks `source_root` and groups its files into bundles.
    ///
    /// A missing asset or pack directory contributes no groups.
    pub fn scan(source_root: &Path, options: &CatalogOptions) -> Result<Self, PublishError> {
        let mut catalog = AssetCatalog::default();

        if source_root.join(&options.asset_dir).is_dir() {
            collect_individual(source_root, &options.asset_dir, options, &mut catalog.individual)?;
        } else {
            debug!(dir = %options.asset_dir, "no asset directory");
        }

        if source_root.join(&options.pack_dir).is_dir() {
            collect_packed(source_root, &options.pack_dir, options, &mut catalog.packed)?;
        } else {
            debug!(dir = %options.pack_dir, "no pack directory");
        }

        debug!(
            individual = catalog.individual.len(),
            packed = catalog.packed.len(),
            "catalog scan complete"
        );
        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.individual.is_empty() && self.packed.is_empty()
    }
}

fn collect_individual(
    root: &Path,
    rel_dir: &str,
    options: &CatalogOptions,
    out: &mut Vec<BundleGroup>,
) -> Result<(), PublishError> {
    let (files, dirs) = read_sorted(&root.join(rel_dir))?;

    for name in files {
        let Some(stem) = Path::new(&name).file_stem().map(|s| s.to_string_lossy()) else {
            continue;
        };
        out.push(BundleGroup {
            directory: rel_dir.to_string(),
            bundle_name: format!("{stem}{}", options.bundle_extension),
            member_files: vec![format!("{rel_dir}/{name}")],
            kind: BundleKind::Individual,
        });
    }

    for name in dirs {
        collect_individual(root, &format!("{rel_dir}/{name}"), options, out)?;
    }
    Ok(())
}

fn collect_packed(
    root: &Path,
    rel_dir: &str,
    options: &CatalogOptions,
    out: &mut Vec<BundleGroup>,
) -> Result<(), PublishError> {
    let (_, dirs) = read_sorted(&root.join(rel_dir))?;

    for name in dirs {
        let sub = format!("{rel_dir}/{name}");
        if name.contains(&options.pack_marker) {
            let mut members = Vec::new();
            collect_pack_members(root, &sub, &mut members)?;
            out.push(BundleGroup {
                directory: rel_dir.to_string(),
                bundle_name: format!(
                    "{}{}",
                    name.replace(&options.pack_marker, ""),
                    options.bundle_extension
                ),
                member_files: members,
                kind: BundleKind::Packed,
            });
        } else {
            collect_packed(root, &sub, options, out)?;
        }
    }
    Ok(())
}

fn collect_pack_members(
    root: &Path,
    rel_dir: &str,
    out: &mut Vec<String>,
) -> Result<(), PublishError> {
    let (files, dirs) = read_sorted(&root.join(rel_dir))?;
    out.extend(files.into_iter().map(|name| format!("{rel_dir}/{name}")));
    for name in dirs {
        collect_pack_members(root, &format!("{rel_dir}/{name}"), out)?;
    }
    Ok(())
}

/// Returns (file names, directory names) of `dir`, sorted, without
/// `.meta` sidecars.
fn read_sorted(dir: &Path) -> Result<(Vec<String>, Vec<String>), PublishError> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            dirs.push(name);
        } else if metadata.is_file() && !name.ends_with(".meta") {
            files.push(name);
        }
    }

    files.sort();
    dirs.sort();
    Ok((files, dirs))
}

/// Lists the files under `<output_root>/build` that should be uploaded.
///
/// Build side files ending in `.manifest`, `.json` or `.meta` are skipped. Paths
/// use `/` separators and are sorted; a missing build directory yields
/// an empty list.
pub fn list_upload_files(output_root: &Path) -> Result<Vec<PathBuf>, PublishError> {
    let build_root = output_root.join(BUILD_DIR);
    let mut files = Vec::new();
    if build_root.is_dir() {
        walk_files(&build_root, &mut files)?;
    }

    let mut files: Vec<PathBuf> = files
        .into_iter()
        .filter(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            !UPLOAD_EXCLUDED_SUFFIXES
                .iter()
                .any(|suffix| name.ends_with(suffix))
        })
        .map(|p| PathBuf::from(p.to_string_lossy().replace('\\', "/")))
        .collect();
    files.sort();
    Ok(files)
}

fn walk_files(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), PublishError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            walk_files(&path, files)?;
        } else if metadata.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_source_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("Asset/ui")).unwrap();
        fs::write(root.join("Asset/bgm.ogg"), b"BGM").unwrap();
        fs::write(root.join("Asset/bgm.ogg.meta"), b"META").unwrap();
        fs::write(root.join("Asset/ui/title.png"), b"TITLE").unwrap();
        fs::write(root.join("Asset/ui/button.png"), b"BUTTON").unwrap();

        fs::create_dir_all(root.join("AssetPack/chara/Pack_hero/anim")).unwrap();
        fs::write(root.join("AssetPack/chara/Pack_hero/hero.fbx"), b"MESH").unwrap();
        fs::write(root.join("AssetPack/chara/Pack_hero/anim/run.anim"), b"RUN").unwrap();
        fs::create_dir_all(root.join("AssetPack/Pack_empty")).unwrap();

        dir
    }

    #[test]
    fn individual_files_become_bundles() {
        let dir = create_source_tree();
        let catalog = AssetCatalog::scan(dir.path(), &CatalogOptions::default()).unwrap();

        let paths: Vec<String> = catalog.individual.iter().map(|g| g.bundle_path()).collect();
        assert_eq!(
            paths,
            vec![
                "Asset/bgm.unity3d",
                "Asset/ui/button.unity3d",
                "Asset/ui/title.unity3d",
            ]
        );
        assert_eq!(catalog.individual[0].member_files, vec!["Asset/bgm.ogg"]);
        assert!(catalog.individual.iter().all(|g| g.kind == BundleKind::Individual));
    }

    #[test]
    fn marked_directories_become_packed_bundles() {
        let dir = create_source_tree();
        let catalog = AssetCatalog::scan(dir.path(), &CatalogOptions::default()).unwrap();

        assert_eq!(catalog.packed.len(), 2);

        let empty = &catalog.packed[0];
        assert_eq!(empty.bundle_path(), "AssetPack/empty.unity3d");
        assert!(empty.member_files.is_empty());

        let hero = &catalog.packed[1];
        assert_eq!(hero.bundle_path(), "AssetPack/chara/hero.unity3d");
        assert_eq!(
            hero.member_files,
            vec![
                "AssetPack/chara/Pack_hero/hero.fbx",
                "AssetPack/chara/Pack_hero/anim/run.anim",
            ]
        );
        assert_eq!(hero.kind, BundleKind::Packed);
    }

    #[test]
    fn missing_directories_yield_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let catalog = AssetCatalog::scan(dir.path(), &CatalogOptions::default()).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn upload_list_skips_side_files() {
        let dir = TempDir::new().unwrap();
        let build = dir.path().join("build/ui");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("title.unity3d"), b"B").unwrap();
        fs::write(build.join("title.unity3d.manifest"), b"M").unwrap();
        fs::write(dir.path().join("build/catalog.json"), b"{}").unwrap();
        fs::write(dir.path().join("build/a.unity3d"), b"A").unwrap();
        fs::write(dir.path().join("assetbundlelist.json"), b"{}").unwrap();

        let files = list_upload_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["build/a.unity3d", "build/ui/title.unity3d"]);
    }

    #[test]
    fn upload_list_keeps_bundles_with_dotted_stems() {
        let dir = TempDir::new().unwrap();
        let build = dir.path().join("build/Asset");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("config.json.unity3d"), b"B").unwrap();
        fs::write(build.join("config.json.unity3d.manifest"), b"M").unwrap();
        fs::write(build.join("shader.meta.unity3d"), b"S").unwrap();
        fs::write(build.join("shader.meta.unity3d.meta"), b"X").unwrap();

        let files = list_upload_files(dir.path()).unwrap();
        let names: Vec<&str> = files
            .iter()
            .filter_map(|p| p.file_name()?.to_str())
            .collect();
        assert_eq!(names, vec!["config.json.unity3d", "shader.meta.unity3d"]);
    }

    #[test]
    fn upload_list_missing_build_dir() {
        let dir = TempDir::new().unwrap();
        assert!(list_upload_files(dir.path()).unwrap().is_empty());
    }
}

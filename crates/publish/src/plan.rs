//! Catalog → build input filtering and build output → bundle records.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use bundlepub_protocol::Platform;
use tracing::warn;

use crate::backend::BundleSpec;
use crate::catalog::AssetCatalog;
use crate::error::{GroupingError, PublishError};
use crate::types::{BundleGroup, BundleRecord};

/// Bundle groups that will actually be built, split the same way as
/// the catalog, plus the groups that were dropped.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    pub individual: Vec<BundleGroup>,
    pub packed: Vec<BundleGroup>,
    pub skipped: Vec<GroupingError>,
}

impl BuildPlan {
    /// Drops empty groups and repeated bundle paths, warning once for each.
    pub fn from_catalog(catalog: &AssetCatalog) -> Self {
        let mut plan = BuildPlan::default();
        let mut seen = HashSet::new();

        for (groups, out) in [
            (&catalog.individual, &mut plan.individual),
            (&catalog.packed, &mut plan.packed),
        ] {
            for group in groups {
                let path = group.bundle_path();
                if group.member_files.is_empty() {
                    warn!(bundle = %path, "bundle group is empty, skipping");
                    plan.skipped.push(GroupingError::Empty(path));
                } else if !seen.insert(path.clone()) {
                    warn!(bundle = %path, "bundle path produced twice, skipping");
                    plan.skipped.push(GroupingError::Duplicate(path));
                } else {
                    out.push(group.clone());
                }
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.individual.is_empty() && self.packed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.individual.len() + self.packed.len()
    }

    /// Build backend input, individual groups first.
    pub fn specs(&self) -> Vec<BundleSpec> {
        self.individual
            .iter()
            .chain(&self.packed)
            .map(|g| BundleSpec {
                name: g.bundle_path(),
                files: g.member_files.clone(),
            })
            .collect()
    }

    /// Pairs every planned group with its hash. A group the backend did
    /// not report is a build failure for the platform.
    pub fn attach_hashes(
        &self,
        platform: Platform,
        hashes: &HashMap<String, String>,
        bundle_root: &Path,
    ) -> Result<(Vec<BundleRecord>, Vec<BundleRecord>), PublishError> {
        let to_records = |groups: &[BundleGroup]| -> Result<Vec<BundleRecord>, PublishError> {
            groups
                .iter()
                .map(|g| -> Result<BundleRecord, PublishError> {
                    let path = g.bundle_path();
                    let hash = hashes.get(&path).ok_or_else(|| PublishError::Build {
                        platform,
                        message: format!("no hash reported for {path}"),
                    })?;
                    Ok(BundleRecord {
                        bundle_name: g.bundle_name.clone(),
                        directory: g.directory.clone(),
                        member_files: g.member_files.clone(),
                        output_path: bundle_root.join(&path),
                        content_hash: hash.clone(),
                        kind: g.kind,
                    })
                })
                .collect()
        };

        Ok((to_records(&self.individual)?, to_records(&self.packed)?))
    }
}

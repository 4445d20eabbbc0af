/// File name of the version manifest, both in the output root and on the
/// server.
pub const VERSION_FILE_NAME: &str = "assetbundlelist.json";

/// Directory under each platform output root that holds built bundles.
pub const BUILD_DIR: &str = "build";

/// Path anchor the remapper strips up to (last occurrence).
pub const BUILD_ANCHOR: &str = "build/";

/// Default number of asset transfers per scheduler batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Extensions of build side files never uploaded from a build directory.
/// Only the end of the file name is matched: `config.json.unity3d` is a
/// bundle.
pub const UPLOAD_EXCLUDED_SUFFIXES: [&str; 3] = [".manifest", ".json", ".meta"];

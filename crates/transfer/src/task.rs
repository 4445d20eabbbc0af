use std::path::{Path, PathBuf};

use bundlepub_protocol::Platform;
use tracing::{error, info};

use crate::TransferError;
use crate::remap::{join_url, remap_upload_path, version_file_path};
use crate::transport::{Credentials, Transport};

/// What a [`TransferTask`] uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    VersionFile,
    AssetFile,
}

/// Where the bytes of a [`TransferTask`] come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Literal manifest text.
    Text(String),
    /// A file read at execution time.
    File(PathBuf),
}

/// Lifecycle of a task: `Created → Executing → Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Executing,
    Done,
}

/// One upload of either the version manifest or a single bundle file.
///
/// A task runs exactly once. It ends `Done` whether the transfer
/// succeeded or failed; failures are logged and returned, never retried.
#[derive(Debug)]
pub struct TransferTask {
    url: String,
    payload: Payload,
    kind: TaskKind,
    state: TaskState,
}

impl TransferTask {
    /// Manifest upload to `{base}/{Segment}/assetbundlelist.json`.
    pub fn version_file(base_url: &str, platform: Platform, contents: impl Into<String>) -> Self {
        Self {
            url: join_url(base_url, &version_file_path(platform)),
            payload: Payload::Text(contents.into()),
            kind: TaskKind::VersionFile,
            state: TaskState::Created,
        }
    }

    /// Bundle upload to `{base}/{remapped path}`.
    pub fn asset_file(base_url: &str, platform: Platform, file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let remote = remap_upload_path(&file_path.to_string_lossy(), platform);
        Self {
            url: join_url(base_url, &remote),
            payload: Payload::File(file_path),
            kind: TaskKind::AssetFile,
            state: TaskState::Created,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == TaskState::Done
    }

    /// Local source file, if this is an asset upload.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::File(path) => Some(path),
            Payload::Text(_) => None,
        }
    }

    /// Performs the single transfer and marks the task done.
    pub async fn execute(
        &mut self,
        transport: &dyn Transport,
        credentials: &Credentials,
    ) -> Result<(), TransferError> {
        debug_assert_eq!(self.state, TaskState::Created, "transfer task reused");
        self.state = TaskState::Executing;

        let result = self.transfer(transport, credentials).await;
        match &result {
            Ok(()) => info!(url = %self.url, kind = ?self.kind, "upload succeeded"),
            Err(e) => error!(url = %self.url, kind = ?self.kind, error = %e, "error uploading file"),
        }

        self.state = TaskState::Done;
        result
    }

    async fn transfer(
        &self,
        transport: &dyn Transport,
        credentials: &Credentials,
    ) -> Result<(), TransferError> {
        let data = match &self.payload {
            Payload::Text(text) => text.clone().into_bytes(),
            Payload::File(path) => tokio::fs::read(path).await?,
        };
        transport.upload_bytes(&self.url, data, credentials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::UploadFuture;
    use std::sync::Mutex;

    struct RecordingTransport {
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn new(fail: bool) -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl Transport for RecordingTransport {
        fn upload_bytes<'a>(
            &'a self,
            url: &'a str,
            data: Vec<u8>,
            _credentials: &'a Credentials,
        ) -> UploadFuture<'a> {
            Box::pin(async move {
                self.uploads.lock().unwrap().push((url.to_string(), data));
                if self.fail {
                    Err(TransferError::Status {
                        url: url.to_string(),
                        status: 550,
                    })
                } else {
                    Ok(())
                }
            })
        }
    }

    fn creds() -> Credentials {
        Credentials::new("user", "password")
    }

    #[test]
    fn version_file_url() {
        let task = TransferTask::version_file("ftp://cdn/AssetBundles/", Platform::Ios, "{}");
        assert_eq!(task.url(), "ftp://cdn/AssetBundles/iOS/assetbundlelist.json");
        assert_eq!(task.kind(), TaskKind::VersionFile);
        assert_eq!(task.state(), TaskState::Created);
        assert!(task.source_path().is_none());
    }

    #[test]
    fn asset_file_url_is_remapped() {
        let task = TransferTask::asset_file(
            "https://cdn/AssetBundles",
            Platform::Android,
            "/work/AssetBundles/Android/build/ui/a.unity3d",
        );
        assert_eq!(task.url(), "https://cdn/AssetBundles/Android/build/ui/a.unity3d");
        assert_eq!(task.kind(), TaskKind::AssetFile);
    }

    #[tokio::test]
    async fn version_file_uploads_literal_text() {
        let transport = RecordingTransport::new(false);
        let mut task = TransferTask::version_file("https://cdn", Platform::Android, "MANIFEST");

        task.execute(&transport, &creds()).await.unwrap();

        assert!(task.is_done());
        let uploads = transport.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "https://cdn/Android/assetbundlelist.json");
        assert_eq!(uploads[0].1, b"MANIFEST");
    }

    #[tokio::test]
    async fn asset_file_uploads_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("build").join("a.unity3d");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, [0u8, 1, 2, 255]).unwrap();

        let transport = RecordingTransport::new(false);
        let mut task = TransferTask::asset_file("https://cdn", Platform::Ios, &file);
        task.execute(&transport, &creds()).await.unwrap();

        let uploads = transport.uploads.lock().unwrap();
        assert_eq!(uploads[0].0, "https://cdn/iOS/build/a.unity3d");
        assert_eq!(uploads[0].1, vec![0u8, 1, 2, 255]);
    }

    #[tokio::test]
    async fn failed_transfer_still_marks_done() {
        let transport = RecordingTransport::new(true);
        let mut task = TransferTask::version_file("https://cdn", Platform::Windows, "{}");

        let result = task.execute(&transport, &creds()).await;

        assert!(matches!(result, Err(TransferError::Status { status: 550, .. })));
        assert!(task.is_done());
    }

    #[tokio::test]
    async fn unreadable_file_is_a_failed_transfer() {
        let transport = RecordingTransport::new(false);
        let mut task =
            TransferTask::asset_file("https://cdn", Platform::Android, "/nonexistent/build/a.bin");

        let result = task.execute(&transport, &creds()).await;

        assert!(matches!(result, Err(TransferError::Io(_))));
        assert!(task.is_done());
        assert!(transport.uploads.lock().unwrap().is_empty());
    }
}

//! HTTP staging against a local fixture server, and the orchestrator's
//! cleanup guarantees with the real filesystem lock and stager.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use outpost_agent::application::ports::{ArtifactStager, NoticeStore, UpdateLock};
use outpost_agent::application::services::update::{UpdateOrchestrator, UpdatePorts};
use outpost_agent::domain::{DownloadError, UpdateError};
use outpost_agent::infra::feed::USER_AGENT;
use outpost_agent::infra::lock::FsUpdateLock;
use outpost_agent::infra::notice::FileNoticeStore;
use outpost_agent::infra::process::SystemLiveness;
use outpost_agent::infra::stager::{HttpArtifactStager, StagerSettings};
use outpost_common::{Release, ReleaseAsset};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::mocks::{FakeFeed, Journal, RecordingLauncher};

// ── Fixture server ────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Reply {
    Body(Vec<u8>),
    /// Chunked transfer, so the client cannot see the size up front.
    Chunked(Vec<u8>),
    Status(u16),
}

async fn serve(routes: HashMap<String, Reply>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&buf);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let reply = routes.get(&path).cloned().unwrap_or(Reply::Status(404));
                let _ = socket.write_all(&render(&reply)).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

fn render(reply: &Reply) -> Vec<u8> {
    match reply {
        Reply::Body(body) => {
            let mut out = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            out.extend_from_slice(body);
            out
        }
        Reply::Chunked(body) => {
            let mut out =
                b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
                    .to_vec();
            for piece in body.chunks(8) {
                out.extend_from_slice(format!("{:x}\r\n", piece.len()).as_bytes());
                out.extend_from_slice(piece);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"0\r\n\r\n");
            out
        }
        Reply::Status(code) => format!(
            "HTTP/1.1 {code} Fixture\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        )
        .into_bytes(),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

const TAG: &str = "v1.1.0";

fn routes(binary: Reply) -> HashMap<String, Reply> {
    HashMap::from([
        (
            format!("/o/r/{TAG}/deploy/install.sh"),
            Reply::Body(b"#!/bin/sh\n".to_vec()),
        ),
        (format!("/o/r/{TAG}/README.md"), Reply::Body(b"# outpost\n".to_vec())),
        ("/dl/outpost-linux-amd64".to_string(), binary),
    ])
}

fn release_at(base: &str) -> Release {
    Release {
        tag: TAG.to_string(),
        assets: vec![
            ReleaseAsset {
                name: "outpost-linux-arm64".to_string(),
                url: format!("{base}/dl/outpost-linux-arm64"),
            },
            ReleaseAsset {
                name: "outpost-linux-amd64".to_string(),
                url: format!("{base}/dl/outpost-linux-amd64"),
            },
        ],
        body: String::new(),
    }
}

fn settings(base: &str, staging: &Path, max_bytes: u64) -> StagerSettings {
    StagerSettings {
        staging_dir: staging.to_path_buf(),
        release_repo: "o/r".to_string(),
        raw_base_url: base.to_string(),
        aux_files: vec!["deploy/install.sh".to_string(), "README.md".to_string()],
        binary_name: "outpost".to_string(),
        max_bytes,
        per_file_timeout: Duration::from_secs(5),
        arch: "x86_64".to_string(),
    }
}

fn stager_with(settings: StagerSettings) -> HttpArtifactStager {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .no_proxy()
        .build()
        .unwrap();
    HttpArtifactStager::new(client, settings)
}

fn stager(base: &str, staging: &Path, max_bytes: u64) -> HttpArtifactStager {
    stager_with(settings(base, staging, max_bytes))
}

// ── Stager ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stage_fetches_manifest_and_matching_binary() {
    let base = serve(routes(Reply::Body(b"BINARY".to_vec()))).await;
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("staging");

    let staged = stager(&base, &staging, 1024)
        .stage(&release_at(&base))
        .await
        .unwrap();

    assert_eq!(staged.binary, staging.join("bin").join("outpost"));
    assert_eq!(std::fs::read(&staged.binary).unwrap(), b"BINARY");
    assert_eq!(
        std::fs::read_to_string(staging.join("files/deploy/install.sh")).unwrap(),
        "#!/bin/sh\n"
    );
    assert_eq!(staged.files.len(), 2);
}

#[tokio::test]
async fn test_stage_resets_previous_contents() {
    let base = serve(routes(Reply::Body(b"BINARY".to_vec()))).await;
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("staging");
    std::fs::create_dir_all(staging.join("files")).unwrap();
    std::fs::write(staging.join("files/stale.txt"), "old").unwrap();

    stager(&base, &staging, 1024)
        .stage(&release_at(&base))
        .await
        .unwrap();

    assert!(!staging.join("files/stale.txt").exists());
}

#[tokio::test]
async fn test_stage_rejects_declared_oversized_binary() {
    let base = serve(routes(Reply::Body(vec![0u8; 64]))).await;
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("staging");

    let err = stager(&base, &staging, 32)
        .stage(&release_at(&base))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::OversizedArtifact { limit: 32, .. }));
    assert!(!staging.join("bin/outpost").exists());
}

#[tokio::test]
async fn test_stage_stops_streaming_oversized_binary() {
    let base = serve(routes(Reply::Chunked(vec![7u8; 64]))).await;
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("staging");

    let err = stager(&base, &staging, 32)
        .stage(&release_at(&base))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::OversizedArtifact { .. }));
    assert!(!staging.join("bin/outpost").exists(), "partial binary left behind");
}

#[tokio::test]
async fn test_stage_unsupported_arch_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("staging");
    let unsupported = stager_with(StagerSettings {
        arch: "riscv64".to_string(),
        ..settings("http://127.0.0.1:9", &staging, 1024)
    });

    let err = unsupported
        .stage(&release_at("http://127.0.0.1:9"))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::UnsupportedArchitecture(a) if a == "riscv64"));
    assert!(!staging.exists());
}

// ── Orchestrator with real lock and stager ────────────────────────────────────

struct Real {
    _dir: TempDir,
    lock: Arc<FsUpdateLock>,
    notices: Arc<FileNoticeStore>,
    launcher: Arc<RecordingLauncher>,
    staging: std::path::PathBuf,
    orchestrator: Arc<UpdateOrchestrator>,
}

async fn real(binary: Reply) -> Real {
    let base = serve(routes(binary)).await;
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("staging");
    let lock = Arc::new(FsUpdateLock::new(
        dir.path().join("update.lock"),
        Arc::new(SystemLiveness),
    ));
    let notices = Arc::new(FileNoticeStore::with_path(
        dir.path().join("update-complete.json"),
    ));
    let launcher = Arc::new(RecordingLauncher::new(Journal::default()));
    let orchestrator = Arc::new(UpdateOrchestrator::new(
        "v1.0.0",
        UpdatePorts {
            feed: Arc::new(FakeFeed::serving(release_at(&base))),
            lock: lock.clone(),
            stager: Arc::new(stager(&base, &staging, 1024)),
            launcher: launcher.clone(),
            notices: notices.clone(),
        },
    ));
    Real {
        _dir: dir,
        lock,
        notices,
        launcher,
        staging,
        orchestrator,
    }
}

#[tokio::test]
async fn test_download_failure_leaves_lock_free_and_staging_empty() {
    let r = real(Reply::Status(404)).await;

    let err = r.orchestrator.execute(5).await.unwrap_err();

    assert!(matches!(
        err,
        UpdateError::Download(DownloadError::Http { status: 404, .. })
    ));
    assert!(!r.lock.path().exists(), "lock file left behind");
    assert!(!r.lock.is_in_progress());
    assert!(!r.staging.exists(), "staging not purged");
    assert!(r.notices.load().unwrap().is_none());
    assert!(r.launcher.calls().is_empty());
}

#[tokio::test]
async fn test_successful_update_hands_lock_to_script() {
    let r = real(Reply::Body(b"BINARY".to_vec())).await;

    r.orchestrator.execute(5).await.unwrap();

    assert_eq!(r.lock.owner(), Some(std::process::id()));
    assert!(r.lock.is_in_progress());
    assert!(r.staging.join("bin/outpost").exists());
    assert_eq!(r.launcher.calls().len(), 1);
    assert_eq!(r.notices.load().unwrap().unwrap().new_version, TAG);
}

//! Release asset selection and staging layout — pure functions.

use outpost_common::{Release, ReleaseAsset};

use crate::domain::error::DownloadError;

/// Subdirectory of the staging area holding the agent binary.
pub const STAGED_BINARY_DIR: &str = "bin";

/// Subdirectory of the staging area holding auxiliary manifest files.
pub const STAGED_FILES_DIR: &str = "files";

/// Sidecar files published next to binaries that must never be picked as one.
const SIDECAR_SUFFIXES: &[&str] = &[".sha256", ".sig", ".asc", ".minisig"];

/// Maps `std::env::consts::ARCH` to the tag used in release asset names.
///
/// # Errors
///
/// Returns [`DownloadError::UnsupportedArchitecture`] for architectures the
/// release pipeline does not build.
pub fn arch_tag(arch: &str) -> Result<&'static str, DownloadError> {
    match arch {
        "x86_64" => Ok("amd64"),
        "aarch64" => Ok("arm64"),
        "arm" => Ok("armv7"),
        other => Err(DownloadError::UnsupportedArchitecture(other.to_string())),
    }
}

/// Picks the one binary asset built for `arch`.
///
/// An asset matches when one of its `-`/`_`/`.` separated segments equals the
/// architecture tag, so `armv7` never matches `arm64` and vice versa.
///
/// # Errors
///
/// Fails with `UnsupportedArchitecture` or `AssetNotFound`.
pub fn select_binary_asset<'a>(
    release: &'a Release,
    arch: &str,
) -> Result<&'a ReleaseAsset, DownloadError> {
    let tag = arch_tag(arch)?;
    release
        .assets
        .iter()
        .filter(|a| !SIDECAR_SUFFIXES.iter().any(|s| a.name.ends_with(s)))
        .find(|a| a.name.split(['-', '_', '.']).any(|segment| segment == tag))
        .ok_or_else(|| DownloadError::AssetNotFound(tag.to_string()))
}

/// URL of an auxiliary file pinned to the release tag.
#[must_use]
pub fn aux_file_url(raw_base: &str, repo: &str, tag: &str, file: &str) -> String {
    format!("{}/{repo}/{tag}/{file}", raw_base.trim_end_matches('/'))
}

use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use nix::unistd::{Gid, Group, Uid, User};
use serde::Serialize;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;
use crate::core::render::ArtifactKind;

/// Result of committing one rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub changed: bool,
    /// xxh3 of the rendered content, hex.
    pub digest: String,
}

/// Resolved owner for rendered files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: Uid,
    pub gid: Gid,
}

impl Ownership {
    /// `None` unless running as root; chown is pointless otherwise.
    pub fn resolve(user: &str, group: &str) -> Result<Option<Self>, String> {
        if !Uid::effective().is_root() {
            return Ok(None);
        }
        let uid = User::from_name(user)
            .map_err(|e| format!("looking up user '{user}': {e}"))?
            .ok_or_else(|| format!("user '{user}' does not exist"))?
            .uid;
        let gid = Group::from_name(group)
            .map_err(|e| format!("looking up group '{group}': {e}"))?
            .ok_or_else(|| format!("group '{group}' does not exist"))?
            .gid;
        Ok(Some(Self { uid, gid }))
    }
}

pub fn digest(content: &[u8]) -> String {
    format!("{:016x}", xxh3_64(content))
}

/// Compares `content` with what is on disk at `path`. Touches nothing.
pub fn diff(kind: ArtifactKind, path: &Path, content: &[u8]) -> io::Result<ArtifactReport> {
    let digest = digest(content);
    let changed = match fs::read(path) {
        Ok(existing) => xxh3_64(&existing) != xxh3_64(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => return Err(e),
    };
    debug!(artifact = %kind, path = ?path, changed, digest = %digest, "artifact diffed");

    Ok(ArtifactReport {
        kind,
        path: path.to_path_buf(),
        changed,
        digest,
    })
}

/// Commits a diffed artifact. Changed content goes to a sibling temp file
/// that is renamed over the target, so a crash never leaves a half-written
/// artifact. Mode and owner are enforced either way. The parent directory
/// must already exist; it belongs to the installer.
pub fn commit(report: &ArtifactReport, content: &[u8], owner: Option<Ownership>) -> io::Result<()> {
    let mode = report.kind.mode();
    if report.changed {
        write_atomically(&report.path, content, mode, owner)
    } else {
        apply_attributes(&report.path, mode, owner)
    }
}

/// A restart owed to the service for configuration already on disk.
/// Present from the moment changed artifacts are committed until a service
/// pass succeeds, so a failed restart is retried by the next pass.
pub fn restart_pending(marker: &Path) -> bool {
    marker.is_file()
}

pub fn mark_restart_pending(marker: &Path) -> io::Result<()> {
    let mut file = File::create(marker)?;
    file.sync_all()
}

pub fn clear_restart_pending(marker: &Path) -> io::Result<()> {
    match fs::remove_file(marker) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn write_atomically(
    path: &Path,
    content: &[u8],
    mode: u32,
    owner: Option<Ownership>,
) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    {
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(content)?;
        tmp_file.sync_all()?;
    }
    apply_attributes(&tmp_path, mode, owner)?;
    fs::rename(&tmp_path, path)
}

fn apply_attributes(path: &Path, mode: u32, owner: Option<Ownership>) -> io::Result<()> {
    fs::set_permissions(path, Permissions::from_mode(mode))?;
    if let Some(owner) = owner {
        nix::unistd::chown(path, Some(owner.uid), Some(owner.gid))?;
    }
    Ok(())
}

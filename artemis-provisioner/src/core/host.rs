use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Identity of the host a pass runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    pub fqdn: String,
}

impl HostFacts {
    pub fn new(fqdn: impl Into<String>) -> Self {
        Self { fqdn: fqdn.into() }
    }

    /// Asks `hostname --fqdn` first and falls back to the kernel hostname.
    pub async fn discover() -> io::Result<Self> {
        if let Some(fqdn) = Self::resolve_fqdn().await {
            return Ok(Self::new(fqdn));
        }
        let name = nix::unistd::gethostname()?;
        let name = name
            .into_string()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not UTF-8"))?;
        debug!(hostname = %name, "falling back to kernel hostname");
        Ok(Self::new(name))
    }

    async fn resolve_fqdn() -> Option<String> {
        let mut cmd = Command::new("hostname");
        cmd.arg("--fqdn")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let output = timeout(Duration::from_secs(5), cmd.output()).await.ok()?.ok()?;
        if !output.status.success() {
            return None;
        }
        let fqdn = String::from_utf8(output.stdout).ok()?.trim().to_string();
        (!fqdn.is_empty()).then_some(fqdn)
    }
}

use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_NETWORK_INTERFACE: &str = "wlan0";
const UNKNOWN_DEVICE: &str = "unknown";

/// Hardware address of the network interface the agent publishes through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Read `/sys/class/net/<interface>/address`, falling back to `"unknown"`.
    pub fn from_interface(interface: &str) -> Self {
        let path = Path::new("/sys/class/net").join(interface).join("address");
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) if !contents.trim().is_empty() => Self(contents.trim().to_lowercase()),
            Ok(_) => {
                warn!(path = %path.display(), "Empty hardware address");
                Self::new(UNKNOWN_DEVICE)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read hardware address");
                Self::new(UNKNOWN_DEVICE)
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

use std::{collections::HashSet, net::IpAddr, path::Path};

use serde::Deserialize;

use crate::error::{DetectError, Result};

#[derive(Debug, Deserialize)]
struct AllowlistFile {
    allowed_ips: Vec<String>,
}

/// Caller addresses allowed to submit requests.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    allowed: HashSet<IpAddr>,
    open: bool,
}

impl AccessList {
    /// Admits every caller.
    pub fn open() -> Self {
        Self {
            allowed: HashSet::new(),
            open: true,
        }
    }

    pub fn from_ips<I, S>(ips: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = ips
            .into_iter()
            .map(|s| {
                let s = s.as_ref().trim();
                s.parse::<IpAddr>()
                    .map_err(|e| DetectError::Anyhow(anyhow::anyhow!("bad allowlist entry {s:?}: {e}")))
            })
            .collect::<Result<HashSet<_>>>()?;
        Ok(Self {
            allowed,
            open: false,
        })
    }

    /// Reads `{ "allowed_ips": [...] }`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file: AllowlistFile = serde_json::from_str(&text)?;
        let list = Self::from_ips(file.allowed_ips)?;
        log::info!("allowlist {}: {} addresses", path.display(), list.allowed.len());
        Ok(list)
    }

    pub fn check(&self, caller: &str) -> Result<()> {
        if self.open {
            return Ok(());
        }
        match caller.trim().parse::<IpAddr>() {
            Ok(ip) if self.allowed.contains(&ip) => Ok(()),
            _ => Err(DetectError::Forbidden("Forbidden".into())),
        }
    }
}

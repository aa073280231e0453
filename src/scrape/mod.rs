// Scrape module - turns console pages into discovered entities and stat lines
//
// This module provides the Appliance facade (one authenticated session plus
// the inventory repositories filled by discovery) and the StatSource trait
// that every stat producer implements, so `stats:all` can run them uniformly
// and in a fixed order.

use async_trait::async_trait;

use crate::client::SessionClient;
use crate::config::{Config, Generation};
use crate::error::Result;
use crate::repo::{Attrs, Repository};

pub mod dashboard;
pub mod disks;
pub mod ports;
pub mod volumes;

/// Item-key prefix every emitted stat shares.
///
/// The prefix is part of the downstream Zabbix template's item keys and
/// stays the same on every firmware generation; changing it would orphan
/// the items the server already has.
pub(crate) const KEY_PREFIX: &str = "qsan.sanos4";

/// One finished trap line: an item key and the value to report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatLine {
    /// Zabbix item key, e.g. `qsan.sanos4.volume.iops[db_RAID5_3.49TB]`
    pub key: String,
    /// Value as the console reported it, unit-converted where needed
    pub value: String,
}

impl StatLine {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        StatLine {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Authenticated appliance together with its discovered inventory
///
/// Construction logs in and runs volume and disk discovery, so every
/// method that joins stat pages against the inventory can rely on the
/// repositories being current for this run.
pub struct Appliance {
    client: SessionClient,

    /// Volume inventory in console page order
    pub volumes: Repository,

    /// Disk inventory of enclosure 0
    pub disks: Repository,

    /// FC port inventory; stays empty until `discover_ports` runs
    pub ports: Repository,
}

impl Appliance {
    /// Logs in to the appliance and discovers volumes and disks.
    ///
    /// FC ports are discovered lazily by [`Appliance::discover_ports`]:
    /// iSCSI-only models serve no FC page, and that must not break the
    /// methods that never look at ports.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = SessionClient::connect(config).await?;

        let mut appliance = Appliance {
            client,
            volumes: Repository::new(),
            disks: Repository::new(),
            ports: Repository::new(),
        };

        appliance.discover_volumes().await?;
        appliance.discover_disks().await?;

        Ok(appliance)
    }

    /// Firmware generation the session resolved to
    pub fn generation(&self) -> Generation {
        self.client.generation()
    }

    pub(crate) fn client(&self) -> &SessionClient {
        &self.client
    }
}

/// Trait implemented by every stat producer.
///
/// A source fetches one console stat page, joins it against the discovered
/// inventory and returns finished trap lines. Sources never write output
/// themselves; the caller buffers everything so a failing source suppresses
/// the whole invocation's output instead of leaving half a batch behind.
#[async_trait]
pub trait StatSource: Send + Sync {
    /// Short name for log lines ("VolumeStats", "StorageStats", ...).
    fn name(&self) -> &str;

    /// Fetches this source's stat page and renders its trap lines.
    async fn collect(&self, appliance: &Appliance) -> Result<Vec<StatLine>>;
}

/// All stat sources in the order `stats:all` emits them: per-volume
/// counters first, then the appliance-wide dashboard, then per-disk
/// counters. The order is load-bearing for anyone diffing sender batches.
pub fn stat_sources() -> Vec<Box<dyn StatSource>> {
    vec![
        Box::new(volumes::VolumeSource::new()),
        Box::new(dashboard::DashboardSource::new()),
        Box::new(disks::DiskSource::new()),
    ]
}

/// Reads a KB/s counter field and converts it to B/s.
pub(crate) fn kb_to_bytes(attrs: &Attrs, field: &str) -> Option<u64> {
    attrs.get(field)?.parse::<u64>().ok().map(|v| v * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_all_order_is_volumes_storage_disks() {
        let sources = stat_sources();
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["VolumeStats", "StorageStats", "DiskStats"]);
    }

    #[test]
    fn kb_counters_convert_to_bytes() {
        let mut attrs = Attrs::new();
        attrs.insert("tx_rate".to_string(), "2048".to_string());
        attrs.insert("bad".to_string(), "n/a".to_string());
        assert_eq!(kb_to_bytes(&attrs, "tx_rate"), Some(2_097_152));
        assert_eq!(kb_to_bytes(&attrs, "bad"), None);
        assert_eq!(kb_to_bytes(&attrs, "missing"), None);
    }
}

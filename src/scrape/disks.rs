// Disk scraping - enclosure inventory and per-disk monitor counters
//
// The disk inventory is a single page of <hdd> records for enclosure 0.
// The monitor page reports <disk_monitor_stats> records keyed by slot, not
// by disk id, so stats are joined back to the inventory through the slot
// attribute.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{kb_to_bytes, Appliance, StatLine, StatSource, KEY_PREFIX};
use crate::client::Page;
use crate::error::Result;
use crate::extract;
use crate::repo::{Attrs, Repository};

/// Fields a disk record must carry to be usable downstream; `model` is
/// deliberately not among them since F600Q-era firmware omits it
const REQUIRED_FIELDS: [&str; 3] = ["slot", "vendor", "serial"];

impl Appliance {
    /// Fills the disk repository from the enclosure 0 inventory page.
    pub(crate) async fn discover_disks(&mut self) -> Result<()> {
        let body = self.client.fetch(Page::DiskList).await?;
        let mut found = Repository::new();

        for (id, attrs) in parse_disk_records(&body) {
            found.insert(id, attrs);
        }

        info!("Discovered {} disk(s)", found.len());
        self.disks.replace_all(found);

        Ok(())
    }
}

/// Usable disk records from the inventory page, as `(id, attrs)`.
fn parse_disk_records(body: &str) -> Vec<(String, Attrs)> {
    let mut out = Vec::new();

    for record in extract::records(body, "hdd") {
        let mut attrs: Attrs = extract::fields(record).into_iter().collect();

        let Some(id) = attrs.remove("id") else {
            warn!("Skipping disk record without an id");
            continue;
        };
        if REQUIRED_FIELDS.iter().any(|field| !attrs.contains_key(*field)) {
            warn!("Skipping disk {}: record lacks one of {:?}", id, REQUIRED_FIELDS);
            continue;
        }

        out.push((id, attrs));
    }

    out
}

/// Item name a disk appears under in Zabbix,
/// e.g. `Slot_7_SEAGATE_ST3840FM0043_Z1X2C3`.
///
/// A missing model leaves its segment empty (`Slot_7_SEAGATE__Z1X2C3`).
/// The double underscore is what the downstream template's item keys were
/// built against, so it stays.
pub fn item_name(attrs: &Attrs) -> String {
    let slot = attrs.get("slot").map(String::as_str).unwrap_or("");
    let vendor = attrs.get("vendor").map(String::as_str).unwrap_or("");
    let model = attrs.get("model").map(String::as_str).unwrap_or("");
    let serial = attrs.get("serial").map(String::as_str).unwrap_or("");

    format!("Slot_{slot}_{vendor}_{model}_{serial}")
}

/// Per-disk counters from the monitor page
pub struct DiskSource;

impl DiskSource {
    pub fn new() -> Self {
        DiskSource
    }
}

impl Default for DiskSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatSource for DiskSource {
    fn name(&self) -> &str {
        "DiskStats"
    }

    /// Collects latency/thruput per disk.
    ///
    /// Disks whose stat record says `is_enabled` is not `Yes` are not
    /// being tracked by the appliance; one enable request listing every
    /// discovered slot is sent and the counters appear on the next run.
    async fn collect(&self, appliance: &Appliance) -> Result<Vec<StatLine>> {
        let body = appliance.client().fetch(Page::DiskStats).await?;
        let (lines, monitored) = parse_stats(&appliance.disks, &body);

        let unmonitored = appliance
            .disks
            .ids()
            .filter(|id| !monitored.contains(*id))
            .count();
        if unmonitored > 0 {
            info!(
                "{} of {} disk(s) are not monitored; enabling monitoring for all",
                unmonitored,
                appliance.disks.len()
            );
            let slots = slots_for_enable(&appliance.disks);
            appliance.client().enable_disk_monitoring(&slots).await?;
        }

        Ok(lines)
    }
}

/// Renders `<disk_monitor_stats>` records into trap lines.
///
/// Returns the lines plus the set of disk IDs whose record reports
/// `is_enabled` as `Yes`. Latency is passed through as the console
/// printed it (milliseconds); thruput arrives in KB/s and goes out in B/s.
fn parse_stats(disks: &Repository, body: &str) -> (Vec<StatLine>, HashSet<String>) {
    let mut lines = Vec::new();
    let mut monitored = HashSet::new();

    for record in extract::records(body, "disk_monitor_stats") {
        let attrs: Attrs = extract::fields(record).into_iter().collect();

        let Some(slot) = attrs.get("slot") else {
            continue;
        };
        let Some((id, disk)) = disks.find_by("slot", slot) else {
            warn!("Stat page reports unknown disk slot {}; skipping", slot);
            continue;
        };
        if attrs.get("is_enabled").is_some_and(|v| v == "Yes") {
            monitored.insert(id.to_string());
        }

        let name = item_name(disk);
        let Some(latency) = attrs.get("latency") else {
            warn!("Disk {} reports no latency; skipping", name);
            continue;
        };
        let Some(thruput) = kb_to_bytes(&attrs, "thruput") else {
            warn!("Disk {} reports an unusable thruput value; skipping", name);
            continue;
        };

        lines.push(StatLine::new(format!("{KEY_PREFIX}.disk.latency[{name}]"), latency.clone()));
        lines.push(StatLine::new(format!("{KEY_PREFIX}.disk.thruput[{name}]"), thruput.to_string()));
    }

    (lines, monitored)
}

/// Every discovered slot, in the lexical order the console's own UI posts
/// (slot 10 sorts before slot 2).
fn slots_for_enable(disks: &Repository) -> Vec<&str> {
    let mut slots: Vec<&str> = disks
        .iter()
        .filter_map(|(_, attrs)| attrs.get("slot").map(String::as_str))
        .collect();
    slots.sort_unstable();
    slots
}

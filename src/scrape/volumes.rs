// Volume scraping - paged inventory discovery and per-volume monitor counters
//
// The volume inventory page is paged: each page repeats the appliance-wide
// total in <vd_num> and carries a batch of <udv> records. Per-volume
// counters come from a separate monitor page of <volume_stats> records that
// only lists volumes the appliance is actually collecting counters for.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{kb_to_bytes, Appliance, StatLine, StatSource, KEY_PREFIX};
use crate::client::Page;
use crate::error::{AdapterError, Result};
use crate::extract;
use crate::repo::{Attrs, Repository};

/// Fields a volume record must carry to be usable downstream
const REQUIRED_FIELDS: [&str; 3] = ["name", "raid", "capacity"];

impl Appliance {
    /// Fills the volume repository from the paged inventory.
    ///
    /// Pages are fetched until the accumulated record count reaches the
    /// total the page itself reports in `<vd_num>`. A page that adds no
    /// new records ends the loop early with a warning, so an inconsistent
    /// total cannot keep the adapter looping.
    pub(crate) async fn discover_volumes(&mut self) -> Result<()> {
        let mut found = Repository::new();
        let mut page = 1;

        loop {
            let body = self.client.fetch(Page::VolumeList { page }).await?;
            let total = parse_volume_total(&body)?;

            let before = found.len();
            for (id, attrs) in parse_volume_records(&body) {
                found.insert(id, attrs);
            }

            if found.len() >= total {
                break;
            }
            if found.len() == before {
                warn!(
                    "Volume page {} added no records ({} of {} discovered); stopping early",
                    page,
                    found.len(),
                    total
                );
                break;
            }
            page += 1;
        }

        info!("Discovered {} volume(s)", found.len());
        self.volumes.replace_all(found);

        Ok(())
    }
}

/// Appliance-wide volume count from a volume inventory page.
fn parse_volume_total(body: &str) -> Result<usize> {
    extract::text(body, "vd_num")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AdapterError::Extraction {
            page: "vd_x.php",
            reason: "no usable <vd_num> element".to_string(),
        })
}

/// Usable volume records from one inventory page, as `(id, attrs)`.
///
/// Records without an id or without the fields the item name is built
/// from are skipped with a warning. The stray `<img>` markers the
/// firmware drops into records are filtered out here as well.
fn parse_volume_records(body: &str) -> Vec<(String, Attrs)> {
    let mut out = Vec::new();

    for record in extract::records(body, "udv") {
        let mut attrs: Attrs = extract::fields(record)
            .into_iter()
            .filter(|(name, _)| name != "img")
            .collect();

        let Some(id) = attrs.remove("id") else {
            warn!("Skipping volume record without an id");
            continue;
        };
        if REQUIRED_FIELDS.iter().any(|field| !attrs.contains_key(*field)) {
            warn!("Skipping volume {}: record lacks one of {:?}", id, REQUIRED_FIELDS);
            continue;
        }

        out.push((id, attrs));
    }

    out
}

/// Item name a volume appears under in Zabbix, e.g. `db_RAID5_3.49TB`.
///
/// Item keys allow no spaces: spaces inside the volume name become `-`,
/// spaces in the RAID level and capacity are removed.
pub fn item_name(attrs: &Attrs) -> String {
    let name = attrs.get("name").map(|v| v.replace(' ', "-")).unwrap_or_default();
    let raid = attrs.get("raid").map(|v| v.replace(' ', "")).unwrap_or_default();
    let capacity = attrs.get("capacity").map(|v| v.replace(' ', "")).unwrap_or_default();

    format!("{name}_{raid}_{capacity}")
}

/// Per-volume counters from the monitor page
pub struct VolumeSource;

impl VolumeSource {
    pub fn new() -> Self {
        VolumeSource
    }
}

impl Default for VolumeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatSource for VolumeSource {
    fn name(&self) -> &str {
        "VolumeStats"
    }

    /// Collects iops/read/write per volume.
    ///
    /// Volumes that are discovered but absent from the monitor page are
    /// not being tracked by the appliance yet; in that case one enable
    /// request listing every discovered volume is sent, and the counters
    /// show up on the next scheduled run.
    async fn collect(&self, appliance: &Appliance) -> Result<Vec<StatLine>> {
        let body = appliance.client().fetch(Page::VolumeStats).await?;
        let (lines, reporting) = parse_stats(&appliance.volumes, &body);

        let silent = appliance
            .volumes
            .ids()
            .filter(|id| !reporting.contains(*id))
            .count();
        if silent > 0 {
            info!(
                "{} of {} volume(s) report no counters; enabling monitoring for all",
                silent,
                appliance.volumes.len()
            );
            let all: Vec<&str> = appliance.volumes.ids().collect();
            appliance.client().enable_volume_monitoring(&all).await?;
        }

        Ok(lines)
    }
}

/// Renders `<volume_stats>` records into trap lines.
///
/// Returns the lines plus the set of volume IDs that reported at all,
/// which the caller compares against discovery. Rates arrive in KB/s and
/// go out in B/s; the iops value is passed through untouched.
fn parse_stats(volumes: &Repository, body: &str) -> (Vec<StatLine>, HashSet<String>) {
    let mut lines = Vec::new();
    let mut reporting = HashSet::new();

    for record in extract::records(body, "volume_stats") {
        let attrs: Attrs = extract::fields(record).into_iter().collect();

        let Some(id) = attrs.get("vd_id") else {
            continue;
        };
        let Some(volume) = volumes.get(id) else {
            warn!("Stat page reports unknown volume id {}; skipping", id);
            continue;
        };
        reporting.insert(id.clone());

        let name = item_name(volume);
        let Some(iops) = attrs.get("iops_rate") else {
            warn!("Volume {} reports no iops_rate; skipping", name);
            continue;
        };
        let (Some(read), Some(write)) = (kb_to_bytes(&attrs, "tx_rate"), kb_to_bytes(&attrs, "rx_rate"))
        else {
            warn!("Volume {} reports unusable rate values; skipping", name);
            continue;
        };

        lines.push(StatLine::new(format!("{KEY_PREFIX}.volume.iops[{name}]"), iops.clone()));
        lines.push(StatLine::new(format!("{KEY_PREFIX}.volume.read[{name}]"), read.to_string()));
        lines.push(StatLine::new(format!("{KEY_PREFIX}.volume.write[{name}]"), write.to_string()));
    }

    (lines, reporting)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = "<response><vd_num>3</vd_num>\
        <udv><id>1</id><img/>no<name>ssd pool</name><raid>RAID 10</raid>\
        <capacity>10.48 TB</capacity><status>Online</status></udv>\
        <udv><id>2</id><name>db</name><raid>RAID 5</raid><capacity>3.49 TB</capacity></udv>\
        <udv><id>3</id><name>broken</name><capacity>1 TB</capacity></udv>\
        </response>";

    fn discovered() -> Repository {
        let mut repo = Repository::new();
        for (id, attrs) in parse_volume_records(INVENTORY) {
            repo.insert(id, attrs);
        }
        repo
    }

    #[test]
    fn records_missing_required_fields_are_skipped() {
        let records = parse_volume_records(INVENTORY);
        let ids: Vec<&str> = records.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn record_attrs_keep_extra_fields_but_not_img() {
        let records = parse_volume_records(INVENTORY);
        let attrs = &records[0].1;
        assert_eq!(attrs.get("status").map(String::as_str), Some("Online"));
        assert!(!attrs.contains_key("img"));
        assert!(!attrs.contains_key("id"));
    }

    #[test]
    fn total_comes_from_vd_num() {
        assert_eq!(parse_volume_total(INVENTORY).unwrap(), 3);
        let err = parse_volume_total("<response></response>").unwrap_err();
        assert!(matches!(err, AdapterError::Extraction { page: "vd_x.php", .. }));
    }

    #[test]
    fn item_names_carry_no_spaces() {
        let repo = discovered();
        assert_eq!(item_name(repo.get("1").unwrap()), "ssd-pool_RAID10_10.48TB");
        assert_eq!(item_name(repo.get("2").unwrap()), "db_RAID5_3.49TB");
    }

    #[test]
    fn stats_convert_rates_and_keep_iops_raw() {
        let body = "<response><volume_stats><vd_id>1</vd_id><iops_rate>1200</iops_rate>\
            <tx_rate>2048</tx_rate><rx_rate>512</rx_rate></volume_stats></response>";
        let (lines, reporting) = parse_stats(&discovered(), body);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].key, "qsan.sanos4.volume.iops[ssd-pool_RAID10_10.48TB]");
        assert_eq!(lines[0].value, "1200");
        assert_eq!(lines[1].key, "qsan.sanos4.volume.read[ssd-pool_RAID10_10.48TB]");
        assert_eq!(lines[1].value, "2097152");
        assert_eq!(lines[2].key, "qsan.sanos4.volume.write[ssd-pool_RAID10_10.48TB]");
        assert_eq!(lines[2].value, "524288");
        assert!(reporting.contains("1"));
        assert!(!reporting.contains("2"));
    }

    #[test]
    fn stats_for_unknown_volumes_are_dropped() {
        let body = "<response><volume_stats><vd_id>99</vd_id><iops_rate>5</iops_rate>\
            <tx_rate>1</tx_rate><rx_rate>1</rx_rate></volume_stats></response>";
        let (lines, reporting) = parse_stats(&discovered(), body);
        assert!(lines.is_empty());
        assert!(reporting.is_empty());
    }

    #[test]
    fn unparseable_rates_skip_the_record_but_count_as_reporting() {
        let body = "<response><volume_stats><vd_id>2</vd_id><iops_rate>5</iops_rate>\
            <tx_rate>n/a</tx_rate><rx_rate>1</rx_rate></volume_stats></response>";
        let (lines, reporting) = parse_stats(&discovered(), body);
        assert!(lines.is_empty());
        assert!(reporting.contains("2"));
    }
}

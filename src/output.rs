// Output module - renders discovery documents and trap lines
//
// Everything renders into a caller-supplied writer. The binary hands in a
// byte buffer and copies it to stdout only after the whole method
// succeeded, so a run that dies halfway leaves nothing behind for the trap
// sender to pick up.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use tracing::debug;

use crate::config::Method;
use crate::scrape::dashboard::DashboardSource;
use crate::scrape::disks::DiskSource;
use crate::scrape::volumes::VolumeSource;
use crate::scrape::{disks, ports, stat_sources, volumes, Appliance, StatLine, StatSource};

/// LLD macro the volume discovery rule binds
pub const VOLUME_MACRO: &str = "{#VOLUME}";
/// LLD macro the disk discovery rule binds
pub const DISK_MACRO: &str = "{#DISK}";
/// LLD macro the FC port discovery rule binds
pub const PORT_MACRO: &str = "{#PORT}";

/// Low-level-discovery document in the shape the Zabbix server expects
#[derive(Debug, Serialize)]
pub struct DiscoveryDoc {
    pub data: Vec<BTreeMap<String, String>>,
}

/// Builds a discovery document binding one macro to each item name.
pub fn discovery_doc(macro_name: &str, names: impl IntoIterator<Item = String>) -> DiscoveryDoc {
    DiscoveryDoc {
        data: names
            .into_iter()
            .map(|name| BTreeMap::from([(macro_name.to_string(), name)]))
            .collect(),
    }
}

/// Writes the discovery JSON pretty-printed with 2-space indentation,
/// followed by a newline.
pub fn write_discovery(out: &mut impl Write, doc: &DiscoveryDoc) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    writeln!(out, "{json}")?;

    Ok(())
}

/// Writes trap lines in the three-column form zabbix_sender reads:
/// host, item key and value, separated by tabs.
pub fn write_stats(out: &mut impl Write, zhost: &str, lines: &[StatLine]) -> anyhow::Result<()> {
    for line in lines {
        writeln!(out, "{}\t{}\t{}", zhost, line.key, line.value)?;
    }

    Ok(())
}

/// Runs one method against the appliance and renders its output.
///
/// `stats:all` collects every source in the fixed volumes, storage, disks
/// order and concatenates their lines. `discovery:ports` triggers the lazy
/// FC port fetch first; the other methods work entirely from the inventory
/// discovered at connect time.
pub async fn render_method(
    appliance: &mut Appliance,
    method: Method,
    zhost: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match method {
        Method::DiscoveryVolumes => {
            let names = appliance
                .volumes
                .iter()
                .map(|(_, attrs)| volumes::item_name(attrs));
            write_discovery(out, &discovery_doc(VOLUME_MACRO, names))?;
        }
        Method::DiscoveryDisks => {
            let names = appliance
                .disks
                .iter()
                .map(|(_, attrs)| disks::item_name(attrs));
            write_discovery(out, &discovery_doc(DISK_MACRO, names))?;
        }
        Method::DiscoveryPorts => {
            appliance.discover_ports().await?;
            let names = appliance
                .ports
                .iter()
                .map(|(id, attrs)| ports::item_name(id, attrs));
            write_discovery(out, &discovery_doc(PORT_MACRO, names))?;
        }
        Method::StatsVolumes => {
            let lines = VolumeSource::new().collect(appliance).await?;
            write_stats(out, zhost, &lines)?;
        }
        Method::StatsStorage => {
            let lines = DashboardSource::new().collect(appliance).await?;
            write_stats(out, zhost, &lines)?;
        }
        Method::StatsDisks => {
            let lines = DiskSource::new().collect(appliance).await?;
            write_stats(out, zhost, &lines)?;
        }
        Method::StatsAll => {
            for source in stat_sources() {
                debug!("Collecting {}", source.name());
                let lines = source.collect(appliance).await?;
                write_stats(out, zhost, &lines)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_json_is_pretty_printed() {
        let doc = discovery_doc(VOLUME_MACRO, vec!["db_RAID5_3.49TB".to_string()]);
        let mut out = Vec::new();
        write_discovery(&mut out, &doc).unwrap();

        let expected = "{\n  \"data\": [\n    {\n      \"{#VOLUME}\": \"db_RAID5_3.49TB\"\n    }\n  ]\n}\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn empty_discovery_still_renders_a_document() {
        let doc = discovery_doc(DISK_MACRO, Vec::new());
        let mut out = Vec::new();
        write_discovery(&mut out, &doc).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"data\": []\n}\n");
    }

    #[test]
    fn stat_lines_are_tab_separated_triples() {
        let lines = vec![
            StatLine::new("qsan.sanos4.storage.iops", "10764"),
            StatLine::new("qsan.sanos4.storage.read", "282591232"),
        ];
        let mut out = Vec::new();
        write_stats(&mut out, "san-01", &lines).unwrap();

        let expected = "san-01\tqsan.sanos4.storage.iops\t10764\n\
                        san-01\tqsan.sanos4.storage.read\t282591232\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn no_lines_means_no_output() {
        let mut out = Vec::new();
        write_stats(&mut out, "san-01", &[]).unwrap();
        assert!(out.is_empty());
    }
}

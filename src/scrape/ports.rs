// FC port scraping - Fibre Channel port inventory
//
// Ports are discovery-only: no supported firmware serves a stat page for
// them. The inventory is fetched lazily, only when a port method runs,
// because iSCSI-only models do not serve the FC page at all and the other
// methods must keep working there.

use tracing::{info, warn};

use super::Appliance;
use crate::client::Page;
use crate::error::Result;
use crate::extract;
use crate::repo::{Attrs, Repository};

impl Appliance {
    /// Fills the FC port repository from the port list page.
    pub(crate) async fn discover_ports(&mut self) -> Result<()> {
        let body = self.client.fetch(Page::PortList).await?;
        let mut found = Repository::new();

        for (id, attrs) in parse_port_records(&body) {
            found.insert(id, attrs);
        }

        info!("Discovered {} FC port(s)", found.len());
        self.ports.replace_all(found);

        Ok(())
    }
}

/// Usable FC port records from the port list page, as `(id, attrs)`.
fn parse_port_records(body: &str) -> Vec<(String, Attrs)> {
    let mut out = Vec::new();

    for record in extract::records(body, "fc_port") {
        let mut attrs: Attrs = extract::fields(record).into_iter().collect();

        let Some(id) = attrs.remove("id") else {
            warn!("Skipping FC port record without an id");
            continue;
        };
        if !attrs.contains_key("wwn") {
            warn!("Skipping FC port {}: record lacks a wwn", id);
            continue;
        }

        out.push((id, attrs));
    }

    out
}

/// Item name an FC port appears under in Zabbix,
/// e.g. `Port_0_2100001378AC0201`.
pub fn item_name(id: &str, attrs: &Attrs) -> String {
    let wwn = attrs.get("wwn").map(String::as_str).unwrap_or("");

    format!("Port_{id}_{wwn}")
}

// Dashboard scraping - appliance-wide counters from the monitor dashboard
//
// The dashboard page exists on SANOS4 consoles only. It reports one
// aggregate IOPS figure plus tx/rx rates in MB/s, all formatted for a
// human (thousands separators included), so values are de-formatted here
// before they go out as trap lines.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Appliance, StatLine, StatSource, KEY_PREFIX};
use crate::client::Page;
use crate::error::{AdapterError, Result};
use crate::extract;

/// Appliance-wide counters from the dashboard page
pub struct DashboardSource;

impl DashboardSource {
    pub fn new() -> Self {
        DashboardSource
    }
}

impl Default for DashboardSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatSource for DashboardSource {
    fn name(&self) -> &str {
        "StorageStats"
    }

    /// Collects the appliance-wide iops/read/write triple.
    ///
    /// On consoles without a dashboard the result is empty rather than an
    /// error, so mixed fleets can run `stats:all` everywhere with one
    /// template.
    async fn collect(&self, appliance: &Appliance) -> Result<Vec<StatLine>> {
        if !appliance.generation().capabilities().dashboard_stats {
            debug!(
                "Console generation {} has no dashboard; skipping storage stats",
                appliance.generation()
            );
            return Ok(Vec::new());
        }

        let body = appliance.client().fetch(Page::Dashboard).await?;
        parse_dashboard(&body)
    }
}

/// Renders the dashboard counters into trap lines.
///
/// A page without a `<controller>` element is how pre-dashboard firmware
/// answers this URL; that yields empty output, not an error. A page that
/// does carry `<controller>` but lacks the counters is a structure the
/// adapter does not know and fails the run.
fn parse_dashboard(body: &str) -> Result<Vec<StatLine>> {
    if extract::text(body, "controller").is_none() {
        warn!("Dashboard page carries no <controller> element; no storage stats");
        return Ok(Vec::new());
    }

    let iops = dashboard_value(body, "iops")?;
    let read = dashboard_rate(body, "tx")?;
    let write = dashboard_rate(body, "rx")?;

    Ok(vec![
        StatLine::new(format!("{KEY_PREFIX}.storage.iops"), iops),
        StatLine::new(format!("{KEY_PREFIX}.storage.read"), read.to_string()),
        StatLine::new(format!("{KEY_PREFIX}.storage.write"), write.to_string()),
    ])
}

/// Dashboard counter with the thousands separators stripped.
fn dashboard_value(body: &str, tag: &'static str) -> Result<String> {
    extract::text(body, tag)
        .map(|v| v.replace(',', ""))
        .ok_or_else(|| AdapterError::Extraction {
            page: "monitor_x.php",
            reason: format!("dashboard carries no <{tag}> element"),
        })
}

/// MB/s dashboard rate converted to whole B/s.
fn dashboard_rate(body: &str, tag: &'static str) -> Result<u64> {
    let raw = dashboard_value(body, tag)?;
    let mb = raw.parse::<f64>().map_err(|_| AdapterError::Extraction {
        page: "monitor_x.php",
        reason: format!("<{tag}> value `{raw}` is not a number"),
    })?;

    Ok((mb * 1_048_576.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DASHBOARD: &str = "<response><controller>1</controller>\
        <iops>10,764</iops><tx>269.5</tx><rx>1,197.6</rx></response>";

    #[test]
    fn counters_come_out_deformatted_and_in_bytes() {
        let lines = parse_dashboard(DASHBOARD).unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].key, "qsan.sanos4.storage.iops");
        assert_eq!(lines[0].value, "10764");
        assert_eq!(lines[1].key, "qsan.sanos4.storage.read");
        assert_eq!(lines[1].value, "282591232");
        assert_eq!(lines[2].key, "qsan.sanos4.storage.write");
        assert_eq!(lines[2].value, "1255774617");
    }

    #[test]
    fn page_without_controller_yields_no_lines() {
        let lines = parse_dashboard("<response><iops>5</iops></response>").unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn missing_counter_fails_the_parse() {
        let body = "<response><controller>1</controller><iops>5</iops><tx>1.0</tx></response>";
        let err = parse_dashboard(body).unwrap_err();
        assert!(matches!(err, AdapterError::Extraction { page: "monitor_x.php", .. }));
    }

    #[test]
    fn non_numeric_rate_fails_the_parse() {
        let body = "<response><controller>1</controller>\
            <iops>5</iops><tx>fast</tx><rx>1.0</rx></response>";
        assert!(parse_dashboard(body).is_err());
    }
}

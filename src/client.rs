// Client module - authenticated HTTP session against the management console
//
// This module is responsible for:
// 1. Submitting the console's login form and keeping the session cookie
// 2. Detecting the firmware generation from the post-login page
// 3. Mapping logical page names to console paths and fetching them
// 4. Issuing the posts that switch monitoring on for volumes and disks
//
// The consoles answer HTTP 200 for almost everything, including failed
// logins, so success is judged by page content rather than status codes.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tracing::{debug, info};

use crate::config::{Config, Generation, GenerationMode};
use crate::error::{AdapterError, Result};
use crate::extract;

/// Console pages the adapter knows how to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Appliance-wide dashboard counters (SANOS4 only)
    Dashboard,
    /// One page of the volume inventory
    VolumeList { page: u32 },
    /// Per-volume monitor counters
    VolumeStats,
    /// Disk inventory of enclosure 0
    DiskList,
    /// Per-disk monitor counters
    DiskStats,
    /// Fibre Channel port inventory
    PortList,
}

impl Page {
    /// Path and query string under the console root.
    pub fn path(&self) -> String {
        match self {
            Page::Dashboard => "/monitor_x.php?cmd=monitor_dashboard".to_string(),
            Page::VolumeList { page } => format!("/vd_x.php?size_unit=gb&page={page}"),
            Page::VolumeStats => "/monitor_x.php?cmd=monitor_volume".to_string(),
            Page::DiskList => "/pd_x.php?enc_idx=0&pd_size_unit=gb".to_string(),
            Page::DiskStats => "/monitor_x.php?cmd=monitor_disk".to_string(),
            Page::PortList => "/fc_x.php?cmd=fc_port_list".to_string(),
        }
    }
}

/// Authenticated session with a resolved firmware generation
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    generation: Generation,
}

impl SessionClient {
    /// Logs in to the management console and returns a live session.
    ///
    /// Submits the login form the way a browser would; the console replies
    /// 200 with the login form again on bad credentials, so the logout
    /// control on the returned page is the only reliable success signal.
    /// Which control rendered also tells the firmware generation apart,
    /// unless the operator pinned one with `--generation`.
    ///
    /// # Returns
    /// * `Ok(SessionClient)` - Logged in, session cookie stored
    /// * `Err(AdapterError::Authentication)` - No logout marker on the reply
    /// * `Err(AdapterError::Connectivity)` - Host unreachable or timed out
    pub async fn connect(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml"),
        );

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .user_agent(concat!("qsan-zabbix/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        let base_url = config.base_url();
        info!("Logging in to {} as user '{}'", base_url, config.username);

        let body = http
            .post(format!("{base_url}/login.php"))
            .form(&[
                ("lang_sel", "en"),
                ("login", "Login"),
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let detected = detect_generation(&body).ok_or_else(|| AdapterError::Authentication {
            host: config.host.clone(),
        })?;

        let generation = match config.generation {
            GenerationMode::Auto => detected,
            GenerationMode::Fixed(forced) => {
                if forced != detected {
                    debug!(
                        "Console looks like {} but generation is pinned to {}",
                        detected, forced
                    );
                }
                forced
            }
        };

        info!("Authenticated; console generation: {}", generation);

        Ok(SessionClient {
            http,
            base_url,
            generation,
        })
    }

    /// Firmware generation this session resolved to
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Fetches a console page over the authenticated session.
    pub async fn fetch(&self, page: Page) -> Result<String> {
        let url = format!("{}{}", self.base_url, page.path());
        debug!("GET {}", url);

        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(body)
    }

    /// Asks the appliance to start collecting monitor counters for the
    /// given volume IDs. The console expects every volume of interest in
    /// one comma-joined list; partial lists switch the others off.
    pub async fn enable_volume_monitoring(&self, ids: &[&str]) -> Result<()> {
        let list = ids.join(",");
        info!("Enabling volume monitoring for ids: {}", list);

        let url = format!(
            "{}/monitor_x.php?op=volume_set_monitor&volume_arr={}",
            self.base_url, list
        );
        self.http.post(&url).send().await?.error_for_status()?;

        Ok(())
    }

    /// Asks the appliance to start collecting monitor counters for the
    /// given disk slots of enclosure 0.
    pub async fn enable_disk_monitoring(&self, slots: &[&str]) -> Result<()> {
        let list = slots.join(",");
        info!("Enabling disk monitoring for slots: {}", list);

        let url = format!(
            "{}/monitor_x.php?op=disk_set_monitor&enc_idx=0&slot_arr={}",
            self.base_url, list
        );
        self.http.post(&url).send().await?.error_for_status()?;

        Ok(())
    }
}

/// Tells the firmware generation from the post-login page.
///
/// SANOS4 consoles render a `<div id="logout_btn">`; SANOS3 and the F600Q
/// line render an `<img title="Logout">` instead. Neither marker present
/// means the login was rejected.
pub fn detect_generation(body: &str) -> Option<Generation> {
    if extract::has_marker(body, "div", "id", "logout_btn") {
        Some(Generation::Sanos4)
    } else if extract::has_marker(body, "img", "title", "Logout") {
        Some(Generation::Sanos3)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_map_to_console_paths() {
        assert_eq!(Page::Dashboard.path(), "/monitor_x.php?cmd=monitor_dashboard");
        assert_eq!(Page::VolumeList { page: 3 }.path(), "/vd_x.php?size_unit=gb&page=3");
        assert_eq!(Page::VolumeStats.path(), "/monitor_x.php?cmd=monitor_volume");
        assert_eq!(Page::DiskList.path(), "/pd_x.php?enc_idx=0&pd_size_unit=gb");
        assert_eq!(Page::DiskStats.path(), "/monitor_x.php?cmd=monitor_disk");
        assert_eq!(Page::PortList.path(), "/fc_x.php?cmd=fc_port_list");
    }

    #[test]
    fn sanos4_login_page_is_recognized() {
        let body = "<html><body><div id=\"logout_btn\" class=\"btn\">Logout</div></body></html>";
        assert_eq!(detect_generation(body), Some(Generation::Sanos4));
    }

    #[test]
    fn sanos3_login_page_is_recognized() {
        let body = "<html><body><img src=\"x.png\" title=\"Logout\"></body></html>";
        assert_eq!(detect_generation(body), Some(Generation::Sanos3));
    }

    #[test]
    fn login_form_page_is_not_authenticated() {
        let body = "<html><form action=\"/login.php\"><input name=\"username\"></form></html>";
        assert_eq!(detect_generation(body), None);
    }
}

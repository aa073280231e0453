// Configuration module - run settings assembled from the command line
//
// This module is responsible for:
// 1. Holding the per-run settings (appliance address, credentials, trap host)
// 2. Parsing the requested method into a strongly-typed value
// 3. Describing what each firmware generation is capable of
//
// A run is one-shot: there is no config file or persistent state, everything
// arrives as command-line arguments and lives for a single invocation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AdapterError;

/// Settings for one adapter run
#[derive(Debug, Clone)]
pub struct Config {
    /// Appliance address as given on the command line; a bare host name or
    /// IP is promoted to an http:// URL by [`Config::base_url`]
    pub host: String,

    /// Management-console account (the factory account is "user")
    pub username: String,

    /// Management-console password (the factory password is "1234")
    pub password: String,

    /// Host name the Zabbix server knows this appliance by; written as the
    /// first column of every trap line
    pub zhost: String,

    /// Firmware generation, either forced or detected at login
    pub generation: GenerationMode,

    /// Timeout applied to every HTTP request
    pub timeout: Duration,
}

impl Config {
    /// Base URL of the management console.
    ///
    /// A scheme given on the command line is kept as-is (https included);
    /// anything else is treated as a plain host and prefixed with http://,
    /// which is how the consoles ship. Trailing slashes are dropped so page
    /// paths can always be appended directly.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        }
    }
}

/// Firmware generation of the appliance's management console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Older consoles (SANOS3 and the F600Q line); no dashboard endpoint
    Sanos3,
    /// Current consoles with the monitor dashboard
    Sanos4,
}

impl Generation {
    /// What this generation's console can answer.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Generation::Sanos3 => Capabilities {
                dashboard_stats: false,
            },
            Generation::Sanos4 => Capabilities {
                dashboard_stats: true,
            },
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Sanos3 => write!(f, "SANOS3"),
            Generation::Sanos4 => write!(f, "SANOS4"),
        }
    }
}

/// Page groups a firmware generation serves
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Whether the aggregate dashboard page (storage-wide IOPS and
    /// throughput) exists on this console
    pub dashboard_stats: bool,
}

/// How the firmware generation is determined for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Detect from the logout marker on the post-login page
    Auto,
    /// Trust the operator and skip detection
    Fixed(Generation),
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(GenerationMode::Auto),
            "sanos3" => Ok(GenerationMode::Fixed(Generation::Sanos3)),
            "sanos4" => Ok(GenerationMode::Fixed(Generation::Sanos4)),
            other => Err(format!(
                "unknown generation `{other}`; expected auto, sanos3 or sanos4"
            )),
        }
    }
}

/// The operation requested on the command line
///
/// Discovery methods emit Zabbix low-level-discovery JSON; stats methods
/// emit tab-separated trap lines. Singular spellings are accepted as
/// aliases because both forms circulate in existing Zabbix templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    DiscoveryVolumes,
    DiscoveryDisks,
    DiscoveryPorts,
    StatsVolumes,
    StatsDisks,
    StatsStorage,
    StatsAll,
}

impl Method {
    /// Canonical spelling, used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Method::DiscoveryVolumes => "discovery:volumes",
            Method::DiscoveryDisks => "discovery:disks",
            Method::DiscoveryPorts => "discovery:ports",
            Method::StatsVolumes => "stats:volumes",
            Method::StatsDisks => "stats:disks",
            Method::StatsStorage => "stats:storage",
            Method::StatsAll => "stats:all",
        }
    }
}

impl FromStr for Method {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery:volumes" | "discovery:volume" => Ok(Method::DiscoveryVolumes),
            "discovery:disks" | "discovery:disk" => Ok(Method::DiscoveryDisks),
            "discovery:ports" | "discovery:port" => Ok(Method::DiscoveryPorts),
            "stats:volumes" | "stats:volume" => Ok(Method::StatsVolumes),
            "stats:disks" | "stats:disk" => Ok(Method::StatsDisks),
            "stats:storage" => Ok(Method::StatsStorage),
            "stats:all" => Ok(Method::StatsAll),
            other => Err(AdapterError::UnsupportedMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(host: &str) -> Config {
        Config {
            host: host.to_string(),
            username: "user".to_string(),
            password: "1234".to_string(),
            zhost: "san-01".to_string(),
            generation: GenerationMode::Auto,
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn base_url_prefixes_bare_hosts() {
        assert_eq!(config_for("192.168.1.50").base_url(), "http://192.168.1.50");
        assert_eq!(config_for("san-01.lan/").base_url(), "http://san-01.lan");
    }

    #[test]
    fn base_url_keeps_explicit_schemes() {
        assert_eq!(config_for("http://san-01").base_url(), "http://san-01");
        assert_eq!(config_for("https://san-01/").base_url(), "https://san-01");
    }

    #[test]
    fn method_parses_canonical_and_singular_forms() {
        assert_eq!("discovery:volumes".parse::<Method>().unwrap(), Method::DiscoveryVolumes);
        assert_eq!("discovery:volume".parse::<Method>().unwrap(), Method::DiscoveryVolumes);
        assert_eq!("discovery:disk".parse::<Method>().unwrap(), Method::DiscoveryDisks);
        assert_eq!("discovery:ports".parse::<Method>().unwrap(), Method::DiscoveryPorts);
        assert_eq!("stats:volume".parse::<Method>().unwrap(), Method::StatsVolumes);
        assert_eq!("stats:disks".parse::<Method>().unwrap(), Method::StatsDisks);
        assert_eq!("stats:storage".parse::<Method>().unwrap(), Method::StatsStorage);
        assert_eq!("stats:all".parse::<Method>().unwrap(), Method::StatsAll);
    }

    #[test]
    fn method_rejects_anything_else() {
        let err = "stats:everything".parse::<Method>().unwrap_err();
        match err {
            AdapterError::UnsupportedMethod(name) => assert_eq!(name, "stats:everything"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn generation_mode_parses_case_insensitively() {
        assert_eq!("auto".parse::<GenerationMode>().unwrap(), GenerationMode::Auto);
        assert_eq!(
            "SANOS3".parse::<GenerationMode>().unwrap(),
            GenerationMode::Fixed(Generation::Sanos3)
        );
        assert_eq!(
            "sanos4".parse::<GenerationMode>().unwrap(),
            GenerationMode::Fixed(Generation::Sanos4)
        );
        assert!("sanos5".parse::<GenerationMode>().is_err());
    }

    #[test]
    fn sanos3_has_no_dashboard() {
        assert!(!Generation::Sanos3.capabilities().dashboard_stats);
        assert!(Generation::Sanos4.capabilities().dashboard_stats);
    }
}

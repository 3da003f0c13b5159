use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::net::IpAddr;

use dns_auth::response::DEFAULT_EDNS_UDP_MAX;

/// The configuration file.  Only the zone list is required;
/// everything else has a default, and the interface, port, and EDNS
/// maximum can also be overridden on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub interface: Option<IpAddr>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest EDNS UDP payload to send; 0 disables EDNS.
    #[serde(default = "default_edns_udp_max")]
    pub edns_udp_max: u16,
    /// Username to drop privileges to, if started as root.
    #[serde(default)]
    pub user: Option<String>,
    /// Group name to drop privileges to, if started as root.
    #[serde(default)]
    pub group: Option<String>,
    pub zones: Vec<ZoneSettings>,
}

/// One zone to serve: its origin name and its master file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneSettings {
    pub name: String,
    pub file: String,
}

fn default_port() -> u16 {
    53
}

fn default_edns_udp_max() -> u16 {
    DEFAULT_EDNS_UDP_MAX
}

impl Settings {
    pub fn new(filename: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(filename))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_yaml(yaml: &str) -> Result<Settings, ConfigError> {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn minimal_settings() {
        let settings = from_yaml(
            "zones:\n\
             - name: example.com.\n\
             \x20 file: zones/example.com.zone\n",
        )
        .unwrap();

        assert_eq!(53, settings.port);
        assert_eq!(1432, settings.edns_udp_max);
        assert_eq!(None, settings.interface);
        assert_eq!(None, settings.user);
        assert_eq!(1, settings.zones.len());
        assert_eq!("example.com.", settings.zones[0].name);
    }

    #[test]
    fn full_settings() {
        let settings = from_yaml(
            "interface: 127.0.0.1\n\
             port: 5300\n\
             edns_udp_max: 0\n\
             user: nobody\n\
             group: nogroup\n\
             zones:\n\
             - name: example.com.\n\
             \x20 file: a.zone\n\
             - name: example.org.\n\
             \x20 file: b.zone\n",
        )
        .unwrap();

        assert_eq!(5300, settings.port);
        assert_eq!(0, settings.edns_udp_max);
        assert_eq!(Some("nobody".to_string()), settings.user);
        assert_eq!(2, settings.zones.len());
    }

    #[test]
    fn zones_are_required() {
        assert!(from_yaml("port: 53\n").is_err());
    }
}

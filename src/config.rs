//! Daemon configuration
//!
//! Defaults describe the production appliance layout; the command channel
//! address and claim TTL can be overridden through `COMMANDD_*` environment
//! variables.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address of the local command request/reply channel
    pub listen_addr: String,
    /// Grace period during which a claimed job result is still acknowledged
    pub claim_ttl_ms: u64,
    /// How long a single receive wait may block before the loop re-checks
    /// the shutdown flag
    pub receive_timeout_ms: u64,
    /// Directory where upgrade bundles are uploaded
    pub upload_dir: String,
    /// Passphrase file used to decrypt upgrade bundles
    pub passphrase_file: String,
    /// Script that applies an unpacked upgrade
    pub upgrade_script: String,
    /// rsyslog forwarding configuration fragment
    pub syslog_conf_path: String,
    /// Address of the syslog aggregation agent
    pub syslog_agent_ip: String,
    pub syslog_agent_port: u16,
    /// true = forward over TCP (with disk-assisted queueing), false = UDP
    pub syslog_use_tcp: bool,
    /// NTP daemon configuration file
    pub ntp_conf_path: String,
    /// Directory holding per-interface network configuration files
    pub network_scripts_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5556".into(),
            claim_ttl_ms: 1000,
            receive_timeout_ms: 250,
            upload_dir: "/usr/local/appliance/upload".into(),
            passphrase_file: "/usr/local/appliance/etc/upgrade.pass".into(),
            upgrade_script: "/usr/local/appliance/bin/upgrade.sh".into(),
            syslog_conf_path: "/etc/rsyslog.d/appliance.conf".into(),
            syslog_agent_ip: "127.0.0.1".into(),
            syslog_agent_port: 1234,
            syslog_use_tcp: false,
            ntp_conf_path: "/etc/ntp.conf".into(),
            network_scripts_dir: "/etc/sysconfig/network-scripts".into(),
        }
    }
}

impl Config {
    /// Defaults with `COMMANDD_LISTEN` and `COMMANDD_CLAIM_TTL_MS` applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("COMMANDD_LISTEN") {
            config.listen_addr = addr;
        }
        if let Some(ttl) = std::env::var("COMMANDD_CLAIM_TTL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.claim_ttl_ms = ttl;
        }
        config
    }

    pub fn claim_ttl(&self) -> Duration {
        Duration::from_millis(self.claim_ttl_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Human-readable rendering returned by CONFIG_REQUEST
    pub fn describe(&self) -> String {
        let syslog_proto = if self.syslog_use_tcp { "tcp" } else { "udp" };
        format!(
            "listen_addr={}\n\
             claim_ttl_ms={}\n\
             upload_dir={}\n\
             upgrade_script={}\n\
             syslog_conf={}\n\
             syslog_agent={}:{}\n\
             syslog_protocol={}\n\
             ntp_conf={}\n\
             network_scripts_dir={}\n",
            self.listen_addr,
            self.claim_ttl_ms,
            self.upload_dir,
            self.upgrade_script,
            self.syslog_conf_path,
            self.syslog_agent_ip,
            self.syslog_agent_port,
            syslog_proto,
            self.ntp_conf_path,
            self.network_scripts_dir,
        )
    }
}

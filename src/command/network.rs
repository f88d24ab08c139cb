//! NETWORK_CONFIG command
//!
//! Rewrites an interface's ifcfg file and bounces the interface. DHCP and
//! static configurations share the rendering path; static requires at
//! least an address and a netmask.

use super::{Command, CommandContext};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use commandd_shared::{CommandReply, CommandRequest, ConfigMethod, NetInterface};
use prost::Message;
use std::sync::Arc;
use tracing::info;

pub struct NetworkConfigCommand {
    request: CommandRequest,
}

impl NetworkConfigCommand {
    pub fn construct(request: CommandRequest) -> Arc<dyn Command> {
        Arc::new(NetworkConfigCommand { request })
    }
}

/// ifcfg file body for the requested interface configuration
fn render_ifcfg(interface: &NetInterface) -> String {
    let mut body = format!("DEVICE={}\nONBOOT=yes\n", interface.interface);
    match ConfigMethod::try_from(interface.method) {
        Ok(ConfigMethod::Dhcp) | Err(_) => {
            body.push_str("BOOTPROTO=dhcp\n");
        }
        Ok(ConfigMethod::StaticIp) => {
            body.push_str("BOOTPROTO=static\n");
            body.push_str(&format!("IPADDR={}\n", interface.ip_address));
            body.push_str(&format!("NETMASK={}\n", interface.netmask));
            if !interface.gateway.is_empty() {
                body.push_str(&format!("GATEWAY={}\n", interface.gateway));
            }
        }
    }
    for (i, server) in interface.dns_servers.iter().enumerate() {
        body.push_str(&format!("DNS{}={}\n", i + 1, server));
    }
    if !interface.search_domains.is_empty() {
        body.push_str(&format!(
            "DOMAIN=\"{}\"\n",
            interface.search_domains.join(" ")
        ));
    }
    body
}

fn validate(interface: &NetInterface) -> Result<()> {
    if interface.interface.is_empty() {
        bail!("network config names no interface");
    }
    if ConfigMethod::try_from(interface.method) == Ok(ConfigMethod::StaticIp)
        && (interface.ip_address.is_empty() || interface.netmask.is_empty())
    {
        bail!(
            "static configuration for {} is missing an address or netmask",
            interface.interface
        );
    }
    Ok(())
}

#[async_trait]
impl Command for NetworkConfigCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandReply> {
        let interface = NetInterface::decode(self.request.string_arg.as_bytes())
            .context("invalid network config payload")?;
        validate(&interface)?;

        let path = format!(
            "{}/ifcfg-{}",
            ctx.config.network_scripts_dir, interface.interface
        );
        info!(interface = %interface.interface, %path, "rewriting interface configuration");

        ctx.runner
            .run("/sbin/ifdown", &[&interface.interface])
            .await?;
        tokio::fs::write(&path, render_ifcfg(&interface))
            .await
            .with_context(|| format!("writing {path}"))?;
        ctx.runner
            .run("/sbin/ifup", &[&interface.interface])
            .await?
            .expect_success("bring up interface")?;

        Ok(CommandReply::ok(format!(
            "interface {} reconfigured",
            interface.interface
        )))
    }
}

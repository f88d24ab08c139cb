//! NTP_CONFIG command

use super::{Command, CommandContext};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use commandd_shared::{CommandReply, CommandRequest, NtpServers};
use prost::Message;
use std::sync::Arc;
use tracing::info;

pub struct NtpConfigCommand {
    request: CommandRequest,
}

impl NtpConfigCommand {
    pub fn construct(request: CommandRequest) -> Arc<dyn Command> {
        Arc::new(NtpConfigCommand { request })
    }
}

fn render_conf(servers: &NtpServers) -> String {
    let mut body = String::from("driftfile /var/lib/ntp/drift\n\n");
    body.push_str(&format!("server {} iburst\n", servers.primary));
    if !servers.backup.is_empty() {
        body.push_str(&format!("server {} iburst\n", servers.backup));
    }
    body
}

#[async_trait]
impl Command for NtpConfigCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandReply> {
        let servers = NtpServers::decode(self.request.string_arg.as_bytes())
            .context("invalid ntp config payload")?;
        if servers.primary.is_empty() {
            bail!("ntp config names no primary server");
        }

        let path = &ctx.config.ntp_conf_path;
        info!(primary = %servers.primary, %path, "rewriting ntp configuration");
        tokio::fs::write(path, render_conf(&servers))
            .await
            .with_context(|| format!("writing {path}"))?;

        ctx.runner
            .run("/sbin/service", &["ntpd", "restart"])
            .await?
            .expect_success("restart ntpd")?;

        Ok(CommandReply::ok("ntp configuration applied"))
    }
}

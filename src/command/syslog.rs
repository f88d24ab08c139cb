//! SYSLOG_RESTART command
//!
//! Rewrites the rsyslog forwarding fragment pointing local4 traffic at the
//! aggregation agent, then restarts rsyslog. TCP forwarding gets a
//! disk-assisted queue so log traffic survives agent outages; UDP is
//! fire-and-forget. If the rendered fragment matches what is already on
//! disk the restart is skipped.

use super::{Command, CommandContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use commandd_shared::{CommandReply, CommandRequest};
use std::sync::Arc;
use tracing::{debug, info};

pub struct RestartSyslogCommand;

impl RestartSyslogCommand {
    pub fn construct(_request: CommandRequest) -> Arc<dyn Command> {
        Arc::new(RestartSyslogCommand)
    }
}

/// Forwarding fragment body. The rate-limit header applies to both
/// protocols; only TCP gets the spool queue block.
fn render_conf(agent_ip: &str, agent_port: u16, use_tcp: bool) -> String {
    let mut body = String::from(
        "\n\n$SystemLogRateLimitInterval 1 \n$SystemLogRateLimitBurst 20000 \n\n",
    );
    if use_tcp {
        body.push_str("$WorkDirectory /var/lib/rsyslog # where to place spool files\n");
        body.push_str("$ActionQueueType LinkedList   # use asynchronous processing\n");
        body.push_str("$ActionQueueFileName LR_SIEM  # unique name prefix for spool files\n");
        body.push_str("$ActionResumeRetryCount -1    # infinite retries if host is down\n");
        body.push_str("$ActionQueueMaxDiskSpace 1g   # 1gb space limit (use as much as possible)\n");
        body.push_str("$ActionQueueSaveOnShutdown on # save messages to disk on shutdown\n");
    }
    let target = if use_tcp { "@@" } else { "@" };
    body.push_str(&format!("local4.* {target}{agent_ip}:{agent_port}"));
    body
}

#[async_trait]
impl Command for RestartSyslogCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandReply> {
        let rendered = render_conf(
            &ctx.config.syslog_agent_ip,
            ctx.config.syslog_agent_port,
            ctx.config.syslog_use_tcp,
        );
        let path = &ctx.config.syslog_conf_path;

        let current = tokio::fs::read_to_string(path).await.unwrap_or_default();
        if current == rendered {
            debug!(%path, "syslog configuration unchanged, restart skipped");
            return Ok(CommandReply::ok("syslog configuration unchanged"));
        }

        tokio::fs::write(path, &rendered)
            .await
            .with_context(|| format!("writing {path}"))?;
        info!(%path, tcp = ctx.config.syslog_use_tcp, "syslog forwarding updated");

        let output = ctx
            .runner
            .run("/sbin/service", &["rsyslog", "restart"])
            .await?
            .expect_success("restart rsyslog")?;
        Ok(CommandReply::ok(output.output))
    }
}

//! SHUTDOWN command

use super::{Command, CommandContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use commandd_shared::{CommandReply, CommandRequest, ShutdownRequest};
use prost::Message;
use std::sync::Arc;
use tracing::warn;

pub struct ShutdownCommand {
    request: CommandRequest,
}

impl ShutdownCommand {
    pub fn construct(request: CommandRequest) -> Arc<dyn Command> {
        Arc::new(ShutdownCommand { request })
    }
}

#[async_trait]
impl Command for ShutdownCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandReply> {
        // An absent payload decodes to the default (deferred) request
        let shutdown = ShutdownRequest::decode(self.request.string_arg.as_bytes())
            .context("invalid shutdown request payload")?;

        warn!(now = shutdown.now, "shutdown requested over the command channel");
        let output = if shutdown.now {
            ctx.runner.run("/sbin/init", &["0"]).await?
        } else {
            ctx.runner.run("/sbin/shutdown", &["-h", "+1"]).await?
        };
        Ok(CommandReply::ok(output.expect_success("shutdown")?.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::process::fake::FakeRunner;
    use commandd_shared::CommandType;

    fn ctx(runner: Arc<FakeRunner>) -> CommandContext {
        CommandContext {
            config: Arc::new(Config::default()),
            runner,
        }
    }

    fn request(now: bool) -> CommandRequest {
        let mut buf = Vec::new();
        ShutdownRequest { now }.encode(&mut buf).unwrap();
        let mut request = CommandRequest::new(CommandType::Shutdown);
        request.string_arg = String::from_utf8(buf).unwrap();
        request
    }

    #[tokio::test]
    async fn test_immediate_shutdown_runs_init_0() {
        let runner = Arc::new(FakeRunner::succeeding());
        let cmd = ShutdownCommand::construct(request(true));
        let reply = cmd.execute(&ctx(runner.clone())).await.unwrap();
        assert!(reply.success);
        assert_eq!(
            runner.recorded(),
            vec![("/sbin/init".to_string(), vec!["0".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_deferred_shutdown_schedules_halt() {
        let runner = Arc::new(FakeRunner::succeeding());
        let cmd = ShutdownCommand::construct(request(false));
        cmd.execute(&ctx(runner.clone())).await.unwrap();
        assert_eq!(
            runner.recorded(),
            vec![(
                "/sbin/shutdown".to_string(),
                vec!["-h".to_string(), "+1".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn test_empty_payload_defers() {
        let runner = Arc::new(FakeRunner::succeeding());
        let cmd = ShutdownCommand::construct(CommandRequest::new(CommandType::Shutdown));
        cmd.execute(&ctx(runner.clone())).await.unwrap();
        let recorded = runner.recorded();
        assert_eq!(recorded[0].0, "/sbin/shutdown");
    }

    #[tokio::test]
    async fn test_shutdown_failure_is_an_error() {
        let runner = Arc::new(FakeRunner::failing());
        let cmd = ShutdownCommand::construct(request(true));
        assert!(cmd.execute(&ctx(runner)).await.is_err());
    }
}

//! REBOOT command

use super::{Command, CommandContext};
use anyhow::Result;
use async_trait::async_trait;
use commandd_shared::{CommandReply, CommandRequest};
use std::sync::Arc;
use tracing::warn;

pub struct RebootCommand;

impl RebootCommand {
    pub fn construct(_request: CommandRequest) -> Arc<dyn Command> {
        Arc::new(RebootCommand)
    }
}

#[async_trait]
impl Command for RebootCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandReply> {
        warn!("reboot requested over the command channel");
        let output = ctx
            .runner
            .run("/sbin/init", &["6"])
            .await?
            .expect_success("reboot")?;
        Ok(CommandReply::ok(output.output))
    }
}

//! CONFIG_REQUEST command

use super::{Command, CommandContext};
use anyhow::Result;
use async_trait::async_trait;
use commandd_shared::{CommandReply, CommandRequest};
use std::sync::Arc;

pub struct ConfigRequestCommand;

impl ConfigRequestCommand {
    pub fn construct(_request: CommandRequest) -> Arc<dyn Command> {
        Arc::new(ConfigRequestCommand)
    }
}

#[async_trait]
impl Command for ConfigRequestCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandReply> {
        Ok(CommandReply::ok(ctx.config.describe()))
    }
}

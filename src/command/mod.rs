//! Command execution infrastructure
//!
//! This module handles:
//! - The `Command` contract shared by all administrative commands
//! - The factory table mapping a wire command type to a constructor
//! - The asynchronous job registry (submission, polling, claim-once)
//! - The concrete commands themselves

pub mod jobs;

mod config_request;
mod network;
mod ntp;
mod reboot;
mod shutdown;
mod syslog;
mod upgrade;

pub use config_request::ConfigRequestCommand;
pub use network::NetworkConfigCommand;
pub use ntp::NtpConfigCommand;
pub use reboot::RebootCommand;
pub use shutdown::ShutdownCommand;
pub use syslog::RestartSyslogCommand;
pub use upgrade::UpgradeCommand;

use crate::config::Config;
use crate::process::ProcessRunner;
use anyhow::Result;
use async_trait::async_trait;
use commandd_shared::{CommandReply, CommandRequest, CommandType};
use std::collections::HashMap;
use std::sync::Arc;

/// Context handed to every command execution
#[derive(Clone)]
pub struct CommandContext {
    pub config: Arc<Config>,
    pub runner: Arc<dyn ProcessRunner>,
}

/// A unit of administrative work: takes its request at construction time,
/// produces a reply when executed.
///
/// Commands know nothing about job IDs or result claiming; whether they run
/// inline or on a worker task is the dispatcher's business. An `Err` from
/// `execute` is translated into a `success=false` reply by the caller.
#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandReply>;
}

/// Uniform constructor signature shared by every command type
pub type CommandFactory = fn(CommandRequest) -> Arc<dyn Command>;

/// Maps a wire command type to its constructor.
///
/// Built once before the dispatcher starts serving; individual entries may
/// be overridden at runtime to substitute fakes. Not synchronized - the
/// processor owns it and registration happens before serving.
pub struct FactoryRegistry {
    factories: HashMap<CommandType, CommandFactory>,
}

impl FactoryRegistry {
    /// Empty table
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// The fixed production table, one entry per supported command type
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CommandType::Upgrade, UpgradeCommand::construct);
        registry.register(CommandType::Reboot, RebootCommand::construct);
        registry.register(CommandType::Shutdown, ShutdownCommand::construct);
        registry.register(CommandType::NetworkConfig, NetworkConfigCommand::construct);
        registry.register(CommandType::NtpConfig, NtpConfigCommand::construct);
        registry.register(CommandType::SyslogRestart, RestartSyslogCommand::construct);
        registry.register(CommandType::ConfigRequest, ConfigRequestCommand::construct);
        registry
    }

    /// Register or override the factory for a command type
    pub fn register(&mut self, cmd_type: CommandType, factory: CommandFactory) {
        self.factories.insert(cmd_type, factory);
    }

    pub fn lookup(&self, cmd_type: CommandType) -> Option<CommandFactory> {
        self.factories.get(&cmd_type).copied()
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

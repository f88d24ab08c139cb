//! Request dispatcher for the command channel
//!
//! Decodes inbound requests, special-cases status polling, routes everything
//! else through the factory table, and executes commands either inline or
//! forked through the job registry. Every request produces exactly one
//! reply; nothing that arrives on the wire can take the serve loop down.

use crate::command::jobs::JobRegistry;
use crate::command::{CommandContext, CommandFactory, FactoryRegistry};
use crate::config::Config;
use crate::process::ProcessRunner;
use crate::transport::ReplyTransport;
use anyhow::Result;
use commandd_shared::{codec, replies, CommandReply, CommandRequest, CommandType};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct CommandProcessor {
    config: Arc<Config>,
    runner: Arc<dyn ProcessRunner>,
    factories: FactoryRegistry,
    registry: JobRegistry,
}

impl CommandProcessor {
    pub fn new(
        config: Arc<Config>,
        runner: Arc<dyn ProcessRunner>,
        factories: FactoryRegistry,
    ) -> Self {
        let registry = JobRegistry::new(config.claim_ttl());
        Self {
            config,
            runner,
            factories,
            registry,
        }
    }

    /// The job registry backing asynchronous execution
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Override a factory entry; call before serving
    pub fn register(&mut self, cmd_type: CommandType, factory: CommandFactory) {
        self.factories.register(cmd_type, factory);
    }

    /// Current factory for a command type
    pub fn registration(&self, cmd_type: CommandType) -> Option<CommandFactory> {
        self.factories.lookup(cmd_type)
    }

    fn context(&self) -> CommandContext {
        CommandContext {
            config: self.config.clone(),
            runner: self.runner.clone(),
        }
    }

    /// Handle one raw request frame
    pub async fn handle_frame(&self, payload: &[u8]) -> CommandReply {
        match codec::decode_payload::<CommandRequest>(payload) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => {
                warn!("undecodable request: {err}");
                CommandReply::failure(format!("Unable to decode command request: {err}"))
            }
        }
    }

    /// Handle one decoded request
    pub async fn handle_request(&self, request: CommandRequest) -> CommandReply {
        let cmd_type = request.command_type();

        if cmd_type == CommandType::CommandStatus {
            return self.handle_status(&request).await;
        }

        let factory = match self.factories.lookup(cmd_type) {
            Some(factory) => factory,
            None => {
                warn!("no factory registered for {cmd_type:?}");
                return CommandReply::failure("Command Not Registered");
            }
        };

        let run_async = request.r#async;
        let command = factory(request);
        let ctx = self.context();

        if run_async {
            let job_id = self.registry.submit(command, ctx).await;
            debug!("accepted {cmd_type:?} as {job_id}");
            CommandReply::job_accepted(job_id)
        } else {
            // Inline execution: failures (and panics) become failed replies,
            // never a dead serve loop
            match AssertUnwindSafe(command.execute(&ctx)).catch_unwind().await {
                Ok(Ok(reply)) => reply,
                Ok(Err(err)) => {
                    warn!("{cmd_type:?} failed: {err:#}");
                    CommandReply::failure(err.to_string())
                }
                Err(_) => {
                    warn!("{cmd_type:?} panicked during inline execution");
                    CommandReply::failure("command terminated unexpectedly")
                }
            }
        }
    }

    /// Status queries are validated before any registry lookup
    async fn handle_status(&self, request: &CommandRequest) -> CommandReply {
        if request.string_arg.is_empty() {
            return CommandReply::failure(replies::STATUS_NO_ID);
        }
        if request.r#async {
            return CommandReply::failure(replies::STATUS_NOT_ASYNC);
        }
        self.registry.poll(&request.string_arg).await
    }

    /// Serve requests until the shutdown flag flips.
    ///
    /// The loop blocks only on the bounded receive wait and on inline
    /// command execution; forked jobs never hold it up. In-flight workers
    /// are abandoned when the loop stops.
    pub async fn run<T: ReplyTransport>(
        &self,
        transport: &mut T,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let wait = self.config.receive_timeout();
        info!("command processor serving");

        while !*shutdown.borrow() {
            match transport.recv_timeout(wait).await {
                Ok(Some(payload)) => {
                    let reply = self.handle_frame(&payload).await;
                    match codec::encode(&reply) {
                        Ok(frame) => {
                            if let Err(err) = transport.send(frame).await {
                                warn!("failed to send reply: {err:#}");
                            }
                        }
                        Err(err) => warn!("failed to encode reply: {err}"),
                    }
                }
                Ok(None) => {} // idle window; re-check the shutdown flag
                Err(err) => warn!("transport receive error: {err:#}"),
            }
        }

        info!("command processor stopped");
        Ok(())
    }
}

//! UPGRADE command
//!
//! Applies an encrypted upgrade bundle previously placed in the upload
//! directory. The bundle moves through a fixed pipeline of stages; any
//! stage failing aborts the remainder and fails the command.

use super::{Command, CommandContext};
use anyhow::{bail, Result};
use async_trait::async_trait;
use commandd_shared::{CommandReply, CommandRequest};
use std::sync::Arc;
use tracing::info;

pub struct UpgradeCommand {
    request: CommandRequest,
}

impl UpgradeCommand {
    pub fn construct(request: CommandRequest) -> Arc<dyn Command> {
        Arc::new(UpgradeCommand { request })
    }

    fn bundle_path(&self, ctx: &CommandContext) -> String {
        format!("{}/{}", ctx.config.upload_dir, self.request.string_arg)
    }

    fn decrypted_path(&self, ctx: &CommandContext) -> String {
        format!("{}.decrypted", self.bundle_path(ctx))
    }

    fn tarball_path(&self, ctx: &CommandContext) -> String {
        format!("{}/upgrade.tar.gz", ctx.config.upload_dir)
    }

    /// Stage the passphrase next to the bundle for the decrypt tool
    async fn create_passphrase_file(&self, ctx: &CommandContext) -> Result<()> {
        let staged = format!("{}/.pass", ctx.config.upload_dir);
        ctx.runner
            .run("/bin/cp", &[&ctx.config.passphrase_file, &staged])
            .await?
            .expect_success("create passphrase file")?;
        Ok(())
    }

    async fn decrypt_file(&self, ctx: &CommandContext) -> Result<()> {
        let staged = format!("{}/.pass", ctx.config.upload_dir);
        ctx.runner
            .run(
                "/usr/bin/gpg",
                &[
                    "--batch",
                    "--yes",
                    "--passphrase-file",
                    &staged,
                    "--output",
                    &self.decrypted_path(ctx),
                    "--decrypt",
                    &self.bundle_path(ctx),
                ],
            )
            .await?
            .expect_success("decrypt upgrade bundle")?;
        Ok(())
    }

    async fn rename_decrypted_file(&self, ctx: &CommandContext) -> Result<()> {
        ctx.runner
            .run("/bin/mv", &[&self.decrypted_path(ctx), &self.tarball_path(ctx)])
            .await?
            .expect_success("rename decrypted bundle")?;
        Ok(())
    }

    async fn untar_file(&self, ctx: &CommandContext) -> Result<()> {
        ctx.runner
            .run(
                "/bin/tar",
                &["xzf", &self.tarball_path(ctx), "-C", &ctx.config.upload_dir],
            )
            .await?
            .expect_success("unpack upgrade bundle")?;
        Ok(())
    }

    async fn run_upgrade_script(&self, ctx: &CommandContext) -> Result<String> {
        let output = ctx
            .runner
            .run(&ctx.config.upgrade_script, &[&ctx.config.upload_dir])
            .await?
            .expect_success("run upgrade script")?;
        Ok(output.output)
    }

    async fn clean_upload_dir(&self, ctx: &CommandContext) -> Result<()> {
        let glob = format!("rm -rf {}/*", ctx.config.upload_dir);
        ctx.runner
            .run("/bin/sh", &["-c", &glob])
            .await?
            .expect_success("clean upload directory")?;
        Ok(())
    }
}

#[async_trait]
impl Command for UpgradeCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandReply> {
        if self.request.string_arg.is_empty() {
            bail!("upgrade request carries no bundle filename");
        }
        info!(bundle = %self.request.string_arg, "starting staged upgrade");

        self.create_passphrase_file(ctx).await?;
        self.decrypt_file(ctx).await?;
        self.rename_decrypted_file(ctx).await?;
        self.untar_file(ctx).await?;
        let script_output = self.run_upgrade_script(ctx).await?;
        self.clean_upload_dir(ctx).await?;

        info!("upgrade applied");
        Ok(CommandReply::ok(script_output))
    }
}

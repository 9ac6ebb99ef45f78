// Shared plumbing for CLI commands

use super::progress::CliProgress;
use almatoolkit::{
    AlmaClient, ApiError, ClientConfig, Member, ProgressObserver, RunRuntime, Set, SetRef,
    SetRequirement,
};
use anyhow::{Context, Result};
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Read-only configuration endpoint, probed by every command
pub const CONF_ENDPOINT: &str = "/almaws/v1/conf";

/// Bibliographic endpoint, probed for write access by mutating commands
pub const BIBS_ENDPOINT: &str = "/almaws/v1/bibs";

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub key: String,
    pub server: String,
    pub threshold: u64,
    pub workers: Option<usize>,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn client_config(&self) -> Result<ClientConfig> {
        if self.key.trim().is_empty() {
            anyhow::bail!("an API key is required");
        }
        let mut config = ClientConfig::new(self.key.trim())
            .with_server(&self.server)?
            .with_threshold(self.threshold);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        Ok(config)
    }
}

/// One command invocation: the runtime, its client and the run's root token
pub struct Session {
    runtime: RunRuntime,
    pub client: AlmaClient,
    pub cancel: CancellationToken,
}

impl Session {
    /// Build the client and confirm the key has the access the command needs.
    pub async fn open(globals: &GlobalOptions, read: &[&str], write: &[&str]) -> Result<Self> {
        let config = globals.client_config()?;
        let runtime = RunRuntime::new(config.threshold, true);
        let progress: Arc<dyn ProgressObserver> = Arc::new(CliProgress::new(globals.quiet));
        let client = AlmaClient::new(config, runtime.budget())?.with_progress(progress);
        let cancel = runtime.budget().token().clone();

        if let Err(e) = client.check_api_and_key(&cancel, read, write).await {
            runtime.shutdown().await;
            return Err(e).context("the API key could not be used with the requested endpoints");
        }

        Ok(Self {
            runtime,
            client,
            cancel,
        })
    }

    /// Resolve a set, check its shape and fetch all of its members.
    ///
    /// The session is handed back on success and shut down on failure.
    pub async fn members(
        self,
        set_ref: &SetRef,
        requirement: &SetRequirement,
    ) -> Result<(Self, Set, Vec<Member>)> {
        match self.resolve_members(set_ref, requirement).await {
            Ok((set, members)) => Ok((self, set, members)),
            Err(e) => {
                self.runtime.shutdown().await;
                Err(e)
            }
        }
    }

    async fn resolve_members(
        &self,
        set_ref: &SetRef,
        requirement: &SetRequirement,
    ) -> Result<(Set, Vec<Member>)> {
        let set = self.client.resolve_set(&self.cancel, set_ref).await?;
        requirement.check(&set)?;

        let outcome = self.client.fetch_all_members(&self.cancel, &set).await;
        if !outcome.is_clean() {
            report_failures(&outcome.failures);
            anyhow::bail!(
                "{} error(s) occured when retrieving the members of '{}' (ID {})",
                outcome.failure_count(),
                set.name,
                set.id
            );
        }
        log::info!("{} members found in set {}.", outcome.succeeded.len(), set.name);
        Ok((set, outcome.succeeded))
    }

    /// End the run. Fails if it was stopped early or if any item failed.
    pub async fn close(self, failures: &[ApiError], doing: &str) -> Result<()> {
        let stopped = self.runtime.shutdown().await;
        report_failures(failures);
        if let Some(reason) = stopped {
            anyhow::bail!("run stopped early: {}", reason);
        }
        if !failures.is_empty() {
            anyhow::bail!("{} error(s) occured when {}", failures.len(), doing);
        }
        Ok(())
    }
}

/// Log every failure on stderr
pub fn report_failures(failures: &[ApiError]) {
    for failure in failures {
        log::error!("{}", failure);
    }
}

/// CSV writer on stdout
pub fn csv_writer() -> csv::Writer<io::Stdout> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(io::stdout())
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Log whether the run will mutate anything
pub fn announce_mode(dry_run: bool) {
    if dry_run {
        log::warn!("Running in dry run mode, no changes will be made in Alma.");
    } else {
        log::warn!("WARNING: Not running in dry run mode, changes will be made in Alma!");
    }
}

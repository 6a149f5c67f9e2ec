//! Wiring of the infrastructure adapters into the core services

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use notaryflow_core::{
    BundlePackager, CodeSigner, ExternalToolRunner, NotarizationClient, NotarizationService,
    PollingEngine, Preparation, Stapler,
};
use notaryflow_domain::Config;
use notaryflow_infra::{
    config, FileSubmissionLedger, FileTicketWriter, HttpClient, HttpLogFetcher,
    TokioProcessRunner,
};

/// Loaded configuration plus the shared tool runner.
pub struct App {
    config: Config,
    runner: Arc<dyn ExternalToolRunner>,
}

impl App {
    /// Load configuration and apply command line overrides.
    pub fn load(path: Option<PathBuf>, timeout_secs: Option<u64>) -> anyhow::Result<Self> {
        let mut config = config::load(path).context("failed to load configuration")?;
        if let Some(secs) = timeout_secs {
            config.polling.deadline_secs = Some(secs);
        }

        tracing::debug!(?config, "Configuration loaded");

        let runner: Arc<dyn ExternalToolRunner> =
            Arc::new(TokioProcessRunner::from_config(&config.tools));
        Ok(Self { config, runner })
    }

    pub fn service(&self) -> anyhow::Result<NotarizationService> {
        let client = NotarizationClient::from_config(self.runner.clone(), &self.config)
            .context("notary credentials are incomplete")?;
        let http = HttpClient::from_config(&self.config.http)?;

        let engine = PollingEngine::new(
            Arc::new(client.clone()),
            Arc::new(HttpLogFetcher::new(http)),
            Arc::new(FileTicketWriter::new(&self.config.paths.output_dir)),
            self.config.polling.clone(),
        );
        let ledger = Arc::new(FileSubmissionLedger::new(&self.config.paths.ledger_path));

        Ok(NotarizationService::new(client, ledger, engine))
    }

    pub fn signer(&self) -> CodeSigner {
        CodeSigner::from_config(self.runner.clone(), &self.config)
    }

    pub fn preparation(&self) -> Preparation {
        Preparation::new(
            self.signer(),
            BundlePackager::from_config(self.runner.clone(), &self.config),
        )
    }

    pub fn stapler(&self) -> Stapler {
        Stapler::from_config(self.runner.clone(), &self.config)
    }
}

//! Notary service client built on the external tool runner

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use notaryflow_domain::constants::REDACTED;
use notaryflow_domain::{Artifact, Config, NotaryError, Result, StatusRecord, SubmissionRecord};
use tracing::{debug, info, instrument, warn};

use super::parser::{parse_request_id, parse_status};
use super::ports::{ExternalToolRunner, StatusQuery};

/// Submits artifacts and queries their status through `xcrun altool`.
#[derive(Clone)]
pub struct NotarizationClient {
    runner: Arc<dyn ExternalToolRunner>,
    xcrun: String,
    apple_id: String,
    password: String,
}

impl NotarizationClient {
    pub fn new(
        runner: Arc<dyn ExternalToolRunner>,
        xcrun: impl Into<String>,
        apple_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self { runner, xcrun: xcrun.into(), apple_id: apple_id.into(), password: password.into() }
    }

    /// Build a client from the `tools` and `credentials` sections.
    ///
    /// # Errors
    /// Returns `NotaryError::Config` if the Apple ID or password is missing.
    pub fn from_config(runner: Arc<dyn ExternalToolRunner>, config: &Config) -> Result<Self> {
        let (apple_id, password) = config.credentials.require()?;
        Ok(Self::new(runner, config.tools.xcrun.clone(), apple_id, password))
    }

    /// Arguments for uploading `artifact`.
    pub fn submit_arguments(&self, artifact: &Artifact) -> Vec<String> {
        let mut args = vec![
            "altool".to_string(),
            "--notarize-app".to_string(),
            "--primary-bundle-id".to_string(),
            artifact.bundle_id.clone(),
        ];
        self.push_credentials(&mut args);
        args.push("--file".to_string());
        args.push(artifact.path.display().to_string());
        args
    }

    /// Arguments for checking the status of `request_id`.
    pub fn query_arguments(&self, request_id: &str) -> Vec<String> {
        let mut args =
            vec!["altool".to_string(), "--notarization-info".to_string(), request_id.to_string()];
        self.push_credentials(&mut args);
        args
    }

    fn push_credentials(&self, args: &mut Vec<String>) {
        args.extend(["-u".to_string(), self.apple_id.clone()]);
        args.extend(["-p".to_string(), self.password.clone()]);
    }

    /// Upload one artifact.
    ///
    /// A response without a request id is not an error: the returned record
    /// carries an empty request id and is never polled.
    ///
    /// # Errors
    /// Returns `NotaryError::ToolInvocation` if the tool could not be run.
    #[instrument(skip(self, artifact), fields(bundle_id = %artifact.bundle_id))]
    pub async fn submit(&self, artifact: &Artifact) -> Result<SubmissionRecord> {
        let args = self.submit_arguments(artifact);
        debug!(program = %self.xcrun, args = ?redact_arguments(&args), "Submitting artifact");

        let output = self.runner.run(&self.xcrun, &args, None).await?;
        let request_id = parse_request_id(&output.combined());

        if request_id.is_empty() {
            warn!(
                path = %artifact.path.display(),
                exit_code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "No request id in submission output"
            );
        } else {
            info!(request_id = %request_id, exit_code = ?output.exit_code, "Artifact submitted");
        }

        Ok(SubmissionRecord::new(artifact.bundle_id.clone(), request_id))
    }

    /// Query the status of one submission.
    ///
    /// # Errors
    /// Returns `NotaryError::InvalidInput` for an empty request id and
    /// `NotaryError::ToolInvocation` if the tool could not be run.
    pub async fn query(&self, bundle_id: &str, request_id: &str) -> Result<StatusRecord> {
        if request_id.trim().is_empty() {
            return Err(NotaryError::InvalidInput(format!(
                "no request id to query for {bundle_id}"
            )));
        }

        let args = self.query_arguments(request_id);
        let output = self.runner.run(&self.xcrun, &args, None).await?;

        let mut record = parse_status(&output.combined());
        record.bundle_id = bundle_id.to_string();
        if record.request_id.is_empty() {
            record.request_id = request_id.to_string();
        }

        debug!(
            bundle_id,
            request_id,
            status = %record.status,
            status_code = ?record.status_code,
            exit_code = ?output.exit_code,
            "Status queried"
        );

        Ok(record)
    }
}

impl fmt::Debug for NotarizationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotarizationClient")
            .field("xcrun", &self.xcrun)
            .field("apple_id", &self.apple_id)
            .field("password", &REDACTED)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StatusQuery for NotarizationClient {
    async fn query(&self, bundle_id: &str, request_id: &str) -> Result<StatusRecord> {
        NotarizationClient::query(self, bundle_id, request_id).await
    }
}

/// Copy of `args` with the value following `-p` replaced, for logging.
pub fn redact_arguments(args: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut hide_next = false;

    for arg in args {
        if hide_next {
            redacted.push(REDACTED.to_string());
            hide_next = false;
            continue;
        }
        hide_next = arg == "-p" || arg == "--password";
        redacted.push(arg.clone());
    }

    redacted
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use notaryflow_domain::{NotarizationStatus, ToolOutput};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct CannedRunner {
        output: ToolOutput,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl CannedRunner {
        fn with_stdout(stdout: &str) -> Self {
            Self {
                output: ToolOutput { exit_code: Some(0), stdout: stdout.into(), stderr: String::new() },
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExternalToolRunner for CannedRunner {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            _working_dir: Option<&Path>,
        ) -> Result<ToolOutput> {
            self.calls.lock().push((program.to_string(), args.to_vec()));
            Ok(self.output.clone())
        }
    }

    fn client(runner: Arc<CannedRunner>) -> NotarizationClient {
        NotarizationClient::new(runner, "xcrun", "builder@example.com", "abcd-efgh")
    }

    #[tokio::test]
    async fn submit_builds_altool_invocation() {
        let runner = Arc::new(CannedRunner::with_stdout(
            "No errors uploading 'Tableau-Public.zip'.\nRequestUUID = 6e61ea74-7e69-4d47-906a-32dc93968342\n",
        ));
        let artifact = Artifact::from_path("/out/zips/Tableau-Public.zip").expect("artifact");

        let record = client(runner.clone()).submit(&artifact).await.expect("submit");
        assert_eq!(record, SubmissionRecord::new("Tableau.Public", "6e61ea74-7e69-4d47-906a-32dc93968342"));

        let calls = runner.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "xcrun");
        assert_eq!(
            calls[0].1,
            vec![
                "altool",
                "--notarize-app",
                "--primary-bundle-id",
                "Tableau.Public",
                "-u",
                "builder@example.com",
                "-p",
                "abcd-efgh",
                "--file",
                "/out/zips/Tableau-Public.zip",
            ]
        );
    }

    #[tokio::test]
    async fn submit_without_request_id_records_empty_id() {
        let runner = Arc::new(CannedRunner {
            output: ToolOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "*** Error: Unable to upload your app for notarization.".into(),
            },
            ..Default::default()
        });
        let artifact = Artifact::from_path("/out/Tool.dmg").expect("artifact");

        let record = client(runner).submit(&artifact).await.expect("submit");
        assert!(!record.is_submitted());
        assert_eq!(record.bundle_id, "Tool");
    }

    #[tokio::test]
    async fn query_tags_record_with_bundle_id() {
        let runner = Arc::new(CannedRunner::with_stdout("        Status: in progress\n"));

        let record = client(runner.clone()).query("Tableau.Public", "req-1").await.expect("query");
        assert_eq!(record.bundle_id, "Tableau.Public");
        assert_eq!(record.request_id, "req-1");
        assert_eq!(record.status, NotarizationStatus::Pending);

        let calls = runner.calls.lock();
        assert_eq!(&calls[0].1[..3], ["altool", "--notarization-info", "req-1"]);
    }

    #[tokio::test]
    async fn query_rejects_empty_request_id() {
        let runner = Arc::new(CannedRunner::default());
        let err = client(runner.clone()).query("Tableau.Public", " ").await.unwrap_err();
        assert!(matches!(err, NotaryError::InvalidInput(_)));
        assert!(runner.calls.lock().is_empty());
    }

    #[test]
    fn from_config_requires_credentials() {
        let runner: Arc<dyn ExternalToolRunner> = Arc::new(CannedRunner::default());
        let err = NotarizationClient::from_config(runner, &Config::default()).unwrap_err();
        assert!(matches!(err, NotaryError::Config(_)));
    }

    #[test]
    fn password_is_redacted_in_logs() {
        let args: Vec<String> =
            ["altool", "-u", "me@example.com", "-p", "secret", "--file", "a.zip"]
                .iter()
                .map(ToString::to_string)
                .collect();
        let redacted = redact_arguments(&args);
        assert_eq!(redacted[4], REDACTED);
        assert_eq!(redacted[6], "a.zip");

        let debug = format!("{:?}", client(Arc::new(CannedRunner::default())));
        assert!(!debug.contains("abcd-efgh"));
    }
}

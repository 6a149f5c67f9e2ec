//! End-to-end batch run against a stand-in notary tool script, a mock log
//! server and the file-backed ledger and ticket writer.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notaryflow_core::{NotarizationClient, NotarizationService, PollingEngine, SubmissionLedger};
use notaryflow_domain::{Artifact, PollingConfig, SubmissionRecord};
use notaryflow_infra::{
    FileSubmissionLedger, FileTicketWriter, HttpClient, HttpLogFetcher, TokioProcessRunner,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCEPTED_LOG: &str = r#"{"status":"Accepted","ticketContents":[{"path":"Tableau Public.app"}]}"#;
const REJECTED_LOG: &str = r#"{"status":"Invalid","issues":[{"severity":"error","message":"The binary is not signed."}]}"#;

fn fake_notary_tool(dir: &Path, log_base: &str) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
case "$2" in
  --notarize-app)
    case "$4" in
      Tableau.Public) echo "No errors uploading."; echo "RequestUUID = public-request" ;;
      Tableau.Reader) echo "RequestUUID = reader-request" ;;
      *) echo "*** Error: Unable to upload your app." >&2; exit 1 ;;
    esac ;;
  --notarization-info)
    case "$3" in
      public-request)
        printf '          Date: 2019-10-07 19:14:25 +0000\n    LogFileURL: {log_base}/public.json\n   RequestUUID: public-request\n        Status: success\n   Status Code: 0\nStatus Message: Package Approved\n' ;;
      reader-request)
        printf '    LogFileURL: {log_base}/reader.json\n   RequestUUID: reader-request\n        Status: invalid\n   Status Code: 2\nStatus Message: Package Invalid\n' ;;
    esac ;;
esac
"#
    );

    let path = dir.join("xcrun");
    std::fs::write(&path, script).expect("write tool script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

#[tokio::test]
async fn batch_writes_ledger_and_tickets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACCEPTED_LOG))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reader.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REJECTED_LOG))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let xcrun = fake_notary_tool(dir.path(), &server.uri());
    let ledger = Arc::new(FileSubmissionLedger::new(dir.path().join("out/ledger.txt")));
    let tickets_dir = dir.path().join("out/tickets");

    let runner = Arc::new(TokioProcessRunner::new(Duration::from_secs(30)));
    let client = NotarizationClient::new(
        runner,
        xcrun.display().to_string(),
        "builder@example.com",
        "@keychain:AC_PASSWORD",
    );
    let http = HttpClient::builder().max_attempts(1).build().expect("http client");
    let engine = PollingEngine::new(
        Arc::new(client.clone()),
        Arc::new(HttpLogFetcher::new(http)),
        Arc::new(FileTicketWriter::new(&tickets_dir)),
        PollingConfig {
            initial_jitter_ms: 0,
            retry_delay_secs: 0,
            max_in_flight: 2,
            deadline_secs: Some(60),
        },
    );
    let service = NotarizationService::new(client, ledger.clone(), engine);

    let artifacts = vec![
        Artifact::from_path("/builds/Tableau-Public.dmg").unwrap(),
        Artifact::from_path("/builds/Tableau-Reader.pkg").unwrap(),
        Artifact::from_path("/builds/Tableau-Prep.pkg").unwrap(),
    ];

    let report = service
        .notarize(&artifacts, &CancellationToken::new())
        .await
        .expect("batch should finish");

    assert_eq!(report.waves, 1);
    assert_eq!(report.tickets_written, vec!["Tableau.Public".to_string()]);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].bundle_id, "Tableau.Reader");
    assert_eq!(report.submission_failures, vec!["Tableau.Prep".to_string()]);
    assert!(report.is_complete());

    let ticket = std::fs::read_to_string(tickets_dir.join("Tableau.Public.notarization.json"))
        .expect("ticket for the accepted artifact");
    assert_eq!(ticket, ACCEPTED_LOG);
    assert!(!tickets_dir.join("Tableau.Reader.notarization.json").exists());

    assert_eq!(
        ledger.load_all().await.unwrap(),
        vec![
            SubmissionRecord::new("Tableau.Public", "public-request"),
            SubmissionRecord::new("Tableau.Reader", "reader-request"),
            SubmissionRecord::new("Tableau.Prep", ""),
        ]
    );
}

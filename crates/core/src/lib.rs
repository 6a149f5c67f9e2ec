//! # notaryflow Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for tools, ledgers and result stores
//! - Tool output parsing
//! - The submission client and the wave-based polling engine
//! - Preparation (signing, packaging) and stapling steps
//!
//! ## Architecture Principles
//! - Only depends on `notaryflow-domain`
//! - No process spawning, HTTP, or file-system code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod notarization;
pub mod preparation;
pub mod stapling;

// Re-export specific items to avoid ambiguity
pub use notarization::engine::{PollingEngine, PollingError};
pub use notarization::ports::{
    ExternalToolRunner, LogFetcher, StatusQuery, SubmissionLedger, TicketStore,
};
pub use notarization::{
    artifacts_from_lines, parse_request_id, parse_status, NotarizationClient,
    NotarizationService,
};
pub use preparation::{BundlePackager, CodeSigner, Preparation, SignatureState, SigningOutcome};
pub use stapling::{is_stapleable, StapleResult, Stapler};

//! File-system persistence: the submission ledger, ticket documents and the
//! binary list input.

pub mod binary_list;
pub mod ledger;
pub mod tickets;

pub use binary_list::read_binary_list;
pub use ledger::FileSubmissionLedger;
pub use tickets::FileTicketWriter;

//! Mock collaborators for tests and downstream consumers.
//!
//! Gated behind the `test-utils` feature (on by default). Each mock
//! records the calls it receives and can be constructed in a failing
//! mode to exercise the fail-open/fail-closed rules of the workflow.

mod notifier;
mod proof_store;

pub use notifier::{MockNotifier, NotificationRecord};
pub use proof_store::MockProofStore;

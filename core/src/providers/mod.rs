//! External collaborator traits and in-crate implementations.
//!
//! The allocation core calls out to three collaborators: a clock, a
//! notification sender, and a proof-of-payment store. Each is a trait so
//! tests and demos can swap deterministic or in-memory versions for the
//! real transport-backed ones.

mod clock;
mod notifier;
mod proof_store;

pub use clock::{Clock, SystemClock};
pub use notifier::{ConsoleNotifier, Notifier};
pub use proof_store::{MemoryProofStore, ProofStore};

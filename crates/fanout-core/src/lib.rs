pub mod config;
pub mod logging;

pub mod aggregator;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod gate;
pub mod outcome;
pub mod reporter;
pub mod work;

pub use aggregator::OutcomeAggregator;
pub use dispatcher::{Dispatcher, RunSummary};
pub use error::DispatchError;
pub use gate::{AdmissionGate, Permit};
pub use outcome::{FailureReason, Outcome};
pub use reporter::{Reporter, ReporterHandle};
pub use work::WorkFunction;

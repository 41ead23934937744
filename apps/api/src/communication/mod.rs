//! Communication Generator — interview and rejection emails produced through
//! the extraction gateway, validated, retried, and optionally dispatched.

pub mod generator;
mod prompts;
pub mod transport;

pub use generator::{CommunicationGenerator, DeliveryReport, EmailContext, EmailKind, MatchDetails};
pub use transport::{EmailTransport, SesTransport};

//! Synthetic flights and the HTTP client used to replay them.

pub mod client;
pub mod paths;
pub mod scenarios;

pub use client::TaskClient;
pub use paths::{FlightPath, FlightProfile, TaskFlight};
pub use scenarios::Demo;

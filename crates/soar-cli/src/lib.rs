//! Soar CLI - Command line tools for the soaring task engine.
//!
//! Binaries:
//! - replay: fly a task locally through the engine and print what happened
//! - send_track: stream a synthetic flight to a running task server

pub mod sim;

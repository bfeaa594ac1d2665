//! Background loops for continuous processing.

pub mod calculation_loop;
pub mod target_loop;

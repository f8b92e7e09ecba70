//! Background tasks.

pub mod scheduler;

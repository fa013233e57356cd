//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Sweeper: Purges physically expired items from the in-process store

mod sweeper;

pub use sweeper::spawn_sweeper;

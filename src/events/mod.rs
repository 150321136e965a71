//! Outbound engine events
//!
//! This module provides:
//! - `EngineEvent`: typed lifecycle and processing events
//! - `EventEmitter`: the sink trait the engine writes events onto
//! - `EventBus`: broadcast channel distributing events to observers

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{EngineEvent, EngineEventKind, EventEmitter};

//! Document change events
//!
//! This module provides:
//! - `DocumentEvent`: created / updated / deleted changes with snapshots
//! - `DocumentPath`: the `projects/{id}[/steps/{id}]` document addressing
//! - `EventBus`: broadcast channel feeding the trigger dispatcher

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{Document, DocumentEvent, DocumentPath, EventEmitter};

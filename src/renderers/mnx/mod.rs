//! MNX export
//!
//! ```text
//! Score (resolved)
//!   ↓ [MnxWriter]
//! MnxDocument (serde model)
//!   ↓ [serde_json]
//! MNX JSON text
//! ```

pub mod duration;
pub mod types;
pub mod writer;

pub use duration::{encode_note_value, note_value_base};
pub use types::*;
pub use writer::{write_mnx, MnxWriter};

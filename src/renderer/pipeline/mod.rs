//! Program management
//!
//! - `ProgramCache`: reference-counted program storage keyed by `ProgramKey`
//! - `program_key`: structured shader-relevant keys and build descriptors
//! - `program_id`: strongly-typed handles

pub mod cache;
pub mod program_id;
pub mod program_key;

pub use cache::{ProgramCache, ProgramEntry};
pub use program_id::ProgramId;
pub use program_key::{ProgramDescriptor, ProgramKey, ProgramMode, fx_hash_key};
pub use crate::scene::ShaderCores;

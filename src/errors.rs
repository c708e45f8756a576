//! Error Types
//!
//! This module defines the error types used throughout the display scheduler.
//!
//! # Overview
//!
//! The main error type [`DisplayError`] covers the failure modes that the
//! scheduler reports upward instead of swallowing:
//! - GPU program allocation failures
//! - Configuration errors coming from the state-core layer
//! - Pick / ray-pick buffer setup failures
//! - Malformed tag selectors
//!
//! Stale cache entries (a program or chunk whose hash no longer matches the
//! object's current state) are *not* errors: they are replaced silently when
//! the object is recompiled.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_display::errors::{DisplayError, Result};
//!
//! match display.pick(&mut device, request) {
//!     Err(DisplayError::PickBufferIncomplete { .. }) => disable_picking(),
//!     other => other?,
//! };
//! ```

use thiserror::Error;

use crate::renderer::device::PickTargetKind;
use crate::scene::StateId;

/// The main error type for the display scheduler.
#[derive(Error, Debug)]
pub enum DisplayError {
    // ========================================================================
    // Resource Allocation Errors
    // ========================================================================
    /// The device refused to create a GPU program for a shader configuration.
    ///
    /// The program is not registered; the caller decides whether to skip the
    /// object or abort.
    #[error("Failed to create GPU program for {key}: {reason}")]
    ProgramCreationFailed {
        /// Debug rendering of the program key
        key: String,
        /// Device-supplied reason
        reason: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The geometry declares a primitive type the pipeline cannot draw.
    #[error("Unsupported primitive type: {0}")]
    UnsupportedPrimitive(String),

    /// A geometry core lacks a field that drawing requires.
    #[error("Geometry {geometry:?} is missing required field `{field}`")]
    MissingGeometryField {
        /// Offending geometry core
        geometry: StateId,
        /// Name of the missing field
        field: &'static str,
    },

    /// The tag selector could not be compiled into a regular expression.
    #[error("Invalid tag selector: {0}")]
    InvalidTagSelector(#[from] regex::Error),

    // ========================================================================
    // Picking Errors
    // ========================================================================
    /// An off-screen pick target could not be completed by the device.
    ///
    /// Distinct from other errors so callers can turn picking off without
    /// tearing down the renderer.
    #[error("Pick buffer ({kind:?}, {width}x{height}) is incomplete: {reason}")]
    PickBufferIncomplete {
        /// Which pick buffer failed
        kind: PickTargetKind,
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
        /// Device-supplied reason
        reason: String,
    },
}

/// Alias for `Result<T, DisplayError>`.
pub type Result<T> = std::result::Result<T, DisplayError>;

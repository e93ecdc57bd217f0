//! # Architecture Abstraction Layer
//!
//! Implementations of [`crate::context::ContextSwitch`]. Currently the
//! Cortex-M4 port; other architectures are added as sibling modules.

pub mod cortex_m4;

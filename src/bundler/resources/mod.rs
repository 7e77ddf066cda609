//! Bundled resources and icon handling.

pub mod icons;

//! Archive writers: runnable jars and generic app bundles.

pub mod bundles;
pub mod jar;

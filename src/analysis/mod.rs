//! The in-memory analysis core.
//!
//! Every function here is pure over an immutable configuration; I/O lives in
//! [`crate::scrapers`] and [`crate::outputs`].

pub mod classifier;
pub mod context;
pub mod summarizer;
pub mod text;
pub mod trending;

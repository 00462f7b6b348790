//! The conversion pipeline, one module per stage:
//!
//! ```text
//! locate ──► fetch ──► callout ──► parse ──► inline ──► assemble
//!  (pure)   (network)   (pure)     (pure)   (network)    (pure)
//! ```
//!
//! Each stage consumes the previous stage's artifact and produces a new
//! one; nothing is mutated across stage boundaries. Only `fetch` (the
//! document) and `inline` (its images) touch the network, and `inline` is
//! the only stage whose failures are non-fatal.

pub mod assemble;
pub mod callout;
pub mod fetch;
pub mod inline;
pub mod locate;
pub mod parse;

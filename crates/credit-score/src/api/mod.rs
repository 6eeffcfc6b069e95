//! HTTP surface for scoring, accounts and prediction history.

pub mod router;

#[cfg(test)]
mod tests;

pub use router::{credit_router, ApiState};

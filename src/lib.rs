//! Challenge Engine: randomized survival-game challenges under a trait
//! point budget.
//!
//! Draws positive and negative traits until a running point value lands on
//! a difficulty's target, and tracks the five-stage stream challenge where a
//! player spends a shared point pool on locations, trait batches and
//! missions.

pub mod core;
pub mod schema;

pub mod allocator;
pub mod finisher;
pub mod generator;
pub mod rules;
pub mod session;

pub mod challenge;
pub mod stage;
pub mod trait_kind;

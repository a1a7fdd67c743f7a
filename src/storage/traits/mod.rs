//! Storage backend traits.

mod relational;

pub use relational::RelationalStore;

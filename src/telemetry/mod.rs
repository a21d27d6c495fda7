// Upstream data plumbing: GRID GraphQL client, normalized record types, and
// the read-through cache in front of them.

pub mod cache;
pub mod grid;
pub mod types;

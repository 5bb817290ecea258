//! Graph representation and algorithms module

pub mod tag;
pub mod adjacency;
pub mod traversal;
pub mod betweenness;

pub use adjacency::{Graph, Neighbours};
pub use betweenness::AnnotatedGraph;
pub use tag::{NullTag, Scored, Tag};

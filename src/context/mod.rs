//! Relationship context extraction.
//!
//! Turns free-text relationship context into a structured record using a
//! table of lexical patterns. Never touches the network or a model.

mod extractor;

pub use extractor::{ContextScope, RelationshipContext, extract_relationship_context};

//! Identifier helpers shared by the record model and the resolver.

pub mod doi;
pub mod isbn;

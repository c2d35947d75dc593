//! Utility modules shared by sources and the resolver.

mod http;

pub use http::HttpClient;

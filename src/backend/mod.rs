//! Remote collaborators of the funnel: product matching and contact delivery.

pub mod catalog;
pub mod http;
pub mod interface;

pub use catalog::{LocalCatalog, LoggingContactSink};
pub use http::HttpBackend;
pub use interface::{
    BackendError, ContactSink, ContactSubmission, MatchRequest, Product, ProductMatcher,
};

//! Wire types for the inference service

pub mod request;
pub mod response;

pub use request::{PredictRequest, RawFeatureInput};
pub use response::ErrorReply;

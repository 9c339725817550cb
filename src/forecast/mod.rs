pub mod engine;
pub mod error;
pub mod features;
pub mod service;

pub use engine::*;
pub use error::*;
pub use features::{FeatureKey, FeatureLayout};
pub use service::*;

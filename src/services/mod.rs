pub mod data_persistance;
pub mod droid;
pub mod founder_extractor;
pub mod link_discoverer;
pub mod openai_client;
pub mod portfolio_pipeline;

pub use data_persistance::*;
pub use droid::*;
pub use founder_extractor::*;
pub use link_discoverer::*;
pub use openai_client::*;
pub use portfolio_pipeline::*;

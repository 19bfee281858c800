pub mod activity;
pub mod config;
pub mod countdown;
pub mod error;
pub mod messages;
pub mod metadata;
pub mod query;
pub mod store;
pub mod sync;
pub mod tx;
pub mod types;
pub mod wallet;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{
    Error,
    Result,
};

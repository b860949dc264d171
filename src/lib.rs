pub mod coverage;
pub mod error;
pub mod io;
pub mod mapping;
pub mod report;
pub mod sampler;
pub mod score;
pub mod selector;
pub mod tally;

pub use error::{GuideCoverError, Result};

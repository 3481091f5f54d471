//! A TAGE conditional branch direction predictor, along with the machinery
//! needed to evaluate it against branch traces.

pub mod branch;
pub mod error;
pub mod history;
pub mod predictor;
pub mod stats;
pub mod trace;

pub use branch::*;
pub use error::*;
pub use history::*;
pub use predictor::*;
pub use trace::*;

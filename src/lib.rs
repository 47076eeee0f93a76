//! Academic performance aggregation: attendance statistics, final grades,
//! teacher ratings and attendance distributions computed from plain record
//! sets. The engine modules are pure; `source` and `db` load the records.

pub mod assignments;
pub mod attendance;
pub mod db;
pub mod distribution;
pub mod error;
pub mod grade;
pub mod models;
pub mod ratings;
pub mod report;
pub mod scope;
pub mod source;

pub use error::{Result, ValidationError};
pub use scope::Scope;

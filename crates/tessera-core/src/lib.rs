//! Core domain types shared by the tessera index and query crates.

pub mod column;
pub mod config;
pub mod error;
pub mod ids;
pub mod key;
pub mod operator;
pub mod stream;

pub use column::ColumnSemantics;
pub use config::{IndexConfig, QueryConfig, TesseraConfig};
pub use error::{Error, Result};
pub use ids::{DataFileId, QueryId};
pub use key::{KeyRange, RowKey, Term};
pub use operator::{BooleanOperator, Operator};
pub use stream::{KeyStream, VecStream};

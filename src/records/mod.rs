//! Result Records
//!
//! Normalizes store results into flat [`Record`]s:
//!
//! ```text
//! Series { tags: {tag1: foo}, columns: [time, mean_value], values }
//!   → Record { timestamp, value, tag1 }
//! ```
//!
//! Rows are mapped lazily through [`RecordStream`].

mod error;
mod mapper;
mod record;

pub use error::{RecordError, RecordResult};
pub use mapper::{parse_timestamp, RecordStream, ResultMapper};
pub use record::{Record, Value};

pub mod loader;
pub mod types;

pub use loader::{load_frame, parse_timestamp, time_index_from_frame, LoaderError};
pub use types::{TimeIndex, TimeWindow};

pub mod error;
pub mod loader;
pub(crate) mod retry;
pub mod schema;
pub mod tabular;

pub use error::IngestError;
pub use loader::{DataOrigin, DatasetLoader, LoadWarning, LoadedDataset, Location, LoaderOptions};
pub use schema::{normalize_records, Axis, FieldResolver, NormalizeStats};
pub use tabular::{
    dedupe_field_names, parse_delimited, parse_payload, parse_structured, write_delimited,
};

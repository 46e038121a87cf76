pub mod error;
pub mod geocoder;
pub mod merge;
pub mod persist;
pub mod pipeline;
pub mod refresh;
pub mod rows;

pub use error::EnrichError;
pub use geocoder::{GeoPoint, Geocoder, NominatimGeocoder};
pub use merge::{
    merge_records, needs_merge, split_place, KeyCount, LoadMode, MergeKey, MergeReport,
    PlaceParts, ReferenceIndex,
};
pub use persist::{FilePersister, Persister};
pub use pipeline::{LoadOutcome, Pipeline, PipelineOptions, RefreshLocalOutcome};
pub use refresh::{geocode_and_persist, geocode_unlocated, RefreshReport};
pub use rows::{
    is_integer_literal, retain_integer_rows, retain_region_rows, sort_alphabetically,
    RegionRequirement,
};

//! The load pipeline: fetch, normalize, merge, row filters, sort.
//!
//! Steps run strictly in that order over one record set. A failed
//! reference fetch leaves the set unmerged and is reported as a warning.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use geolist_core::{AppConfig, Record, SourceDescriptor};
use geolist_ingest::{
    normalize_records, DataOrigin, DatasetLoader, FieldResolver, LoadWarning, Location,
    NormalizeStats,
};

use crate::error::EnrichError;
use crate::geocoder::Geocoder;
use crate::merge::{merge_records, needs_merge, LoadMode, MergeKey, MergeReport, ReferenceIndex};
use crate::persist::Persister;
use crate::refresh::{geocode_and_persist, RefreshReport};
use crate::rows::{retain_integer_rows, retain_region_rows, sort_alphabetically, RegionRequirement};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Applies `state_required` when set.
    pub region_filtering: bool,
    pub geocode_pause: Duration,
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            region_filtering: config.region_filtering,
            geocode_pause: Duration::from_millis(config.geocode_delay_ms),
        }
    }
}

/// Enriched, filtered and sorted records for one view.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub view: String,
    pub records: Vec<Record>,
    pub origin: DataOrigin,
    pub warnings: Vec<LoadWarning>,
    pub normalize: NormalizeStats,
    /// `None` when the view has no reference table.
    pub merge: Option<MergeReport>,
    /// Set only for [`LoadMode::Refresh`] loads that reached geocoding.
    pub refresh: Option<RefreshReport>,
    pub dropped_non_integer: usize,
    pub dropped_other_region: usize,
}

#[derive(Debug, Clone)]
pub struct RefreshLocalOutcome {
    pub saved_records: usize,
    pub target: PathBuf,
    pub outcome: LoadOutcome,
}

#[derive(Clone)]
pub struct Pipeline {
    loader: DatasetLoader,
    geocoder: Arc<dyn Geocoder>,
    persister: Arc<dyn Persister>,
    options: PipelineOptions,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("loader", &self.loader)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(
        loader: DatasetLoader,
        geocoder: Arc<dyn Geocoder>,
        persister: Arc<dyn Persister>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            loader,
            geocoder,
            persister,
            options,
        }
    }

    #[must_use]
    pub fn loader(&self) -> &DatasetLoader {
        &self.loader
    }

    /// Local file the view's dataset lives in, if it is not remote.
    #[must_use]
    pub fn local_target(&self, descriptor: &SourceDescriptor) -> Option<PathBuf> {
        let path = descriptor.file_path(self.loader.online())?;
        match self.loader.resolve_location(path) {
            Location::File(p) => Some(p),
            Location::Url(_) => None,
        }
    }

    /// Loads one view end to end.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Ingest`] when the dataset itself cannot be
    /// loaded. Reference, geocoding and persist failures are not errors.
    pub async fn load(
        &self,
        view: &str,
        descriptor: &SourceDescriptor,
        mode: LoadMode,
    ) -> Result<LoadOutcome, EnrichError> {
        let loaded = self.loader.load(view, descriptor).await?;
        let mut records = loaded.records;
        let mut warnings = loaded.warnings;

        let normalize = normalize_records(&mut records, &FieldResolver::for_descriptor(descriptor));

        let mut merge = None;
        let mut refresh = None;
        if let (Some(geo_dataset), Some(key)) = (
            descriptor.geo_dataset.as_deref(),
            MergeKey::from_descriptor(descriptor),
        ) {
            if needs_merge(&records) {
                match self.loader.fetch_reference(geo_dataset).await {
                    Ok(mut reference) => {
                        normalize_records(&mut reference, &FieldResolver::sniffing());
                        let index = ReferenceIndex::build(reference, &key, descriptor.region_target());
                        merge = Some(merge_records(&mut records, &index));
                    }
                    Err(e) => {
                        tracing::warn!(view, reference = geo_dataset, error = %e, "reference table unavailable");
                        warnings.push(LoadWarning::ReferenceUnavailable {
                            path: geo_dataset.to_owned(),
                            message: e.to_string(),
                        });
                    }
                }

                if mode == LoadMode::Refresh && needs_merge(&records) {
                    let target = self.local_target(descriptor);
                    refresh = Some(
                        geocode_and_persist(
                            &mut records,
                            &key,
                            self.geocoder.as_ref(),
                            self.persister.as_ref(),
                            target.as_deref(),
                            &descriptor.omit_fields(),
                            self.options.geocode_pause,
                        )
                        .await,
                    );
                }
            } else {
                tracing::debug!(view, "all records located, skipping geo merge");
                merge = Some(MergeReport::skipped(&records));
            }
        }

        let dropped_non_integer = match descriptor.int_required.as_deref() {
            Some(field) if !field.trim().is_empty() => retain_integer_rows(&mut records, field),
            _ => 0,
        };

        let dropped_other_region = match descriptor.state_required.as_deref() {
            Some(required) if !required.trim().is_empty() => {
                if self.options.region_filtering {
                    let requirement =
                        RegionRequirement::new(required, descriptor.address_column.as_deref());
                    retain_region_rows(&mut records, &requirement)
                } else {
                    tracing::debug!(view, required, "region filtering disabled, keeping all rows");
                    0
                }
            }
            _ => 0,
        };

        sort_alphabetically(&mut records, descriptor);

        tracing::info!(
            view,
            records = records.len(),
            dropped_non_integer,
            dropped_other_region,
            warnings = warnings.len(),
            "view loaded"
        );
        Ok(LoadOutcome {
            view: view.to_owned(),
            records,
            origin: loaded.origin,
            warnings,
            normalize,
            merge,
            refresh,
            dropped_non_integer,
            dropped_other_region,
        })
    }

    /// Pulls the view's API data into its local file, then reloads the view
    /// in refresh mode.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::RefreshUnavailable`] when the view has no API
    /// or no local file, and the fetch or save error otherwise.
    pub async fn refresh_local(
        &self,
        view: &str,
        descriptor: &SourceDescriptor,
    ) -> Result<RefreshLocalOutcome, EnrichError> {
        let unavailable = |reason: &str| EnrichError::RefreshUnavailable {
            view: view.to_owned(),
            reason: reason.to_owned(),
        };
        let endpoint = descriptor
            .refresh_api()
            .ok_or_else(|| unavailable("no dataset_via_api or dataset_api_slow configured"))?;
        let target = self
            .local_target(descriptor)
            .ok_or_else(|| unavailable("dataset is not a local file"))?;

        let omit = descriptor.omit_fields();
        let mut records = self
            .loader
            .fetch_api_records(&self.loader.api_url(endpoint))
            .await?;
        for record in &mut records {
            for field in &omit {
                record.remove(field);
            }
        }
        self.persister.save(&records, &target, &omit).await?;
        tracing::info!(view, path = %target.display(), records = records.len(), "refreshed local dataset");

        let outcome = self.load(view, descriptor, LoadMode::Refresh).await?;
        Ok(RefreshLocalOutcome {
            saved_records: records.len(),
            target,
            outcome,
        })
    }
}

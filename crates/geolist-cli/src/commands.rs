//! Command handlers called from `main` once config is loaded.

use std::sync::Arc;

use anyhow::Context;
use geolist_core::{load_views_or_embedded, AppConfig};
use geolist_enrich::{FilePersister, NominatimGeocoder, Pipeline, PipelineOptions};
use geolist_ingest::DatasetLoader;
use geolist_view::descriptor::{ID_KEY, MAP_KEY, SEARCH_KEY};
use geolist_view::{
    reduce, FileSessionStore, FragmentRouter, ListingsSession, SessionOptions, SessionStore,
    ViewDescriptor,
};

use crate::terminal::TerminalSurfaces;

#[derive(Debug, Clone)]
pub(crate) struct LoadRequest {
    pub(crate) view: Option<String>,
    pub(crate) fragment: String,
    pub(crate) search: Option<String>,
    pub(crate) summarize: bool,
    pub(crate) page: usize,
    pub(crate) id: Option<String>,
    pub(crate) refresh: bool,
    pub(crate) use_cache: bool,
    pub(crate) json: bool,
}

impl LoadRequest {
    /// The starting descriptor: the given fragment with flag overrides.
    pub(crate) fn descriptor(&self) -> ViewDescriptor {
        let mut descriptor = ViewDescriptor::parse_fragment(&self.fragment);
        if let Some(view) = &self.view {
            descriptor.set(MAP_KEY, view.as_str());
        }
        if let Some(search) = &self.search {
            descriptor.set(SEARCH_KEY, search.as_str());
        }
        if self.summarize {
            descriptor.set_summarize(true);
        }
        if let Some(id) = &self.id {
            descriptor.set(ID_KEY, id.as_str());
        }
        descriptor
    }
}

fn build_pipeline(config: &AppConfig) -> anyhow::Result<Pipeline> {
    let loader = DatasetLoader::from_config(config).context("failed to build dataset loader")?;
    let geocoder = NominatimGeocoder::from_config(config).context("failed to build geocoder")?;
    Ok(Pipeline::new(
        loader,
        Arc::new(geocoder),
        Arc::new(FilePersister),
        PipelineOptions::from(config),
    ))
}

pub(crate) fn run_views(config: &AppConfig) {
    let catalog = load_views_or_embedded(&config.views_path);
    for (name, descriptor) in catalog.iter() {
        let source = descriptor
            .fast_api()
            .or_else(|| descriptor.file_path(config.online_mode))
            .unwrap_or("-");
        println!("{name}\t{}\t{source}", descriptor.title(name));
    }
}

/// Loads a view through a session and prints the requested page.
///
/// # Errors
///
/// Returns an error if the view cannot be resolved or its dataset cannot be
/// loaded. Reference, geocoding and cache failures only print warnings.
pub(crate) async fn run_load(config: &AppConfig, request: LoadRequest) -> anyhow::Result<()> {
    let catalog = load_views_or_embedded(&config.views_path);
    let pipeline = build_pipeline(config)?;
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(config.cache_dir.clone()));
    let router = FragmentRouter::new(request.descriptor().to_fragment());
    let options = SessionOptions {
        use_cache: request.use_cache && !request.refresh,
        ..SessionOptions::from(config)
    };

    let mut session = ListingsSession::new(
        catalog,
        pipeline,
        store,
        TerminalSurfaces::default(),
        router,
        options,
    );
    if !session.open().await? {
        anyhow::bail!("no view could be loaded");
    }
    if request.refresh {
        session.refresh().await?;
    }
    if request.page > 1 {
        session.set_page(request.page);
    }

    session.surfaces().print(request.json);
    println!("#{}", session.router().fragment());
    Ok(())
}

/// # Errors
///
/// Returns an error if the view is unknown or has no API to refresh from.
pub(crate) async fn run_refresh_local(config: &AppConfig, view: &str) -> anyhow::Result<()> {
    let catalog = load_views_or_embedded(&config.views_path);
    let descriptor = catalog
        .get(view)
        .ok_or_else(|| anyhow::anyhow!("view '{view}' not found"))?;
    let pipeline = build_pipeline(config)?;

    let result = pipeline.refresh_local(view, descriptor).await?;
    println!(
        "saved {} records to {}",
        result.saved_records,
        result.target.display()
    );
    if let Some(report) = &result.outcome.refresh {
        println!(
            "geocoded {}/{} places, {} records updated, persisted: {}",
            report.geocoded, report.queried, report.records_updated, report.persisted
        );
    }
    for warning in &result.outcome.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

pub(crate) fn run_fragment(fragment: &str, prior: Option<&str>) {
    let descriptor = ViewDescriptor::parse_fragment(fragment);
    for (key, value) in descriptor.iter() {
        println!("{key} = {value}");
    }
    println!("#{}", descriptor.to_fragment());
    if let Some(prior) = prior {
        for patch in reduce(&ViewDescriptor::parse_fragment(prior), &descriptor) {
            println!("{patch:?}");
        }
    }
}

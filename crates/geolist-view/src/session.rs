//! The listings session: owns the canonical and displayed record sets and
//! keeps them in step with the shared descriptor.
//!
//! Dataset switches run in two halves around the pipeline call:
//! [`ListingsSession::begin_switch`] hands out a [`PendingLoad`] carrying a
//! generation ticket, and [`ListingsSession::apply_loaded`] drops the result
//! when a newer switch has started in the meantime.

use std::sync::Arc;
use std::time::Instant;

use geolist_core::{AlwaysLoad, AppConfig, Record, Resolution, SourceDescriptor, ViewCatalog};
use geolist_enrich::{EnrichError, LoadMode, Pipeline};

use crate::cache::{CacheKey, CachedDataset, SessionStore};
use crate::debounce::{AdaptiveDebounce, Debounced};
use crate::descriptor::{ViewDescriptor, ID_KEY, MAP_KEY, SEARCH_KEY};
use crate::error::SessionError;
use crate::filter::{search, FilterState};
use crate::pagination::Pager;
use crate::phase::{LoadGuard, LoadTicket, Phase, RenderScope};
use crate::selection::resolve_record;
use crate::summarize::SummaryToggle;
use crate::surfaces::{map_points, DisplayFields, ListPage, Router, Surfaces};
use crate::sync::{reduce, StatePatch};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub namespace: String,
    pub page_size: usize,
    pub always_load: AlwaysLoad,
    /// Serve ordinary loads from the session cache when an entry exists.
    pub use_cache: bool,
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            namespace: config.cache_namespace.clone(),
            page_size: config.page_size,
            always_load: if config.always_load {
                AlwaysLoad::Enabled
            } else {
                AlwaysLoad::Disabled
            },
            use_cache: true,
        }
    }
}

/// A started dataset switch.
#[derive(Debug, Clone)]
pub struct PendingLoad {
    ticket: LoadTicket,
    descriptor: SourceDescriptor,
    cached: Option<CachedDataset>,
}

/// Records ready to become the canonical set.
#[derive(Debug, Clone, Default)]
pub struct LoadedView {
    pub records: Vec<Record>,
    pub warnings: Vec<String>,
    pub from_cache: bool,
}

impl PendingLoad {
    #[must_use]
    pub fn view(&self) -> &str {
        self.ticket.view()
    }

    /// Runs the pipeline, or serves the cached set for ordinary loads.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error when the dataset cannot be loaded.
    pub async fn load(&self, pipeline: &Pipeline, mode: LoadMode) -> Result<LoadedView, EnrichError> {
        if mode == LoadMode::Ordinary {
            if let Some(cached) = &self.cached {
                tracing::debug!(view = %self.view(), saved_at = %cached.saved_at, "serving cached dataset");
                return Ok(LoadedView {
                    records: cached.records.clone(),
                    warnings: Vec::new(),
                    from_cache: true,
                });
            }
        }

        let outcome = pipeline.load(self.view(), &self.descriptor, mode).await?;
        let mut warnings: Vec<String> = outcome.warnings.iter().map(ToString::to_string).collect();
        if let Some(merge) = &outcome.merge {
            let unmatched = merge.unmatched_records();
            if unmatched > 0 {
                warnings.push(format!(
                    "{unmatched} record(s) across {} place(s) could not be located",
                    merge.unmatched.len()
                ));
            }
            if !merge.ambiguous.is_empty() {
                let keys: Vec<&str> = merge.ambiguous.iter().map(|k| k.key.as_str()).collect();
                warnings.push(format!("ambiguous places left unmerged: {}", keys.join(", ")));
            }
        }
        if let Some(error) = outcome.refresh.as_ref().and_then(|r| r.persist_error.as_ref()) {
            warnings.push(format!("enriched data was not saved: {error}"));
        }
        Ok(LoadedView {
            records: outcome.records,
            warnings,
            from_cache: false,
        })
    }
}

#[derive(Debug, Clone)]
struct ActiveView {
    name: String,
    descriptor: SourceDescriptor,
    fields: DisplayFields,
}

pub struct ListingsSession<S, R> {
    catalog: ViewCatalog,
    pipeline: Pipeline,
    store: Arc<dyn SessionStore>,
    surfaces: S,
    router: R,
    options: SessionOptions,
    active: Option<ActiveView>,
    canonical: Vec<Record>,
    displayed: Vec<Record>,
    filter: FilterState,
    summary: SummaryToggle,
    pager: Pager,
    phase: Phase,
    guard: LoadGuard,
    observed: ViewDescriptor,
    debounce: AdaptiveDebounce,
}

impl<S: Surfaces, R: Router> ListingsSession<S, R> {
    #[must_use]
    pub fn new(
        catalog: ViewCatalog,
        pipeline: Pipeline,
        store: Arc<dyn SessionStore>,
        surfaces: S,
        router: R,
        options: SessionOptions,
    ) -> Self {
        let pager = Pager::new(options.page_size);
        Self {
            catalog,
            pipeline,
            store,
            surfaces,
            router,
            options,
            active: None,
            canonical: Vec::new(),
            displayed: Vec::new(),
            filter: FilterState::default(),
            summary: SummaryToggle::default(),
            pager,
            phase: Phase::Idle,
            guard: LoadGuard::default(),
            observed: ViewDescriptor::new(),
            debounce: AdaptiveDebounce::default(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn active_view(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }

    #[must_use]
    pub fn canonical(&self) -> &[Record] {
        &self.canonical
    }

    #[must_use]
    pub fn displayed(&self) -> &[Record] {
        &self.displayed
    }

    #[must_use]
    pub fn current_page(&self) -> &[Record] {
        self.pager.slice(&self.displayed)
    }

    #[must_use]
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    #[must_use]
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    #[must_use]
    pub fn is_summarized(&self) -> bool {
        self.summary.is_active()
    }

    #[must_use]
    pub fn observed(&self) -> &ViewDescriptor {
        &self.observed
    }

    #[must_use]
    pub fn surfaces(&self) -> &S {
        &self.surfaces
    }

    pub fn surfaces_mut(&mut self) -> &mut S {
        &mut self.surfaces
    }

    #[must_use]
    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut R {
        &mut self.router
    }

    /// The selected record, resolved against the displayed subset.
    #[must_use]
    pub fn selected(&self) -> Option<&Record> {
        let id = self.observed.id()?;
        let id_field = self.active.as_ref()?.descriptor.id_column.as_deref();
        resolve_record(&self.displayed, id, id_field).map(|(_, r)| r)
    }

    /// Opens the view named by the descriptor, else the last one used in
    /// this namespace, else the first catalog view.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Load`] when the dataset cannot be loaded.
    pub async fn open(&mut self) -> Result<bool, SessionError> {
        self.observed = self.router.read();
        let requested = match self.observed.map() {
            Some(name) => Some(name.to_owned()),
            None => self.remembered_view(),
        }
        .or_else(|| self.catalog.first().map(|(name, _)| name.to_owned()));

        match requested {
            Some(name) => self.switch_dataset(&name, LoadMode::Ordinary).await,
            None => {
                self.surfaces.show_warning("the view catalog is empty");
                Ok(false)
            }
        }
    }

    fn remembered_view(&self) -> Option<String> {
        match self.store.last_dataset(&self.options.namespace) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "could not read last dataset");
                None
            }
        }
    }

    /// Applies whatever changed in the router's descriptor since the last
    /// observation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Load`] when a requested dataset cannot be
    /// loaded.
    pub async fn sync_from_router(&mut self) -> Result<(), SessionError> {
        let next = self.router.read();
        let patches = reduce(&self.observed, &next);
        if patches.is_empty() {
            return Ok(());
        }
        tracing::debug!(patches = patches.len(), "descriptor changed");
        self.observed = next;

        if self.phase.is_loading() {
            // The landing load reads search, summarize, id and details from
            // the observed descriptor; only a new dataset starts work now.
            let switch = patches.into_iter().find_map(|patch| match patch {
                StatePatch::SwitchDataset(Some(name)) => Some(name),
                _ => None,
            });
            if let Some(name) = switch {
                self.switch_dataset(&name, LoadMode::Ordinary).await?;
            }
            return Ok(());
        }

        for patch in patches {
            match patch {
                StatePatch::SwitchDataset(Some(name)) => {
                    // The load applies search, summarize and selection from
                    // the freshly observed descriptor.
                    self.switch_dataset(&name, LoadMode::Ordinary).await?;
                    return Ok(());
                }
                StatePatch::SwitchDataset(None) => {}
                StatePatch::SetSearch(text) => {
                    self.debounce.cancel();
                    self.apply_search(text.unwrap_or_default(), RenderScope::Full);
                }
                StatePatch::SetSummarize(on) => self.apply_summarize(on),
                StatePatch::SelectRecord(_) => self.render_detail(),
                StatePatch::SetSubViews(views) => self.surfaces.show_sub_views(&views),
            }
        }
        Ok(())
    }

    /// Loads `requested` and makes it the active view.
    ///
    /// Returns `false` when nothing was applied: the view was not found or
    /// the load was superseded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Load`] when the dataset cannot be loaded.
    pub async fn switch_dataset(&mut self, requested: &str, mode: LoadMode) -> Result<bool, SessionError> {
        let Some(pending) = self.begin_switch(requested, mode) else {
            return Ok(false);
        };
        let loaded = pending.load(&self.pipeline, mode).await;
        self.apply_loaded(&pending, loaded)
    }

    /// Reloads the active view through the pipeline in refresh mode,
    /// bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveView`] before the first load, or the
    /// load error.
    pub async fn refresh(&mut self) -> Result<bool, SessionError> {
        let name = self
            .active_view()
            .map(str::to_owned)
            .ok_or(SessionError::NoActiveView)?;
        self.switch_dataset(&name, LoadMode::Refresh).await
    }

    /// Resolves `requested`, marks the session busy and starts a new load
    /// generation. Returns `None` when no view can be resolved.
    pub fn begin_switch(&mut self, requested: &str, mode: LoadMode) -> Option<PendingLoad> {
        let (name, descriptor) = match self.catalog.resolve(requested, self.options.always_load) {
            Resolution::Found { name, descriptor } => (name.to_owned(), descriptor.clone()),
            Resolution::Substituted { name, descriptor, .. } => {
                self.surfaces
                    .show_warning(&format!("view '{requested}' not found, showing '{name}'"));
                self.observed.set(MAP_KEY, name);
                self.router.write(&self.observed);
                (name.to_owned(), descriptor.clone())
            }
            Resolution::NotFound { requested } => {
                self.surfaces.show_not_found(&requested);
                return None;
            }
        };

        self.phase = if self.active.is_some() {
            Phase::SwitchingDataset
        } else {
            Phase::Loading
        };
        let ticket = self.guard.begin(&name);
        let cached = if self.options.use_cache && mode == LoadMode::Ordinary {
            self.cached(&name)
        } else {
            None
        };
        tracing::info!(view = %name, ?mode, cached = cached.is_some(), "loading view");
        Some(PendingLoad {
            ticket,
            descriptor,
            cached,
        })
    }

    fn cache_key(&self, view: &str) -> CacheKey {
        CacheKey::new(self.options.namespace.clone(), view)
    }

    fn cached(&self, view: &str) -> Option<CachedDataset> {
        match self.store.load(&self.cache_key(view)) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(view, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Installs a finished load. Returns `false` when the ticket is stale and
    /// the result was discarded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Load`] when the load itself failed; the
    /// previous view stays in place.
    pub fn apply_loaded(
        &mut self,
        pending: &PendingLoad,
        loaded: Result<LoadedView, EnrichError>,
    ) -> Result<bool, SessionError> {
        if !self.guard.is_current(&pending.ticket) {
            tracing::debug!(view = %pending.view(), "discarding superseded load");
            return Ok(false);
        }
        self.phase = Phase::Idle;

        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                self.surfaces
                    .show_warning(&format!("could not load '{}': {e}", pending.view()));
                return Err(e.into());
            }
        };
        for warning in &loaded.warnings {
            self.surfaces.show_warning(warning);
        }

        let name = pending.view().to_owned();
        if !loaded.from_cache {
            let entry = CachedDataset::now(loaded.records.clone());
            if let Err(e) = self.store.save(&self.cache_key(&name), &entry) {
                tracing::warn!(view = %name, error = %e, "could not cache dataset");
            }
        }
        if let Err(e) = self.store.set_last_dataset(&self.options.namespace, &name) {
            tracing::warn!(view = %name, error = %e, "could not remember dataset");
        }

        self.active = Some(ActiveView {
            fields: DisplayFields::from(&pending.descriptor),
            descriptor: pending.descriptor.clone(),
            name,
        });
        self.canonical = loaded.records;
        self.summary = SummaryToggle::default();
        self.filter.text = self.observed.search().unwrap_or_default().to_owned();
        self.displayed = search(&self.canonical, &self.filter);
        self.pager.reset();
        if self.observed.summarize() {
            self.apply_summarize(true);
        }
        self.render(RenderScope::Full);
        self.surfaces.show_sub_views(&self.observed.details());
        Ok(true)
    }

    /// Limits the search to `fields`; empty searches every field.
    pub fn set_search_fields(&mut self, fields: Vec<String>) {
        self.filter.fields = fields;
        if self.active.is_some() && !self.phase.is_loading() {
            let text = self.filter.text.clone();
            self.apply_search(text, RenderScope::Full);
        }
    }

    /// Typed search input. While a dataset is loading the text is only
    /// recorded and applies once the load lands.
    pub fn search_input(&mut self, text: &str, now: Instant) {
        if self.phase.is_loading() || self.active.is_none() {
            self.observed.set(SEARCH_KEY, text);
            self.router.write(&self.observed);
            return;
        }
        match self.debounce.submit(text, now) {
            Debounced::Apply(text) => self.apply_search(text, RenderScope::ListOnly),
            Debounced::Deferred(due) => tracing::trace!(?due, "search input deferred"),
        }
    }

    /// Applies held search input that has come due. Returns `true` when a
    /// filter ran.
    pub fn flush_search(&mut self, now: Instant) -> bool {
        match self.debounce.poll(now) {
            Some(text) if self.phase.is_loading() => {
                self.observed.set(SEARCH_KEY, text);
                self.router.write(&self.observed);
                false
            }
            Some(text) => {
                self.apply_search(text, RenderScope::ListOnly);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn next_search_due(&self) -> Option<Instant> {
        self.debounce.next_due()
    }

    fn apply_search(&mut self, text: String, scope: RenderScope) {
        if self.summary.deactivate().is_some() {
            self.observed.set_summarize(false);
        }
        let prior = self.phase;
        self.phase = Phase::Filtering;
        self.filter.text = text;
        self.displayed = search(&self.canonical, &self.filter);
        self.pager.reset();
        self.observed.set(SEARCH_KEY, self.filter.text.clone());
        self.router.write(&self.observed);
        tracing::debug!(
            text = %self.filter.text,
            matches = self.displayed.len(),
            total = self.canonical.len(),
            "filtered records"
        );
        let scope = match scope {
            RenderScope::ListOnly => self.phase.render_scope(),
            RenderScope::Full => RenderScope::Full,
        };
        self.render(scope);
        self.phase = prior;
    }

    /// Turns the summary on or off and records it in the descriptor.
    /// Views without a group key cannot be summarized.
    pub fn set_summarize(&mut self, on: bool) {
        if self.phase.is_loading() || self.active.is_none() {
            self.observed.set_summarize(on);
            self.router.write(&self.observed);
            return;
        }
        self.apply_summarize(on);
    }

    fn apply_summarize(&mut self, on: bool) {
        let Some(active) = &self.active else {
            return;
        };
        let group = active.descriptor.group_field().map(str::to_owned);
        let aggregate = active.descriptor.aggregate_field().map(str::to_owned);

        if on {
            let Some(group) = group else {
                tracing::debug!(view = %active.name, "view has no group key, not summarizing");
                self.observed.set_summarize(false);
                self.router.write(&self.observed);
                return;
            };
            self.displayed =
                self.summary
                    .activate(&self.canonical, &self.displayed, &group, aggregate.as_deref());
        } else if let Some(saved) = self.summary.deactivate() {
            self.displayed = saved;
        }
        self.pager.reset();
        self.observed.set_summarize(on);
        self.router.write(&self.observed);
        self.render(RenderScope::Full);
    }

    /// Selects a record of the displayed subset by id, or clears the
    /// selection with `None`.
    pub fn select_record(&mut self, id: Option<&str>) {
        self.observed.set(ID_KEY, id.unwrap_or_default());
        self.router.write(&self.observed);
        if !self.phase.is_loading() {
            self.render_detail();
        }
    }

    pub fn set_sub_views(&mut self, views: &[String]) {
        self.observed.set_details(views);
        self.router.write(&self.observed);
        self.surfaces.show_sub_views(views);
    }

    /// Moves to `page`, clamped to the displayed subset.
    pub fn set_page(&mut self, page: usize) {
        if self.phase.is_loading() {
            return;
        }
        self.pager.set_page(page);
        self.pager.clamp(self.displayed.len());
        self.render(RenderScope::Full);
    }

    fn render(&mut self, scope: RenderScope) {
        let Some(active) = &self.active else {
            return;
        };
        let page = self.pager.slice(&self.displayed);
        self.surfaces.render_list(&ListPage {
            title: active.descriptor.title(&active.name),
            records: page,
            page: self.pager.page(),
            page_count: self.pager.page_count(self.displayed.len()),
            total: self.displayed.len(),
            summarized: self.summary.is_active(),
        });
        let offset = (self.pager.page() - 1) * self.pager.page_size();
        let points = map_points(page, offset, active.descriptor.id_column.as_deref());
        match scope {
            RenderScope::Full => {
                self.surfaces.render_map(&points, &active.fields);
                self.render_detail();
            }
            RenderScope::ListOnly => self.surfaces.update_map(&points, &active.fields),
        }
    }

    fn render_detail(&mut self) {
        let Some(active) = &self.active else {
            return;
        };
        let selected = self.observed.id().and_then(|id| {
            resolve_record(&self.displayed, id, active.descriptor.id_column.as_deref())
        });
        self.surfaces
            .render_detail(selected.map(|(_, r)| r), &active.fields);
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

//! Session phase and stale-load detection.

/// What the session is busy with. Mutation entry points check this before
/// acting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Filtering,
    SwitchingDataset,
}

/// How much of the surfaces a completed step repaints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderScope {
    /// List, map and detail.
    Full,
    /// List repaint plus a map update; the map is not rebuilt and the
    /// detail panel stays as it is.
    ListOnly,
}

impl Phase {
    #[must_use]
    pub fn render_scope(self) -> RenderScope {
        match self {
            Phase::Filtering => RenderScope::ListOnly,
            Phase::Idle | Phase::Loading | Phase::SwitchingDataset => RenderScope::Full,
        }
    }

    /// `true` while a dataset is being fetched or swapped in.
    #[must_use]
    pub fn is_loading(self) -> bool {
        matches!(self, Phase::Loading | Phase::SwitchingDataset)
    }
}

/// Handed out when a load starts; only the newest ticket may apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    view: String,
}

impl LoadTicket {
    #[must_use]
    pub fn view(&self) -> &str {
        &self.view
    }
}

/// Generation counter for dataset loads.
#[derive(Debug, Clone, Default)]
pub struct LoadGuard {
    generation: u64,
}

impl LoadGuard {
    /// Starts a load, superseding every earlier ticket.
    pub fn begin(&mut self, view: &str) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
            view: view.to_owned(),
        }
    }

    #[must_use]
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
    }
}

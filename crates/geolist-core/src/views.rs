//! Named dataset views and the catalog that holds them.
//!
//! A view catalog is a JSON (or YAML) object mapping a view name to its
//! [`SourceDescriptor`]. Catalog order is significant: when the
//! "always load something" policy is on, an unknown view resolves to the
//! first entry.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Json,
}

impl DataFormat {
    /// Picks the format from a file extension; anything but `.json` is
    /// delimited text.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let without_query = path.split(['?', '#']).next().unwrap_or(path);
        if without_query.to_ascii_lowercase().ends_with(".json") {
            Self::Json
        } else {
            Self::Csv
        }
    }
}

/// Configuration for one named view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceDescriptor {
    pub short_title: Option<String>,
    pub list_title: Option<String>,
    /// Local file path (relative to the data root) or absolute URL.
    pub dataset: Option<String>,
    #[serde(rename = "dataset_offline")]
    pub dataset_offline: Option<String>,
    /// Fast API endpoint, loaded first when present.
    #[serde(rename = "dataset_via_api")]
    pub dataset_via_api: Option<String>,
    /// Slow API endpoint, only fetched by an explicit refresh.
    #[serde(rename = "dataset_api_slow")]
    pub dataset_api_slow: Option<String>,
    pub datatype: Option<DataFormat>,
    /// Comma-separated fields dropped when the dataset is written back.
    #[serde(rename = "dataset_omit")]
    pub dataset_omit: Option<String>,
    /// Reference geography table used to fill in coordinates.
    pub geo_dataset: Option<String>,
    /// First entry is the merge key and the summarize group key.
    pub geo_columns: Vec<String>,
    pub geo_state_target: Vec<String>,
    pub geo_aggregate: Option<String>,
    /// Marks the merge key as a combined `"Locality, Region"` string.
    pub place_field: Option<bool>,
    pub featured_columns: Vec<String>,
    pub all_columns: Option<Vec<String>>,
    pub name_column: Option<String>,
    pub title_column: Option<String>,
    pub address_column: Option<String>,
    pub value_column: Option<String>,
    pub id_column: Option<String>,
    #[serde(rename = "state_required")]
    pub state_required: Option<String>,
    #[serde(rename = "int_required")]
    pub int_required: Option<String>,
    /// Search checkbox label to field name.
    pub search: BTreeMap<String, String>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl SourceDescriptor {
    #[must_use]
    pub fn title<'a>(&'a self, view_name: &'a str) -> &'a str {
        non_blank(self.short_title.as_ref())
            .or_else(|| non_blank(self.list_title.as_ref()))
            .unwrap_or(view_name)
    }

    #[must_use]
    pub fn fast_api(&self) -> Option<&str> {
        non_blank(self.dataset_via_api.as_ref())
    }

    /// Fast API if configured, otherwise the slow one.
    #[must_use]
    pub fn refresh_api(&self) -> Option<&str> {
        self.fast_api()
            .or_else(|| non_blank(self.dataset_api_slow.as_ref()))
    }

    /// The file to load, honouring offline mode.
    #[must_use]
    pub fn file_path(&self, online: bool) -> Option<&str> {
        if !online {
            if let Some(offline) = non_blank(self.dataset_offline.as_ref()) {
                return Some(offline);
            }
        }
        non_blank(self.dataset.as_ref())
    }

    #[must_use]
    pub fn file_format(&self, path: &str) -> DataFormat {
        self.datatype.unwrap_or_else(|| DataFormat::from_path(path))
    }

    #[must_use]
    pub fn merge_key(&self) -> Option<&str> {
        self.geo_columns.first().map(String::as_str)
    }

    /// Group-by field for summary rows.
    #[must_use]
    pub fn group_field(&self) -> Option<&str> {
        self.merge_key()
    }

    #[must_use]
    pub fn aggregate_field(&self) -> Option<&str> {
        non_blank(self.geo_aggregate.as_ref())
    }

    #[must_use]
    pub fn is_place_key(&self) -> bool {
        self.place_field.unwrap_or_else(|| {
            self.merge_key()
                .is_some_and(|k| k.eq_ignore_ascii_case("location"))
        })
    }

    #[must_use]
    pub fn region_target(&self) -> Option<&str> {
        self.geo_state_target.first().map(String::as_str)
    }

    #[must_use]
    pub fn omit_fields(&self) -> Vec<String> {
        self.dataset_omit
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    #[must_use]
    pub fn default_search_fields(&self) -> Vec<String> {
        self.search.values().cloned().collect()
    }
}

/// Whether an unknown view name should fall back to the first view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlwaysLoad {
    Enabled,
    Disabled,
}

#[derive(Debug, PartialEq)]
pub enum Resolution<'a> {
    Found {
        name: &'a str,
        descriptor: &'a SourceDescriptor,
    },
    Substituted {
        requested: String,
        name: &'a str,
        descriptor: &'a SourceDescriptor,
    },
    NotFound {
        requested: String,
    },
}

impl<'a> Resolution<'a> {
    #[must_use]
    pub fn view(&self) -> Option<(&'a str, &'a SourceDescriptor)> {
        match self {
            Resolution::Found { name, descriptor }
            | Resolution::Substituted {
                name, descriptor, ..
            } => Some((*name, *descriptor)),
            Resolution::NotFound { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewCatalog {
    views: Vec<(String, SourceDescriptor)>,
}

impl ViewCatalog {
    #[must_use]
    pub fn new(views: Vec<(String, SourceDescriptor)>) -> Self {
        Self { views }
    }

    /// Parses a JSON catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ViewsFileParse`] for malformed JSON or a view
    /// that does not match the descriptor shape, and
    /// [`ConfigError::Validation`] when validation fails.
    pub fn from_json_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let map: Map<String, Value> =
            serde_json::from_str(content).map_err(|e| ConfigError::ViewsFileParse {
                path: origin.to_owned(),
                reason: e.to_string(),
            })?;
        Self::from_map(map, origin)
    }

    /// Parses a YAML catalog.
    ///
    /// # Errors
    ///
    /// Same as [`ViewCatalog::from_json_str`].
    pub fn from_yaml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ViewsFileParse {
                path: origin.to_owned(),
                reason: e.to_string(),
            })?;
        match value {
            Value::Object(map) => Self::from_map(map, origin),
            other => Err(ConfigError::ViewsFileParse {
                path: origin.to_owned(),
                reason: format!("expected a mapping of view names, found {other}"),
            }),
        }
    }

    fn from_map(map: Map<String, Value>, origin: &str) -> Result<Self, ConfigError> {
        let mut views = Vec::with_capacity(map.len());
        for (name, raw) in map {
            let descriptor: SourceDescriptor =
                serde_json::from_value(raw).map_err(|e| ConfigError::ViewsFileParse {
                    path: origin.to_owned(),
                    reason: format!("view '{name}': {e}"),
                })?;
            views.push((name, descriptor));
        }
        let catalog = Self { views };
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    /// One-view catalog used when no catalog file can be read.
    #[must_use]
    pub fn embedded() -> Self {
        let mut search = BTreeMap::new();
        search.insert("In City".to_owned(), "City".to_owned());
        search.insert("In County Name".to_owned(), "County".to_owned());
        Self {
            views: vec![(
                "cities".to_owned(),
                SourceDescriptor {
                    short_title: Some("Team Locations (fallback)".to_owned()),
                    list_title: Some("Team Locations (fallback)".to_owned()),
                    dataset: Some("cities.csv".to_owned()),
                    datatype: Some(DataFormat::Csv),
                    name_column: Some("City".to_owned()),
                    featured_columns: vec![
                        "City".to_owned(),
                        "Population".to_owned(),
                        "County".to_owned(),
                    ],
                    search,
                    ..SourceDescriptor::default()
                },
            )],
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        self.views
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    #[must_use]
    pub fn first(&self) -> Option<(&str, &SourceDescriptor)> {
        self.views.first().map(|(n, d)| (n.as_str(), d))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceDescriptor)> {
        self.views.iter().map(|(n, d)| (n.as_str(), d))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Resolves a view name to its descriptor under the given policy.
    #[must_use]
    pub fn resolve(&self, requested: &str, policy: AlwaysLoad) -> Resolution<'_> {
        if let Some((name, descriptor)) = self.views.iter().find(|(n, _)| n == requested) {
            return Resolution::Found {
                name: name.as_str(),
                descriptor,
            };
        }
        match (policy, self.views.first()) {
            (AlwaysLoad::Enabled, Some((name, descriptor))) => {
                tracing::warn!(requested, substitute = %name, "view not found, using first view");
                Resolution::Substituted {
                    requested: requested.to_owned(),
                    name: name.as_str(),
                    descriptor,
                }
            }
            _ => Resolution::NotFound {
                requested: requested.to_owned(),
            },
        }
    }
}

/// Load and validate a view catalog. `.yaml`/`.yml` files are read as YAML,
/// everything else as JSON.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_views(path: &Path) -> Result<ViewCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ViewsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    let origin = path.display().to_string();
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        ViewCatalog::from_yaml_str(&content, &origin)
    } else {
        ViewCatalog::from_json_str(&content, &origin)
    }
}

/// Like [`load_views`], but an unreadable or invalid catalog degrades to
/// [`ViewCatalog::embedded`].
#[must_use]
pub fn load_views_or_embedded(path: &Path) -> ViewCatalog {
    match load_views(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "using embedded view catalog");
            ViewCatalog::embedded()
        }
    }
}

fn validate_catalog(catalog: &ViewCatalog) -> Result<(), ConfigError> {
    if catalog.is_empty() {
        return Err(ConfigError::Validation(
            "view catalog contains no views".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for (name, view) in catalog.iter() {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "view name must be non-empty".to_string(),
            ));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate view name: '{name}'"
            )));
        }
        if view.file_path(true).is_none()
            && view.fast_api().is_none()
            && non_blank(view.dataset_offline.as_ref()).is_none()
        {
            return Err(ConfigError::Validation(format!(
                "view '{name}' has no dataset, dataset_offline, or dataset_via_api"
            )));
        }
        if view.geo_dataset.is_some() && view.geo_columns.is_empty() {
            return Err(ConfigError::Validation(format!(
                "view '{name}' sets geoDataset but no geoColumns merge key"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;

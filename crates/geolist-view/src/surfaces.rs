//! Boundaries to the independently rendered surfaces and the router that
//! owns the navigation descriptor.

use geolist_core::{Record, SourceDescriptor};

use crate::descriptor::ViewDescriptor;
use crate::selection::record_id;

/// Fields the map and detail surfaces show for a view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayFields {
    pub featured: Vec<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub address: Option<String>,
    pub value: Option<String>,
    pub omit: Vec<String>,
}

impl From<&SourceDescriptor> for DisplayFields {
    fn from(descriptor: &SourceDescriptor) -> Self {
        Self {
            featured: descriptor.featured_columns.clone(),
            name: descriptor.name_column.clone(),
            title: descriptor.title_column.clone(),
            address: descriptor.address_column.clone(),
            value: descriptor.value_column.clone(),
            omit: descriptor.omit_fields(),
        }
    }
}

/// A located record on the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub record: Record,
}

/// Points for every record of `page` with in-range coordinates. `offset`
/// is the page's position in the displayed subset, used for positional ids.
#[must_use]
pub fn map_points(page: &[Record], offset: usize, id_field: Option<&str>) -> Vec<MapPoint> {
    page.iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let latitude = record.latitude()?;
            let longitude = record.longitude()?;
            let in_range = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
            in_range.then(|| MapPoint {
                id: record_id(record, offset + i, id_field),
                latitude,
                longitude,
                record: record.clone(),
            })
        })
        .collect()
}

/// One rendered page of the list.
#[derive(Debug, Clone, Copy)]
pub struct ListPage<'a> {
    pub title: &'a str,
    pub records: &'a [Record],
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    pub summarized: bool,
}

pub trait Surfaces {
    fn render_list(&mut self, page: &ListPage<'_>);
    fn render_map(&mut self, points: &[MapPoint], fields: &DisplayFields);
    /// Moves the map onto a new displayed subset without rebuilding it.
    /// Called after each typed search.
    fn update_map(&mut self, points: &[MapPoint], fields: &DisplayFields) {
        self.render_map(points, fields);
    }
    /// `None` closes the detail panel.
    fn render_detail(&mut self, record: Option<&Record>, fields: &DisplayFields);
    fn show_sub_views(&mut self, views: &[String]);
    fn show_warning(&mut self, message: &str);
    fn show_not_found(&mut self, requested: &str);
}

/// Owner of the shared descriptor.
pub trait Router {
    fn read(&self) -> ViewDescriptor;
    fn write(&mut self, descriptor: &ViewDescriptor);
}

/// Router over an in-memory URL fragment.
#[derive(Debug, Clone, Default)]
pub struct FragmentRouter {
    fragment: String,
    writes: usize,
}

impl FragmentRouter {
    #[must_use]
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            writes: 0,
        }
    }

    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Replaces the fragment, as another surface would.
    pub fn navigate(&mut self, fragment: impl Into<String>) {
        self.fragment = fragment.into();
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Router for FragmentRouter {
    fn read(&self) -> ViewDescriptor {
        ViewDescriptor::parse_fragment(&self.fragment)
    }

    fn write(&mut self, descriptor: &ViewDescriptor) {
        let next = descriptor.to_fragment();
        if next != self.fragment {
            self.fragment = next;
            self.writes += 1;
        }
    }
}

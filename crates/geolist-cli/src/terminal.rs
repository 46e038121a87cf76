//! Stdout rendering of the list, map and detail surfaces.
//!
//! The session repaints several times while a command runs; this keeps the
//! latest state of each surface and prints it once at the end.

use geolist_core::{value_text, Record};
use geolist_view::{DisplayFields, ListPage, MapPoint, Surfaces};

#[derive(Debug, Default)]
struct ListState {
    title: String,
    records: Vec<Record>,
    page: usize,
    page_count: usize,
    total: usize,
    summarized: bool,
}

#[derive(Debug, Default)]
pub(crate) struct TerminalSurfaces {
    list: Option<ListState>,
    points: usize,
    detail: Option<(Record, DisplayFields)>,
    sub_views: Vec<String>,
}

impl TerminalSurfaces {
    pub(crate) fn print(&self, json: bool) {
        let Some(list) = &self.list else {
            return;
        };
        let mode = if list.summarized { " (summary)" } else { "" };
        println!(
            "{}{mode}: {} records, page {}/{}, {} on map",
            list.title,
            list.total,
            list.page,
            list.page_count.max(1),
            self.points
        );
        for record in &list.records {
            if json {
                println!("{}", serde_json::Value::Object(record.clone().into_map()));
            } else {
                println!("  {}", one_line(record));
            }
        }
        if let Some((record, fields)) = &self.detail {
            println!("selected:");
            for (field, value) in record.iter() {
                if fields.omit.iter().any(|o| o == field) {
                    continue;
                }
                if let Some(text) = value_text(value) {
                    println!("  {field}: {text}");
                }
            }
        }
        if !self.sub_views.is_empty() {
            println!("open: {}", self.sub_views.join(", "));
        }
    }
}

fn one_line(record: &Record) -> String {
    record
        .iter()
        .filter_map(|(k, v)| value_text(v).filter(|t| !t.is_empty()).map(|t| format!("{k}={t}")))
        .collect::<Vec<_>>()
        .join(" | ")
}

impl Surfaces for TerminalSurfaces {
    fn render_list(&mut self, page: &ListPage<'_>) {
        self.list = Some(ListState {
            title: page.title.to_owned(),
            records: page.records.to_vec(),
            page: page.page,
            page_count: page.page_count,
            total: page.total,
            summarized: page.summarized,
        });
    }

    fn render_map(&mut self, points: &[MapPoint], _fields: &DisplayFields) {
        self.points = points.len();
    }

    fn render_detail(&mut self, record: Option<&Record>, fields: &DisplayFields) {
        self.detail = record.map(|r| (r.clone(), fields.clone()));
    }

    fn show_sub_views(&mut self, views: &[String]) {
        self.sub_views = views.to_vec();
    }

    fn show_warning(&mut self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn show_not_found(&mut self, requested: &str) {
        eprintln!("view not found: {requested}");
    }
}

//! Standings table view: ordering, search and rendering of the live table.
//!
//! All interaction state lives in [`ViewState`], which the browser sends with
//! every request and gets back updated. The server keeps nothing between
//! requests.

use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions};
use tracing::warn;

use crate::models::*;
use crate::parser;
use crate::report::html_escape;

/// Display columns: name, net, total, spent
const COLUMN_COUNT: usize = 4;
const NAME_COLUMN: usize = 0;

pub struct TableView {
    rows: Vec<StandingsRow>,
    state: ViewState,
}

impl TableView {
    /// `rows` must be in document order; `state.order` refers to it by index.
    /// Stale or unknown indices are dropped and rows missing from the order are
    /// appended in document order.
    pub fn new(rows: Vec<StandingsRow>, mut state: ViewState) -> Self {
        let mut seen = vec![false; rows.len()];
        let mut order = Vec::with_capacity(rows.len());
        for index in state.order.drain(..) {
            if index < rows.len() && !seen[index] {
                seen[index] = true;
                order.push(index);
            }
        }
        order.extend((0..rows.len()).filter(|&i| !seen[i]));
        state.order = order;
        state.search = state.search.to_lowercase();
        Self { rows, state }
    }

    /// Header click: flip this column's direction and reorder the current
    /// order. The sort is stable, so ties keep their previous relative order.
    pub fn sort(&mut self, column: usize) -> Option<SortDirection> {
        if column >= COLUMN_COUNT {
            return None;
        }
        let direction = SortDirection::toggle(self.state.directions.get(&column).copied());
        self.state.directions.insert(column, direction);

        let rows = &self.rows;
        let collator = if column == NAME_COLUMN { name_collator() } else { None };
        self.state.order.sort_by(|&a, &b| {
            let ord = compare_cells(column, &rows[a], &rows[b], collator.as_ref());
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        Some(direction)
    }

    pub fn search(&mut self, query: &str) {
        self.state.search = query.to_lowercase();
    }

    /// Hidden rows stay in the table; search only toggles their display.
    pub fn is_visible(&self, row: &StandingsRow) -> bool {
        row.name.to_lowercase().contains(&self.state.search)
    }

    /// Rows in display order, with their document index
    pub fn ordered_rows(&self) -> impl Iterator<Item = (usize, &StandingsRow)> {
        self.state.order.iter().map(|&i| (i, &self.rows[i]))
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn into_state(self) -> ViewState {
        self.state
    }

    /// `<tbody>` contents for the live table
    pub fn render_body(&self, profile_template: &str, escaping: Escaping) -> String {
        let value = |s: &str| match escaping {
            Escaping::Raw => s.to_string(),
            Escaping::Escape => html_escape(s),
        };

        let mut s = String::with_capacity(self.rows.len() * 256);
        for (index, row) in self.ordered_rows() {
            let hidden = if self.is_visible(row) { "" } else { " style=\"display: none\"" };
            let name = value(&row.name);
            // app.js reads the player back out of this attribute
            let player_attr = html_escape(&row.name);
            s.push_str(&format!(
                "<tr data-index=\"{}\"{}>\
                 <td><a href=\"{}\" class=\"player-link\" target=\"_blank\">{}</a></td>\
                 <td>{}</td><td>{}</td>\
                 <td><a href=\"#\" class=\"spent-dkp\" data-player=\"{}\">{}</a></td>\
                 </tr>\n",
                index,
                hidden,
                html_escape(&profile_url(profile_template, &row.name)),
                name,
                value(&row.net_points),
                value(&row.total_points),
                player_attr,
                value(&row.spent_points),
            ));
        }
        s
    }
}

fn cell(row: &StandingsRow, column: usize) -> &str {
    match column {
        0 => &row.name,
        1 => &row.net_points,
        2 => &row.total_points,
        _ => &row.spent_points,
    }
}

fn compare_cells(
    column: usize,
    a: &StandingsRow,
    b: &StandingsRow,
    collator: Option<&Collator>,
) -> Ordering {
    let (a, b) = (cell(a, column).trim(), cell(b, column).trim());
    if column == NAME_COLUMN {
        return match collator {
            Some(collator) => collator.compare(a, b),
            None => compare_text(a, b),
        };
    }
    compare_numbers(parser::parse_float_prefix(a), parser::parse_float_prefix(b))
}

/// Numbers by value. Cells without a leading number sort after every number
/// (before them when descending) and keep their relative order.
fn compare_numbers(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Root-locale collation for player names
fn name_collator() -> Option<Collator> {
    match Collator::try_new(&Default::default(), CollatorOptions::new()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            warn!(error = ?e, "name collator unavailable, sorting by case-folded text");
            None
        }
    }
}

/// Case-insensitive first, then lowercase before uppercase
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Profile link for a standings name; only the part before " (" is used
pub fn profile_url(template: &str, player: &str) -> String {
    template.replace("{name}", &encode_uri_component(parser::profile_name(player)))
}

/// Percent-encode everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
pub fn encode_uri_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

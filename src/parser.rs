use std::sync::LazyLock;

use nom::branch::alt;
use nom::bytes::complete::is_not;
use nom::character::complete::{char, digit0, digit1, one_of};
use nom::combinator::{opt, recognize};
use nom::sequence::{delimited, pair, tuple};
use nom::IResult;
use scraper::{ElementRef, Html, Selector};

use crate::models::*;

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr").expect("row selector is valid"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("cell selector is valid"));

// Standings export columns
const NAME_COL: usize = 0;
const NET_COL: usize = 3;
const TOTAL_COL: usize = 4;
const SPENT_COL: usize = 5;

// Roll-up log columns
const TIME_COL: usize = 0;
const CHANGE_COL: usize = 1;
const DESCRIPTION_COL: usize = 2;

/// Parse a standings export into one row per `<tr>`. Never fails: missing or
/// blank cells fall back to "N/A" for the name and "0" for point columns.
pub fn extract_standings(html: &str) -> Vec<StandingsRow> {
    map_rows(html, |cells| StandingsRow {
        name: trimmed_text_or(cells, NAME_COL, "N/A"),
        net_points: trimmed_text_or(cells, NET_COL, "0"),
        total_points: trimmed_text_or(cells, TOTAL_COL, "0"),
        spent_points: trimmed_text_or(cells, SPENT_COL, "0"),
    })
}

/// Rows worth showing: total points must start with an integer above zero
pub fn standings_for_display(rows: Vec<StandingsRow>) -> Vec<StandingsRow> {
    rows.into_iter()
        .filter(|row| parse_int_prefix(&row.total_points).is_some_and(|total| total > 0))
        .collect()
}

/// Parse the combined roll-up log. The description keeps its inner markup.
pub fn extract_log_entries(html: &str) -> Vec<LogEntry> {
    map_rows(html, |cells| {
        let description = cells
            .get(DESCRIPTION_COL)
            .map(|cell| cell.inner_html().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "N/A".to_string());

        LogEntry {
            timestamp: trimmed_text_or(cells, TIME_COL, "N/A"),
            points_change: trimmed_text_or(cells, CHANGE_COL, "N/A"),
            description,
            description_text: cells.get(DESCRIPTION_COL).map(cell_text),
        }
    })
}

fn map_rows<T>(html: &str, mut f: impl FnMut(&[ElementRef<'_>]) -> T) -> Vec<T> {
    let document = Html::parse_document(html);
    document
        .select(&ROW)
        .map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
            f(&cells)
        })
        .collect()
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect()
}

fn trimmed_text_or(cells: &[ElementRef<'_>], index: usize, default: &str) -> String {
    cells
        .get(index)
        .map(|cell| cell_text(cell).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

// ── Player identifiers ───────────────────────────────────────────────────────

fn parenthesized(input: &str) -> IResult<&str, &str> {
    delimited(char('('), is_not(")"), char(')'))(input)
}

/// Main character named in the first non-empty parentheses: "Alt (Main)" -> "Main"
pub fn main_name(player: &str) -> Option<&str> {
    player
        .match_indices('(')
        .find_map(|(i, _)| parenthesized(&player[i..]).ok().map(|(_, name)| name))
}

/// Name used for the armory profile link: everything before " ("
pub fn profile_name(player: &str) -> &str {
    player.split(" (").next().unwrap_or(player)
}

// ── Numeric prefixes ─────────────────────────────────────────────────────────

fn int_literal(input: &str) -> IResult<&str, (Option<char>, &str)> {
    pair(opt(one_of("+-")), digit1)(input)
}

fn float_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

/// Leading integer of a cell value, ignoring any trailing text ("20 pts" -> 20).
/// `None` when the value does not start with a number.
pub fn parse_int_prefix(value: &str) -> Option<i64> {
    let (_, (sign, digits)) = int_literal(value.trim_start()).ok()?;
    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if sign == Some('-') { -magnitude } else { magnitude })
}

/// Leading decimal number of a cell value ("12.5k" -> 12.5)
pub fn parse_float_prefix(value: &str) -> Option<f64> {
    let (_, literal) = float_literal(value.trim_start()).ok()?;
    literal.parse().ok()
}

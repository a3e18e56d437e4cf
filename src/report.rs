//! Player drill-down: pick a player's entries out of the combined log and
//! render them as a standalone page.
//!
//! With `Escaping::Raw` the log's own markup is passed straight through, so a
//! description can change the page structure. `Escaping::Escape` closes that
//! hole at the cost of losing the log's formatting.

use crate::models::*;
use crate::parser;

/// Name the log is searched for: the main character when one is given in
/// parentheses, otherwise the identifier as shown in the standings.
pub fn match_key(player: &str) -> &str {
    parser::main_name(player).unwrap_or(player)
}

/// Entries whose description text contains the player's match key.
/// Case-sensitive substring containment, so "Ann" also matches "Anna".
pub fn filter_by_player(entries: &[LogEntry], player: &str) -> Vec<LogEntry> {
    let key = match_key(player);
    entries
        .iter()
        .filter(|entry| {
            entry
                .description_text
                .as_deref()
                .is_some_and(|text| text.contains(key))
        })
        .cloned()
        .collect()
}

pub fn render_player_report(player: &str, entries: &[LogEntry], escaping: Escaping) -> String {
    let value = |s: &str| match escaping {
        Escaping::Raw => s.to_string(),
        Escaping::Escape => html_escape(s),
    };
    let title = value(match_key(player));

    let mut s = String::with_capacity(1024 + entries.len() * 128);
    s.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    s.push_str("<meta charset=\"UTF-8\" />\n");
    s.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />\n");
    s.push_str(&format!("<title>DKP Log - {}</title>\n", title));
    s.push_str("<link rel=\"stylesheet\" href=\"/public/style.css\" />\n");
    s.push_str("</head>\n<body>\n<div class=\"container\">\n");
    s.push_str(&format!("<h1>DKP Log - {}</h1>\n", title));
    s.push_str("<table>\n<thead>\n<tr><th>Date</th><th>DKP Spent</th><th>Description</th></tr>\n</thead>\n<tbody>\n");
    for entry in entries {
        s.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            value(&entry.timestamp),
            value(&entry.points_change),
            value(&entry.description)
        ));
    }
    s.push_str("</tbody>\n</table>\n</div>\n</body>\n</html>\n");
    s
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

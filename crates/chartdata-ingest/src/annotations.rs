//! Parsing of legacy `entityAnnotationsMap` text.

use std::collections::HashMap;

use tracing::debug;

const DELIMITER: char = ':';

/// Parse newline-delimited `Entity: note` lines into an entity to note map.
///
/// Everything after the first `:` is the note, with each `:`-separated
/// piece trimmed. A line without a `:` maps the whole (trimmed) line to an
/// empty note. Blank lines are ignored. Later lines win.
pub fn parse_entity_annotations(text: &str) -> HashMap<String, String> {
    let mut annotations = HashMap::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut pieces = line.split(DELIMITER).map(str::trim);
        let entity = pieces.next().unwrap_or_default();
        let note: Vec<&str> = pieces.collect();
        if note.is_empty() {
            debug!(line, "annotation line has no delimiter");
        }
        annotations.insert(entity.to_string(), note.join(":"));
    }
    annotations
}

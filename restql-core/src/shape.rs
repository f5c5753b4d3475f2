//! Row shaping: flat labeled columns folded back into nested JSON.
//!
//! The planner encodes the embed path into column labels with a `__`
//! delimiter; the shaper splits those labels to rebuild the requested
//! nesting. An embedded object whose every leaf came back null collapses
//! to JSON null (the outer-join "no match" convention).

use std::collections::BTreeSet;

use serde_json::{Map, Number, Value as JsonValue};

/// Reserved label delimiter between path segments.
pub const LABEL_SEPARATOR: &str = "__";

pub struct Shaper {
    main_table: String,
    has_embeds: bool,
}

impl Shaper {
    pub fn new(main_table: impl Into<String>, has_embeds: bool) -> Self {
        Self {
            main_table: main_table.into(),
            has_embeds,
        }
    }

    /// Shape one result row from its `(label, value)` pairs.
    pub fn shape_row(&self, columns: &[(String, JsonValue)]) -> JsonValue {
        let mut row = Map::new();

        if !self.has_embeds {
            // Labels are bare column names; the row stays flat.
            for (label, value) in columns {
                row.insert(label.clone(), value.clone());
            }
            return JsonValue::Object(row);
        }

        let mut embed_roots = BTreeSet::new();
        for (label, value) in columns {
            if !label.contains(LABEL_SEPARATOR) {
                // Raw label (embed `*` degradation): best-effort at the root.
                row.insert(label.clone(), value.clone());
                continue;
            }
            let segments: Vec<&str> = label.split(LABEL_SEPARATOR).collect();
            if segments[0] == self.main_table {
                row.insert(segments[1..].join(LABEL_SEPARATOR), value.clone());
                continue;
            }
            embed_roots.insert(segments[0].to_string());
            set_nested(&mut row, &segments, value.clone());
        }

        for root in embed_roots {
            if let Some(node) = row.get_mut(&root) {
                collapse_nulls(node);
            }
        }

        JsonValue::Object(row)
    }
}

/// Write a value at a nested path, creating intermediate objects on
/// demand. A non-object found on the path is replaced.
fn set_nested(root: &mut Map<String, JsonValue>, path: &[&str], value: JsonValue) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !entry.is_object() {
            *entry = JsonValue::Object(Map::new());
        }
        current = match entry.as_object_mut() {
            Some(map) => map,
            None => return,
        };
    }
    current.insert(leaf.to_string(), value);
}

/// Collapse an embedded subtree to null when every leaf is null.
/// Bottom-up, so a nested all-null embed counts as a null leaf of its
/// parent. Returns whether the node is now null.
fn collapse_nulls(value: &mut JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(map) => {
            let mut all_null = true;
            for (_, child) in map.iter_mut() {
                if !collapse_nulls(child) {
                    all_null = false;
                }
            }
            if all_null {
                *value = JsonValue::Null;
            }
            all_null
        }
        _ => false,
    }
}

/// Decode a text-protocol scalar: a byte sequence that parses as a
/// decimal number becomes a number, anything else stays a string.
pub fn scalar_from_text(text: String) -> JsonValue {
    if let Ok(n) = text.parse::<i64>() {
        return JsonValue::Number(n.into());
    }
    if let Ok(f) = text.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return JsonValue::Number(n);
        }
    }
    JsonValue::String(text)
}

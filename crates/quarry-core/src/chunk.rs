//! Splitting long articles into extraction units and merging the
//! per-unit replies back into one record.

use serde_json::{Map, Value};

/// Rough token estimate: about four tokens for every three words.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words * 4).div_ceil(3)
}

/// Split `text` into chunks that each stay within `token_threshold`.
///
/// Paragraphs (blank-line separated) are packed greedily; a paragraph that
/// alone exceeds the budget is cut on word boundaries. A threshold of zero
/// disables chunking. Blank input yields no chunks.
pub fn split_into_chunks(text: &str, token_threshold: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if token_threshold == 0 || estimate_tokens(text) <= token_threshold {
        return vec![text.trim().to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0;

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let tokens = estimate_tokens(paragraph);

        if tokens > token_threshold {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            chunks.extend(split_words(paragraph, token_threshold));
            continue;
        }

        if current_tokens + tokens > token_threshold && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
        current_tokens += tokens;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_words(paragraph: &str, token_threshold: usize) -> Vec<String> {
    // Largest word count whose estimate stays within the budget.
    let words_per_chunk = (token_threshold * 3 / 4).max(1);
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    words
        .chunks(words_per_chunk)
        .map(|w| w.join(" "))
        .collect()
}

/// Merge per-chunk JSON objects into one.
///
/// Arrays are unioned in first-seen order, booleans are OR-ed, and any other
/// value keeps the first non-null occurrence. Non-object items are ignored;
/// returns `None` when there is no object at all.
pub fn merge_payloads(items: Vec<Value>) -> Option<Value> {
    let mut objects = items.into_iter().filter_map(|v| match v {
        Value::Object(map) => Some(map),
        _ => None,
    });

    let mut merged: Map<String, Value> = objects.next()?;
    for object in objects {
        for (key, value) in object {
            match merged.get_mut(&key) {
                None => {
                    merged.insert(key, value);
                }
                Some(existing) => merge_value(existing, value),
            }
        }
    }
    Some(Value::Object(merged))
}

fn merge_value(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Array(current), Value::Array(more)) => {
            for item in more {
                if !current.contains(&item) {
                    current.push(item);
                }
            }
        }
        (Value::Bool(current), Value::Bool(more)) => *current = *current || more,
        (existing, incoming) if existing.is_null() => *existing = incoming,
        _ => {}
    }
}

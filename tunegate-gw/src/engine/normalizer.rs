//! Per-operation payload normalization
//!
//! Different upstream endpoints for the same logical operation return
//! different shapes. Each function here tries its known shapes in
//! order and produces the operation's canonical field set, or `None`
//! when nothing matches — the engine reports that as `Malformed`
//! rather than passing unrecognized payloads through.

use serde_json::{json, Map, Value};

/// Score synthesis constants for rank-ordered sources that carry no
/// explicit scores. Strictly decreasing, so normalized scores preserve
/// the upstream's original order.
const HOT_SEARCH_BASE_SCORE: i64 = 1_000_000;
const HOT_SEARCH_SCORE_STEP: i64 = 100_000;

/// Synthesized ranking score for the item at `index`.
pub fn synthesized_score(index: usize) -> i64 {
    HOT_SEARCH_BASE_SCORE - index as i64 * HOT_SEARCH_SCORE_STEP
}

/// Hot-search results.
///
/// Shape A (detail endpoint): `{data: [{searchWord, content, score, ...}]}`.
/// Shape B (legacy endpoint): `{result: {hots: [{first, second}]}}`,
/// renamed to the canonical fields with synthesized scores.
pub fn hot_search(body: &Value) -> Option<Value> {
    if let Some(items) = body.get("data").and_then(Value::as_array) {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let word = item.get("searchWord").and_then(Value::as_str)?;
            out.push(hot_search_entry(
                word,
                item.get("content").and_then(Value::as_str),
                item.get("score")
                    .and_then(Value::as_i64)
                    .unwrap_or_else(|| synthesized_score(index)),
                item.get("iconType").and_then(Value::as_i64).unwrap_or(1),
                item.get("iconUrl").cloned().unwrap_or(Value::Null),
            ));
        }
        return Some(Value::Array(out));
    }

    if let Some(hots) = body
        .get("result")
        .and_then(|result| result.get("hots"))
        .and_then(Value::as_array)
    {
        let mut out = Vec::with_capacity(hots.len());
        for (index, item) in hots.iter().enumerate() {
            let word = item.get("first").and_then(Value::as_str)?;
            out.push(hot_search_entry(
                word,
                item.get("second").and_then(Value::as_str),
                synthesized_score(index),
                1,
                Value::Null,
            ));
        }
        return Some(Value::Array(out));
    }

    None
}

fn hot_search_entry(
    word: &str,
    content: Option<&str>,
    score: i64,
    icon_type: i64,
    icon_url: Value,
) -> Value {
    json!({
        "searchWord": word,
        "content": content.unwrap_or("trending search"),
        "score": score,
        "iconType": icon_type,
        "iconUrl": icon_url,
    })
}

/// Lyric payloads: both lyric endpoints carry `lrc.lyric`; the
/// translated lyric is optional and defaults to empty.
pub fn lyric(body: &Value) -> Option<Value> {
    let lyric = body.get("lrc")?.get("lyric")?.as_str()?;
    let translated = body
        .get("tlyric")
        .and_then(|t| t.get("lyric"))
        .and_then(Value::as_str)
        .unwrap_or("");

    Some(json!({
        "lrc": {"lyric": lyric},
        "tlyric": {"lyric": translated},
    }))
}

/// Playable stream URLs: `{data: [{id, url, br, ...}]}` from both the
/// versioned and the plain endpoint. An empty list is a valid terminal
/// answer (the track simply has no playable source).
pub fn song_url(body: &Value) -> Option<Value> {
    let entries = body.get("data")?.as_array()?;
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.is_object() {
            return None;
        }
        let mut canonical = Map::new();
        for field in ["id", "url", "br", "size", "type", "level"] {
            canonical.insert(
                field.to_string(),
                entry.get(field).cloned().unwrap_or(Value::Null),
            );
        }
        out.push(Value::Object(canonical));
    }
    Some(Value::Array(out))
}

/// Login status: `{data: {code, profile}}` or a top-level `{profile}`.
/// Canonical shape is `{profile}` with null for anonymous sessions.
pub fn login_status(body: &Value) -> Option<Value> {
    if let Some(data) = body.get("data").filter(|d| d.is_object()) {
        return Some(json!({
            "profile": data.get("profile").cloned().unwrap_or(Value::Null),
        }));
    }
    if body.get("profile").is_some() || body.get("account").is_some() {
        return Some(json!({
            "profile": body.get("profile").cloned().unwrap_or(Value::Null),
        }));
    }
    None
}

/// Pass-through for operations whose upstream payload is already the
/// canonical shape, minus the envelope-level status fields.
pub fn passthrough(body: &Value) -> Option<Value> {
    let object = body.as_object()?;
    let mut out = Map::new();
    for (key, value) in object {
        if matches!(key.as_str(), "code" | "message" | "msg") {
            continue;
        }
        out.insert(key.clone(), value.clone());
    }
    Some(Value::Object(out))
}

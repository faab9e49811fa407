use serde_json::Value;
use std::collections::BTreeMap;

/// Runtime results a step's parameters are interpolated against, keyed by the
/// id of the step that produced each value.
pub type StepResults = BTreeMap<String, Value>;

/// Substitute `{{step.path}}` tokens in `value` with values from `results`.
///
/// Sequences and maps are rebuilt with each element interpolated. A string
/// scalar is scanned for the first token matching the grammar
/// `{{identifier(.identifier|[index])*}}`; the leading identifier names a
/// step id, the rest is an accessor path into that step's stored result.
///
/// Interpolation is fail-open: an absent step id, an unresolvable path, or a
/// string with no token all return the original value unchanged. Only the
/// actual tool call downstream can fail on a bad parameter.
pub fn interpolate(value: &Value, results: &StepResults) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate(v, results)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate(v, results)))
                .collect(),
        ),
        Value::String(text) => interpolate_string(text, results),
        _ => value.clone(),
    }
}

fn interpolate_string(text: &str, results: &StepResults) -> Value {
    let Some(token) = find_token(text) else {
        return Value::String(text.to_string());
    };

    let Some(resolved) = resolve(&token, results) else {
        return Value::String(text.to_string());
    };

    // A string that is exactly one token takes the resolved value wholesale,
    // so substitution may turn a string placeholder into an object or array.
    if token.start == 0 && token.end == text.len() {
        return resolved.clone();
    }

    let rendered = match resolved {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Value::String(format!(
        "{}{}{}",
        &text[..token.start],
        rendered,
        &text[token.end..]
    ))
}

// ─── Token grammar ───────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

#[derive(Debug)]
struct Token<'a> {
    /// Byte offset of `{{` in the source string.
    start: usize,
    /// Byte offset one past `}}`.
    end: usize,
    step_id: &'a str,
    path: Vec<Segment<'a>>,
}

/// Find the first well-formed token in `text`. A `{{...}}` span whose body
/// does not match the accessor grammar is not a token; the scan continues
/// past it.
fn find_token(text: &str) -> Option<Token<'_>> {
    let mut search_from = 0;
    while let Some(relative) = text[search_from..].find("{{") {
        let start = search_from + relative;
        let after_open = &text[start + 2..];
        let close = after_open.find("}}")?;
        let body = &after_open[..close];

        if let Some((step_id, path)) = parse_accessor(body) {
            return Some(Token {
                start,
                end: start + 2 + close + 2,
                step_id,
                path,
            });
        }
        search_from = start + 2;
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn parse_accessor(body: &str) -> Option<(&str, Vec<Segment<'_>>)> {
    let ident_end = body.find(|c| !is_ident_char(c)).unwrap_or(body.len());
    if ident_end == 0 {
        return None;
    }
    let step_id = &body[..ident_end];

    let mut path = Vec::new();
    let mut rest = &body[ident_end..];
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let end = after_dot
                .find(|c| !is_ident_char(c))
                .unwrap_or(after_dot.len());
            if end == 0 {
                return None;
            }
            let segment = &after_dot[..end];
            path.push(match segment.parse::<usize>() {
                Ok(index) => Segment::Index(index),
                Err(_) => Segment::Key(segment),
            });
            rest = &after_dot[end..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let end = after_bracket.find(']')?;
            let index = after_bracket[..end].parse::<usize>().ok()?;
            path.push(Segment::Index(index));
            rest = &after_bracket[end + 1..];
        } else {
            return None;
        }
    }

    Some((step_id, path))
}

fn resolve<'a>(token: &Token<'_>, results: &'a StepResults) -> Option<&'a Value> {
    let mut current = results.get(token.step_id)?;
    for segment in &token.path {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(*key)?,
            (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

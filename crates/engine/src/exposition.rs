//! Prometheus text exposition parser.
//!
//! Handles the subset the engine scrapes: comment lines, `name value`,
//! `name{label="value",...} value` and an optional trailing millisecond
//! timestamp. Label values support the `\\`, `\"` and `\n` escapes.

use flowline_core::types::Sample;

use crate::error::EngineError;

/// Parse a text exposition payload.
///
/// Samples without an explicit timestamp get `default_timestamp_ms`.
pub fn parse(text: &str, default_timestamp_ms: i64) -> Result<Vec<Sample>, EngineError> {
    let mut samples = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        samples.push(parse_line(line, i + 1, default_timestamp_ms)?);
    }
    Ok(samples)
}

fn parse_line(line: &str, lineno: usize, default_timestamp_ms: i64) -> Result<Sample, EngineError> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .ok_or_else(|| malformed(lineno, "missing sample value"))?;
    let name = &line[..name_end];
    if name.is_empty() {
        return Err(malformed(lineno, "missing metric name"));
    }

    let mut rest = &line[name_end..];
    let mut labels = Vec::new();
    if let Some(after_brace) = rest.strip_prefix('{') {
        let (parsed, remainder) = parse_labels(after_brace, lineno)?;
        labels = parsed;
        rest = remainder;
    }

    let mut fields = rest.split_whitespace();
    let value = fields
        .next()
        .ok_or_else(|| malformed(lineno, "missing sample value"))?;
    let value = parse_value(value)
        .ok_or_else(|| malformed(lineno, &format!("invalid sample value '{value}'")))?;
    let timestamp_ms = match fields.next() {
        Some(ts) => ts
            .parse::<i64>()
            .map_err(|_| malformed(lineno, &format!("invalid timestamp '{ts}'")))?,
        None => default_timestamp_ms,
    };

    Ok(Sample::new(name, labels, value, timestamp_ms))
}

/// Parse `key="value",...}` and return the labels plus the text after `}`.
fn parse_labels(input: &str, lineno: usize) -> Result<(Vec<(String, String)>, &str), EngineError> {
    let mut labels = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }

        let eq = rest
            .find('=')
            .ok_or_else(|| malformed(lineno, "expected '=' in label set"))?;
        let key = rest[..eq].trim();
        if key.is_empty() {
            return Err(malformed(lineno, "empty label name"));
        }
        rest = rest[eq + 1..]
            .trim_start()
            .strip_prefix('"')
            .ok_or_else(|| malformed(lineno, "label value must be quoted"))?;

        let mut value = String::new();
        let mut closing = None;
        let mut chars = rest.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                '"' => {
                    closing = Some(i);
                    break;
                }
                other => value.push(other),
            }
        }
        let closing = closing.ok_or_else(|| malformed(lineno, "unterminated label value"))?;
        labels.push((key.to_owned(), value));

        rest = rest[closing + 1..].trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma;
        } else if !rest.starts_with('}') {
            return Err(malformed(lineno, "expected ',' or '}' after label"));
        }
    }
}

fn parse_value(token: &str) -> Option<f64> {
    match token {
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

fn malformed(line: usize, reason: &str) -> EngineError {
    EngineError::Exposition {
        line,
        reason: reason.to_owned(),
    }
}

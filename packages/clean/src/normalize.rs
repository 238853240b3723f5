//! Text normalization shared by every stage.
//!
//! All text comparisons in the pipeline happen on the normalized form:
//! trimmed, uppercased, with the null sentinels folded into
//! [`Value::Missing`].

use std::sync::LazyLock;

use regex::Regex;
use traffic_violations_record_models::Value;

/// Uppercased tokens that mean "no value".
const NULL_SENTINELS: &[&str] = &["", "NAN", "NONE"];

/// Anything that is not an uppercase ASCII letter.
pub(crate) static NON_ALPHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z]").expect("valid regex"));

/// Anything that is not an uppercase ASCII letter, digit, or space.
pub(crate) static NON_ALNUM_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z0-9 ]").expect("valid regex"));

/// Trims and uppercases `raw`, returning `None` for null sentinels.
///
/// ```text
/// "  toyota " -> Some("TOYOTA")
/// "nan"       -> None
/// "   "       -> None
/// ```
#[must_use]
pub fn normalize(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if NULL_SENTINELS.contains(&upper.as_str()) {
        None
    } else {
        Some(upper)
    }
}

/// Normalizes any cell. Non-text cells are rendered to text first.
#[must_use]
pub fn normalize_value(value: &Value) -> Value {
    value.to_text().and_then(|s| normalize(&s)).into()
}

/// Normalizes a column in place.
pub fn normalize_column(values: &mut [Value]) {
    for value in values {
        *value = normalize_value(value);
    }
}

/// Removes every match of `re` from a text cell. A cell left empty becomes
/// missing.
#[must_use]
pub fn strip_matches(value: &Value, re: &Regex) -> Value {
    match value.as_text() {
        Some(s) => non_empty(re.replace_all(s, "").into_owned()),
        None => value.clone(),
    }
}

/// Wraps `s` as text, or missing when empty.
#[must_use]
pub fn non_empty(s: String) -> Value {
    if s.is_empty() {
        Value::Missing
    } else {
        Value::Text(s)
    }
}

/// Reads a cell as a finite number. Text that does not parse is `None`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Float(x) => *x,
        Value::Int(i) => *i as f64,
        Value::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

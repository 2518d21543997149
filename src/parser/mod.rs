//! Free-form exercise input parser
//!
//! Input goes through the numeral normalizer first, then through a
//! prioritized list of shapes. The first shape that matches wins, so the
//! stricter `x`-joined notation is always tried before three bare numbers.

pub mod numerals;

use std::sync::LazyLock;

use chrono::Utc;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::exercise::{Exercise, ValidationError};

pub use numerals::normalize_numbers;

/// Accepted shapes for a full entry with a name
pub const ENTRY_HINT: &str = "Формат: название вес повторения подходы [заметка] \
    или название вес повторенияxподходы [заметка]. \
    Примеры: жим лежа 80 8x3, присед 100кг 5 4 тяжело было";

/// Accepted shapes for weight/reps/sets without a name
pub const SETS_HINT: &str =
    "Поддерживаемые форматы: '80kg 8reps 3sets', '80kg 8x3', '100 5x4', '80 8 3'";

/// Input did not match any accepted shape, or matched but produced an
/// invalid record
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Неверный формат: '{input}'{}. {hint}", cause_suffix(.cause))]
pub struct FormatError {
    /// Input exactly as the caller passed it
    pub input: String,
    pub hint: &'static str,
    #[source]
    pub cause: Option<ValidationError>,
}

fn cause_suffix(cause: &Option<ValidationError>) -> String {
    cause.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default()
}

impl FormatError {
    fn unrecognized(input: &str, hint: &'static str) -> Self {
        Self {
            input: input.to_string(),
            hint,
            cause: None,
        }
    }

    fn invalid(input: &str, hint: &'static str, cause: ValidationError) -> Self {
        Self {
            input: input.to_string(),
            hint,
            cause: Some(cause),
        }
    }
}

/// Weight, reps and sets parsed without an exercise name
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Load {
    pub weight: f64,
    pub reps: i32,
    pub sets: i32,
}

/// Raw captures of one matched shape, before validation
#[derive(Debug, Clone, PartialEq)]
struct Fields {
    name: Option<String>,
    load: Load,
    note: Option<String>,
}

/// A matcher paired with the extractor that reads its captures
struct Shape {
    label: &'static str,
    regex: Regex,
    extract: fn(&Captures<'_>) -> Option<Fields>,
}

impl Shape {
    fn new(label: &'static str, pattern: &str, extract: fn(&Captures<'_>) -> Option<Fields>) -> Self {
        Self {
            label,
            regex: Regex::new(pattern).expect("shape pattern must compile"),
            extract,
        }
    }

    fn apply(&self, text: &str) -> Option<Fields> {
        self.regex.captures(text).and_then(|caps| (self.extract)(&caps))
    }
}

const WEIGHT: &str = r"(?P<weight>\d+(?:[.,]\d+)?)\s*(?:кг|kg)?";

/// Entry shapes in priority order
static ENTRY_SHAPES: LazyLock<Vec<Shape>> = LazyLock::new(|| {
    vec![
        Shape::new(
            "name weight RxS [note]",
            &format!(
                r"(?is)^(?P<name>.+?)\s+{WEIGHT}\s+(?P<reps>\d+)\s*[xх×]\s*(?P<sets>\d+)(?:\s+(?P<note>.*))?$"
            ),
            extract_fields,
        ),
        Shape::new(
            "name weight R S [note]",
            &format!(
                r"(?is)^(?P<name>.+?)\s+{WEIGHT}\s+(?P<reps>\d+)\s+(?P<sets>\d+)(?:\s+(?P<note>.*))?$"
            ),
            extract_fields,
        ),
    ]
});

/// Name-less shapes in priority order; input is lowercased beforehand
static SETS_SHAPES: LazyLock<Vec<Shape>> = LazyLock::new(|| {
    vec![
        Shape::new(
            "weight Rreps Ssets",
            &format!(r"^{WEIGHT}\s+(?P<reps>\d+)\s*reps?\s+(?P<sets>\d+)\s*sets?$"),
            extract_fields,
        ),
        Shape::new(
            "weight RxS",
            &format!(r"^{WEIGHT}\s+(?P<reps>\d+)\s*[xх×]\s*(?P<sets>\d+)$"),
            extract_fields,
        ),
        Shape::new(
            "weight R S",
            &format!(r"^{WEIGHT}\s+(?P<reps>\d+)\s+(?P<sets>\d+)$"),
            extract_fields,
        ),
    ]
});

fn extract_fields(caps: &Captures<'_>) -> Option<Fields> {
    let weight = caps["weight"].replace(',', ".").parse::<f64>().ok()?;
    // Out-of-range integers make the shape not match
    let reps = caps["reps"].parse::<i32>().ok()?;
    let sets = caps["sets"].parse::<i32>().ok()?;

    let name = caps.name("name").map(|m| m.as_str().trim().to_string());
    let note = caps
        .name("note")
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty());

    Some(Fields {
        name,
        load: Load { weight, reps, sets },
        note,
    })
}

fn first_match(shapes: &[Shape], text: &str) -> Option<Fields> {
    shapes.iter().find_map(|shape| {
        let fields = shape.apply(text)?;
        tracing::debug!(shape = shape.label, "input matched");
        Some(fields)
    })
}

/// Parse a full entry such as "жим лежа 80 8x3" or
/// "присед 100кг 5 4 тяжело было" into a validated record stamped with the
/// current time.
pub fn parse_entry(input: &str) -> Result<Exercise, FormatError> {
    let text = normalize_numbers(input);

    let fields = first_match(&ENTRY_SHAPES, &text)
        .ok_or_else(|| FormatError::unrecognized(input, ENTRY_HINT))?;

    let Fields { name, load, note } = fields;
    Exercise::new(
        name.unwrap_or_default(),
        load.weight,
        load.reps,
        load.sets,
        note,
        Utc::now(),
    )
    .map_err(|e| FormatError::invalid(input, ENTRY_HINT, e))
}

/// Parse weight/reps/sets for an exercise whose name is supplied
/// separately, e.g. "80kg 8reps 3sets", "80кг 8x3", "100 5x4", "80 8 3".
pub fn parse_sets(input: &str) -> Result<Load, FormatError> {
    let text = normalize_numbers(&input.trim().to_lowercase());

    let Fields { load, .. } = first_match(&SETS_SHAPES, &text)
        .ok_or_else(|| FormatError::unrecognized(input, SETS_HINT))?;

    if load.reps < 1 {
        return Err(FormatError::invalid(
            input,
            SETS_HINT,
            ValidationError::InvalidReps(load.reps),
        ));
    }
    if load.sets < 1 {
        return Err(FormatError::invalid(
            input,
            SETS_HINT,
            ValidationError::InvalidSets(load.sets),
        ));
    }

    Ok(load)
}

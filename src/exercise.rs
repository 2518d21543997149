//! Exercise record - one logged entry of weight x reps x sets

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Record-level invariant violations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Вес не может быть отрицательным: {0}")]
    NegativeWeight(f64),
    #[error("Количество повторений должно быть >= 1, получено {0}")]
    InvalidReps(i32),
    #[error("Количество подходов должно быть >= 1, получено {0}")]
    InvalidSets(i32),
    #[error("Название упражнения не может быть пустым")]
    EmptyName,
}

/// Logged exercise. Fields are private so an instance is always valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    id: Option<i64>,
    name: String,
    weight: f64,
    reps: i32,
    sets: i32,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl Exercise {
    /// Build a new, not yet persisted record
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        reps: i32,
        sets: i32,
        note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();

        if weight.is_nan() || weight < 0.0 {
            return Err(ValidationError::NegativeWeight(weight));
        }
        if reps < 1 {
            return Err(ValidationError::InvalidReps(reps));
        }
        if sets < 1 {
            return Err(ValidationError::InvalidSets(sets));
        }
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self {
            id: None,
            name,
            weight,
            reps,
            sets,
            note,
            created_at,
        })
    }

    /// Attach the store-assigned identity
    pub(crate) fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Skips validation so store-level constraints can be exercised
    #[cfg(test)]
    pub(crate) fn with_weight_unchecked(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn reps(&self) -> i32 {
        self.reps
    }

    pub fn sets(&self) -> i32 {
        self.sets
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Total load: weight * reps * sets
    pub fn total_volume(&self) -> f64 {
        self.weight * f64::from(self.reps) * f64::from(self.sets)
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}кг x {} повт. x {} подх.",
            self.name,
            format_weight(self.weight),
            self.reps,
            self.sets
        )?;
        if let Some(note) = &self.note {
            write!(f, " ({})", note)?;
        }
        Ok(())
    }
}

/// Key used to compare exercise names: trimmed, lowercase, ё folded to е.
///
/// Only ever used for equality in lookups, never stored or shown.
pub fn match_key(name: &str) -> String {
    name.trim().to_lowercase().replace('ё', "е")
}

/// Weight without a trailing ".0" for whole numbers
pub fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 && weight.abs() < 1e15 {
        format!("{}", weight as i64)
    } else {
        format!("{}", weight)
    }
}

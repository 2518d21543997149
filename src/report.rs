//! Text rendering of query results for the CLI and the bot

use std::fmt::Write;

use chrono::Local;

use crate::exercise::{Exercise, format_weight};
use crate::intent::Outcome;

/// Width of the progress bar at the heaviest weight
const GRAPH_WIDTH: usize = 20;

/// Min/max/average over a progress window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

impl ProgressSummary {
    pub fn from_history(history: &[Exercise]) -> Option<Self> {
        if history.is_empty() {
            return None;
        }
        let weights = history.iter().map(Exercise::weight);
        let min = weights.clone().fold(f64::INFINITY, f64::min);
        let max = weights.clone().fold(f64::NEG_INFINITY, f64::max);
        let average = weights.sum::<f64>() / history.len() as f64;
        Some(Self {
            count: history.len(),
            min,
            max,
            average,
        })
    }

    /// Bar length for a weight, scaled between min and max
    pub fn bar_len(&self, weight: f64) -> usize {
        let range = self.max - self.min;
        if range <= 0.0 {
            return GRAPH_WIDTH;
        }
        ((weight - self.min) / range * GRAPH_WIDTH as f64) as usize + 1
    }
}

fn sets_line(ex: &Exercise) -> String {
    format!("{}кг {}x{}", format_weight(ex.weight()), ex.reps(), ex.sets())
}

fn not_found(name: &str) -> String {
    format!("Упражнение '{}' не найдено", name)
}

pub fn render_added(id: i64, exercise: &Exercise) -> String {
    format!("Упражнение добавлено (ID: {}):\n{}", id, exercise)
}

pub fn render_today(records: &[Exercise]) -> String {
    if records.is_empty() {
        return "Сегодня тренировок пока не было. Пора в зал!".to_string();
    }

    let mut text = String::from("Тренировки за сегодня:\n\n");
    for (i, ex) in records.iter().enumerate() {
        let time = ex.created_at().with_timezone(&Local).format("%H:%M");
        let _ = write!(text, "{}. [{}] {}: {}", i + 1, time, ex.name(), sets_line(ex));
        if let Some(note) = ex.note() {
            let _ = write!(text, " ({})", note);
        }
        text.push('\n');
    }

    let volume: f64 = records.iter().map(Exercise::total_volume).sum();
    let _ = write!(
        text,
        "\nВсего упражнений: {}\nОбщий объем: {:.0} кг",
        records.len(),
        volume
    );
    text
}

pub fn render_max(name: &str, best: Option<&Exercise>) -> String {
    match best {
        Some(ex) => format!(
            "Максимум {}: {}кг ({})",
            name,
            format_weight(ex.weight()),
            ex.created_at().with_timezone(&Local).format("%d.%m.%Y")
        ),
        None => not_found(name),
    }
}

pub fn render_last(name: &str, last: Option<&Exercise>) -> String {
    match last {
        Some(ex) => {
            let mut text = format!(
                "Последний раз {}: {} - {}",
                name,
                ex.created_at().with_timezone(&Local).format("%d.%m.%Y %H:%M"),
                sets_line(ex)
            );
            if let Some(note) = ex.note() {
                let _ = write!(text, " ({})", note);
            }
            text
        }
        None => not_found(name),
    }
}

pub fn render_progress(name: &str, days: i64, history: &[Exercise]) -> String {
    let Some(summary) = ProgressSummary::from_history(history) else {
        return not_found(name);
    };

    let mut text = format!("Прогресс {} за {} дн.:\n\n", name, days);
    for ex in history {
        let _ = writeln!(
            text,
            "  {}  {:>6}кг {}x{}  {}",
            ex.created_at().with_timezone(&Local).format("%d.%m.%Y"),
            format_weight(ex.weight()),
            ex.reps(),
            ex.sets(),
            "=".repeat(summary.bar_len(ex.weight()))
        );
    }
    let _ = write!(
        text,
        "\nВсего записей: {}\nМин: {}кг | Макс: {}кг | Среднее: {:.1}кг",
        summary.count,
        format_weight(summary.min),
        format_weight(summary.max),
        summary.average
    );
    text
}

pub fn render_names(names: &[String]) -> String {
    if names.is_empty() {
        return "Упражнений пока нет".to_string();
    }
    let mut text = String::from("Упражнения:\n");
    for name in names {
        let _ = writeln!(text, "• {}", name);
    }
    text.trim_end().to_string()
}

pub fn render(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Added { id, exercise } => render_added(*id, exercise),
        Outcome::Today(records) => render_today(records),
        Outcome::Max { name, best } => render_max(name, best.as_ref()),
        Outcome::Last { name, last } => render_last(name, last.as_ref()),
        Outcome::Progress { name, days, history } => render_progress(name, *days, history),
    }
}

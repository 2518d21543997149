//! Decoding of the chat model's reply into an [`Intent`]

use chrono::Utc;
use serde::Deserialize;

use super::VoiceError;
use crate::exercise::Exercise;
use crate::intent::{DEFAULT_PROGRESS_DAYS, Intent};

pub const SYSTEM_PROMPT: &str = r#"Ты - парсер голосовых команд для дневника тренировок в зале.

Текст приходит из распознавания речи и может содержать ошибки:
- "Делажим лёжу" = "делаю жим лежа"
- "жима-лёжу" = "жим лежа"
- "Чё я с вами делал" = "что я сегодня делал"

Правила:
1. Всегда заменяй ё на е в названиях: "жим лежа".
2. Приводи название к базовой форме: "лёжу/лежа/лёжа" -> "жим лежа".
3. "8 по 3" или "8 на 3" = 8 повторений, 3 подхода.
4. Числа прописью переводи в цифры.
5. Если не указан вес, не угадывай - попроси уточнить.

Намерения:
- упражнение + числа -> add
- "что делал", "сегодня", "тренировка" -> today
- "максимум", "рекорд", "лучший" -> max
- "последний раз", "когда делал" -> last
- "прогресс", "динамика" -> progress

Ответь ТОЛЬКО JSON одного из видов:
{"intent": "add", "name": "жим лежа", "weight": 80, "reps": 8, "sets": 3, "note": null}
{"intent": "today"}
{"intent": "max", "name": "жим лежа"}
{"intent": "last", "name": "присед"}
{"intent": "progress", "name": "присед", "days": 90}
{"intent": "clarify", "message": "Какой был вес? Скажи: жим лежа 80 кг 8 на 3"}

Если запрос совсем не про тренировки:
{"intent": "clarify", "message": "Я помогаю с тренировками. Скажи что добавить или спроси статистику."}
"#;

/// One reply of the chat model, tagged by `intent`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "intent", rename_all = "lowercase")]
pub enum Reply {
    Add {
        name: String,
        weight: f64,
        reps: i32,
        sets: i32,
        #[serde(default)]
        note: Option<String>,
    },
    Today,
    Max {
        name: String,
    },
    Last {
        name: String,
    },
    Progress {
        name: String,
        #[serde(default)]
        days: Option<i64>,
    },
    Clarify {
        message: String,
    },
}

impl Reply {
    /// Decode raw model output, tolerating a surrounding code fence
    pub fn decode(content: &str) -> Result<Self, VoiceError> {
        let body = strip_fence(content);
        if body.is_empty() {
            return Err(VoiceError::EmptyReply);
        }
        serde_json::from_str(body).map_err(|source| VoiceError::MalformedReply {
            content: content.to_string(),
            source,
        })
    }

    pub fn into_intent(self) -> Result<Intent, VoiceError> {
        match self {
            Reply::Add {
                name,
                weight,
                reps,
                sets,
                note,
            } => Ok(Intent::Add(Exercise::new(
                name,
                weight,
                reps,
                sets,
                note,
                Utc::now(),
            )?)),
            Reply::Today => Ok(Intent::Today),
            Reply::Max { name } => Ok(Intent::Max { name }),
            Reply::Last { name } => Ok(Intent::Last { name }),
            Reply::Progress { name, days } => Ok(Intent::Progress {
                name,
                days: days.unwrap_or(DEFAULT_PROGRESS_DAYS),
            }),
            Reply::Clarify { message } => Err(VoiceError::Clarify(message)),
        }
    }
}

fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

//! User intents shared by the CLI, the bot and the voice pathway

use crate::db::{self, Database};
use crate::exercise::Exercise;

/// Default window for progress queries
pub const DEFAULT_PROGRESS_DAYS: i64 = 90;

/// What the user asked for. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Add(Exercise),
    Today,
    Max { name: String },
    Last { name: String },
    Progress { name: String, days: i64 },
}

/// Result of running an intent against the store
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Added { id: i64, exercise: Exercise },
    Today(Vec<Exercise>),
    Max { name: String, best: Option<Exercise> },
    Last { name: String, last: Option<Exercise> },
    Progress {
        name: String,
        days: i64,
        history: Vec<Exercise>,
    },
}

impl Intent {
    pub fn progress(name: impl Into<String>) -> Self {
        Intent::Progress {
            name: name.into(),
            days: DEFAULT_PROGRESS_DAYS,
        }
    }

    pub fn execute(self, db: &Database) -> db::Result<Outcome> {
        Ok(match self {
            Intent::Add(exercise) => {
                let id = db.add(&exercise)?;
                Outcome::Added { id, exercise }
            }
            Intent::Today => Outcome::Today(db.todays_records()?),
            Intent::Max { name } => {
                let best = db.max_weight(&name)?;
                Outcome::Max { name, best }
            }
            Intent::Last { name } => {
                let last = db.last_record(&name)?;
                Outcome::Last { name, last }
            }
            Intent::Progress { name, days } => {
                let history = db.history(&name, days)?;
                Outcome::Progress { name, days, history }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_add_then_query() {
        let db = Database::open_in_memory().unwrap();
        let ex = Exercise::new("жим лёжа", 80.0, 8, 3, None, Utc::now()).unwrap();

        let outcome = Intent::Add(ex.clone()).execute(&db).unwrap();
        let Outcome::Added { id, exercise } = outcome else {
            panic!("expected Added");
        };
        assert_eq!(exercise, ex);

        let best = Intent::Max { name: "жим лежа".into() }.execute(&db).unwrap();
        match best {
            Outcome::Max { best: Some(best), .. } => assert_eq!(best.id(), Some(id)),
            other => panic!("unexpected {other:?}"),
        }

        match Intent::Today.execute(&db).unwrap() {
            Outcome::Today(records) => assert_eq!(records.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_absent_name() {
        let db = Database::open_in_memory().unwrap();
        let outcome = Intent::Last { name: "присед".into() }.execute(&db).unwrap();
        assert_eq!(
            outcome,
            Outcome::Last {
                name: "присед".into(),
                last: None
            }
        );
    }

    #[test]
    fn test_progress_default_window() {
        let db = Database::open_in_memory().unwrap();
        let old = Exercise::new("жим", 60.0, 8, 3, None, Utc::now() - Duration::days(120)).unwrap();
        let recent = Exercise::new("жим", 70.0, 8, 3, None, Utc::now() - Duration::days(20)).unwrap();
        db.add(&old).unwrap();
        db.add(&recent).unwrap();

        match Intent::progress("жим").execute(&db).unwrap() {
            Outcome::Progress { days, history, .. } => {
                assert_eq!(days, DEFAULT_PROGRESS_DAYS);
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].weight(), 70.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_progress_invalid_window() {
        let db = Database::open_in_memory().unwrap();
        let intent = Intent::Progress { name: "жим".into(), days: 0 };
        assert!(matches!(
            intent.execute(&db),
            Err(db::StoreError::InvalidWindow(0))
        ));
    }
}

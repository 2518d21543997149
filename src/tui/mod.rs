//! TUI module - today's log as a terminal dashboard

use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Table, Row, Cell},
};
use std::io::{stdout, Stdout};

use crate::db::Database;
use crate::exercise::{Exercise, format_weight};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// App state for TUI
pub struct App {
    db: Database,
    today: Vec<Exercise>,
    should_quit: bool,
}

impl App {
    pub fn new(db: Database) -> Result<Self> {
        let today = db.todays_records()?;
        Ok(Self {
            db,
            today,
            should_quit: false,
        })
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        let result = self.event_loop(&mut terminal);

        restore_terminal()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn total_volume(&self) -> f64 {
        self.today.iter().map(Exercise::total_volume).sum()
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        let header = Paragraph::new(format!(
            "gym - тренировка за {}",
            Local::now().format("%d.%m.%Y")
        ))
        .style(Style::default().fg(Color::Cyan).bold())
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let rows: Vec<Row> = self.today.iter().map(|ex| {
            Row::new(vec![
                Cell::from(ex.created_at().with_timezone(&Local).format("%H:%M").to_string()),
                Cell::from(ex.name().to_string()),
                Cell::from(format!("{}кг", format_weight(ex.weight()))),
                Cell::from(format!("{}x{}", ex.reps(), ex.sets())),
                Cell::from(ex.note().unwrap_or_default().to_string()),
            ])
        }).collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(7),
                Constraint::Length(24),
                Constraint::Length(10),
                Constraint::Length(8),
                Constraint::Min(20),
            ],
        )
        .header(Row::new(vec!["Время", "Упражнение", "Вес", "ПxП", "Заметка"])
            .style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title("Сегодня"));

        frame.render_widget(table, chunks[1]);

        let footer = Paragraph::new(format!(
            "Упражнений: {} | Объем: {:.0} кг | q: выход | r: обновить",
            self.today.len(),
            self.total_volume()
        ))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                        KeyCode::Char('r') => {
                            self.today = self.db.todays_records()?;
                        }
                        _ => {}
                    }
                }
        Ok(())
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

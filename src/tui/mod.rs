mod ui;
mod widgets;

use std::io;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::catalog::TestKind;
use crate::engine::{AssessmentEngine, Phase};
use crate::error::AssessmentError;
use crate::models::HistoryEntry;
use crate::notify::{ResultsUpdated, SignalWatcher};
use crate::profile::{recent_history, RECENT_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Select,
    Question,
    Result,
    History,
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App {
    engine: AssessmentEngine,
    updates: Receiver<ResultsUpdated>,
    watcher: SignalWatcher,
    pub view: View,
    pub tests: StatefulList<TestKind>,
    pub option_cursor: usize,
    pub history: Vec<HistoryEntry>,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(mut engine: AssessmentEngine) -> Result<Self, Box<dyn std::error::Error>> {
        let updates = engine.subscribe();
        let watcher = SignalWatcher::new(engine.db())?;
        let kinds = engine
            .catalog()
            .definitions()
            .iter()
            .map(|d| d.kind)
            .collect();

        let mut app = Self {
            engine,
            updates,
            watcher,
            view: View::Select,
            tests: StatefulList::with_items(kinds),
            option_cursor: 0,
            history: Vec::new(),
            status: None,
            should_quit: false,
        };
        app.reload_history()?;
        Ok(app)
    }

    pub fn engine(&self) -> &AssessmentEngine {
        &self.engine
    }

    pub fn reload_history(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let db = self.engine.db();
        self.history = recent_history(
            self.engine.catalog(),
            &db.load_results()?,
            &db.load_legacy_tests()?,
            RECENT_LIMIT,
        );
        Ok(())
    }

    /// Picks up results saved by this process or by another one sharing the
    /// database.
    fn sync_history(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut changed = false;
        while self.updates.try_recv().is_ok() {
            changed = true;
        }
        if self.watcher.poll(self.engine.db())? {
            debug!("profile update signal observed");
            changed = true;
        }
        if changed {
            self.reload_history()?;
        }
        Ok(())
    }

    pub fn start_test(&mut self, kind: TestKind) -> Result<(), Box<dyn std::error::Error>> {
        self.engine.return_to_selection();
        self.engine.start_test(kind)?;
        self.option_cursor = 0;
        self.status = None;
        self.view = View::Question;
        Ok(())
    }

    fn show_history(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.reload_history()?;
        self.view = View::History;
        Ok(())
    }

    fn back_to_selection(&mut self) {
        self.engine.return_to_selection();
        self.status = None;
        self.view = View::Select;
    }

    /// Moves the option cursor onto the recorded answer, if any.
    fn sync_cursor(&mut self) {
        self.option_cursor = self
            .engine
            .current_question()
            .and_then(|q| {
                q.selected
                    .and_then(|v| q.options.iter().position(|o| o.value == v))
            })
            .unwrap_or(0);
    }

    /// Turns a rejected transition into a status message; anything else is
    /// a real failure.
    fn apply(
        &mut self,
        outcome: Result<(), AssessmentError>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match outcome {
            Ok(()) => {
                self.status = None;
                Ok(())
            }
            Err(
                e @ (AssessmentError::OutOfSequenceTransition { .. }
                | AssessmentError::InvalidAnswerValue { .. }),
            ) => {
                self.status = Some(e.to_string());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn answer_at_cursor(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let value = self
            .engine
            .current_question()
            .and_then(|q| q.options.get(self.option_cursor).map(|o| o.value));
        if let Some(value) = value {
            let outcome = self.engine.select_answer(value);
            self.apply(outcome)?;
        }
        Ok(())
    }

    fn handle_question_key(&mut self, key: KeyCode) -> Result<(), Box<dyn std::error::Error>> {
        let option_count = self
            .engine
            .current_question()
            .map(|q| q.options.len())
            .unwrap_or(0);

        match key {
            KeyCode::Char('j') | KeyCode::Down if option_count > 0 => {
                self.option_cursor = (self.option_cursor + 1) % option_count;
            }
            KeyCode::Char('k') | KeyCode::Up if option_count > 0 => {
                self.option_cursor = (self.option_cursor + option_count - 1) % option_count;
            }
            KeyCode::Char(c @ '1'..='9') => {
                let position = c as usize - '1' as usize;
                if position < option_count {
                    self.option_cursor = position;
                    self.answer_at_cursor()?;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.answer_at_cursor()?,
            KeyCode::Char('l') | KeyCode::Right => {
                let outcome = self.engine.go_to_next();
                self.apply(outcome)?;
                self.sync_cursor();
            }
            KeyCode::Char('h') | KeyCode::Left => {
                let outcome = self.engine.go_to_previous();
                self.apply(outcome)?;
                self.sync_cursor();
            }
            KeyCode::Char('s') => {
                let outcome = self.engine.submit().map(|_| ());
                self.apply(outcome)?;
                if self.engine.phase() == Phase::Completed {
                    self.view = View::Result;
                }
            }
            KeyCode::Esc => self.back_to_selection(),
            _ => {}
        }
        Ok(())
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.view == View::Question {
            if key == KeyCode::Char('q') {
                self.back_to_selection();
            } else {
                self.handle_question_key(key)?;
            }
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.reload_history()?;
            }

            KeyCode::Tab | KeyCode::BackTab => match self.view {
                View::History => self.back_to_selection(),
                _ => self.show_history()?,
            },

            KeyCode::Char('j') | KeyCode::Down if self.view == View::Select => self.tests.next(),
            KeyCode::Char('k') | KeyCode::Up if self.view == View::Select => {
                self.tests.previous()
            }
            KeyCode::Char('g') if self.view == View::Select && !self.tests.items.is_empty() => {
                self.tests.selected = Some(0);
            }
            KeyCode::Char('G') if self.view == View::Select && !self.tests.items.is_empty() => {
                self.tests.selected = Some(self.tests.items.len() - 1);
            }

            KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Select => {
                    if let Some(&kind) = self.tests.selected_item() {
                        self.start_test(kind)?;
                    }
                }
                View::Result => self.back_to_selection(),
                _ => {}
            },

            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::Result | View::History => self.back_to_selection(),
                _ => {}
            },

            _ => {}
        }
        Ok(())
    }
}

pub fn run(
    engine: AssessmentEngine,
    initial: Option<TestKind>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Create app state before touching the terminal so setup errors print normally
    let mut app = App::new(engine)?;
    if let Some(kind) = initial {
        app.start_test(kind)?;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.sync_history()?;
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::db::Database;

    fn setup_app() -> App {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        App::new(AssessmentEngine::new(Catalog::builtin(), db).unwrap()).unwrap()
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE).unwrap();
    }

    mod stateful_list_tests {
        use super::*;

        #[test]
        fn next_wraps_around() {
            let mut list = StatefulList::with_items(vec![1, 2, 3]);
            list.next();
            list.next();
            list.next();
            assert_eq!(list.selected, Some(0));
        }

        #[test]
        fn previous_wraps_around() {
            let mut list = StatefulList::with_items(vec![1, 2, 3]);
            list.previous();
            assert_eq!(list.selected, Some(2));
        }

        #[test]
        fn empty_list_has_no_selection() {
            let mut list: StatefulList<i32> = StatefulList::with_items(vec![]);
            list.next();
            assert!(list.selected_item().is_none());
        }
    }

    mod flow_tests {
        use super::*;

        #[test]
        fn enter_on_selection_starts_test() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Char('j'));
            press(&mut app, KeyCode::Enter);
            assert_eq!(app.view, View::Question);
            assert_eq!(app.engine().session().unwrap().kind, TestKind::Gad7);
        }

        #[test]
        fn advancing_unanswered_question_sets_status() {
            let mut app = setup_app();
            app.start_test(TestKind::Phq9).unwrap();
            press(&mut app, KeyCode::Char('l'));
            assert!(app.status.as_deref().unwrap().contains("not been answered"));
            assert_eq!(app.engine().session().unwrap().current_index, 0);
        }

        #[test]
        fn full_keyboard_run_saves_result() {
            let mut app = setup_app();
            app.start_test(TestKind::Gad7).unwrap();
            for i in 0..7 {
                press(&mut app, KeyCode::Char('4'));
                if i < 6 {
                    press(&mut app, KeyCode::Char('l'));
                }
            }
            press(&mut app, KeyCode::Char('s'));

            assert_eq!(app.view, View::Result);
            let result = app.engine().completed_result().unwrap();
            assert_eq!(result.score, 21);

            app.sync_history().unwrap();
            assert_eq!(app.history.len(), 1);
            assert_eq!(app.history[0].name, "GAD-7");
            assert_eq!(app.history[0].category.as_deref(), Some("Severe Anxiety"));
        }

        #[test]
        fn going_back_restores_cursor() {
            let mut app = setup_app();
            app.start_test(TestKind::Phq9).unwrap();
            press(&mut app, KeyCode::Char('3'));
            press(&mut app, KeyCode::Char('l'));
            assert_eq!(app.option_cursor, 0);
            press(&mut app, KeyCode::Char('h'));
            assert_eq!(app.option_cursor, 2);
        }

        #[test]
        fn escape_discards_test() {
            let mut app = setup_app();
            app.start_test(TestKind::Sleep).unwrap();
            press(&mut app, KeyCode::Char('1'));
            press(&mut app, KeyCode::Esc);
            assert_eq!(app.view, View::Select);
            assert_eq!(app.engine().phase(), Phase::Selecting);
            assert!(app.engine().db().load_results().unwrap().is_empty());
        }

        #[test]
        fn tab_toggles_history() {
            let mut app = setup_app();
            press(&mut app, KeyCode::Tab);
            assert_eq!(app.view, View::History);
            press(&mut app, KeyCode::Tab);
            assert_eq!(app.view, View::Select);
        }
    }
}

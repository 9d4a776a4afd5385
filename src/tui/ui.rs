use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{history, question, result, select};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_status(f, app, chunks[2]);
    draw_help_bar(f, app, chunks[3]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Tests", "History"];
    let selected = match app.view {
        View::Select | View::Question | View::Result => 0,
        View::History => 1,
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" CampusCare "))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Select => select::draw(f, app, area),
        View::Question => question::draw(f, app, area),
        View::Result => result::draw(f, app, area),
        View::History => history::draw(f, app, area),
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(msg) => Line::from(Span::styled(msg.as_str(), Style::default().fg(Color::Red))),
        None => Line::from(""),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn key(k: &'static str) -> Span<'static> {
    Span::styled(k, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    match app.view {
        View::Select => {
            spans.extend(vec![
                key("j/k"),
                Span::raw(" Nav  "),
                key("l/<CR>"),
                Span::raw(" Start  "),
                key("<Tab>"),
                Span::raw(" History  "),
                key("q"),
                Span::raw(" Quit"),
            ]);
        }
        View::Question => {
            spans.extend(vec![
                key("j/k"),
                Span::raw(" Option  "),
                key("<CR>/1-9"),
                Span::raw(" Answer  "),
                key("h/l"),
                Span::raw(" Prev/Next  "),
            ]);
            let on_last = app
                .engine()
                .current_question()
                .map(|q| q.is_last)
                .unwrap_or(false);
            if on_last {
                spans.extend(vec![key("s"), Span::raw(" Submit  ")]);
            }
            spans.extend(vec![key("<Esc>"), Span::raw(" Abandon")]);
        }
        View::Result => {
            spans.extend(vec![
                key("<CR>/<Esc>"),
                Span::raw(" Back to tests  "),
                key("<Tab>"),
                Span::raw(" History  "),
                key("q"),
                Span::raw(" Quit"),
            ]);
        }
        View::History => {
            spans.extend(vec![
                key("h/<Esc>"),
                Span::raw(" Back  "),
                key("^r"),
                Span::raw(" Refresh  "),
                key("q"),
                Span::raw(" Quit"),
            ]);
        }
    }

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}

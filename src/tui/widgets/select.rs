use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let catalog = app.engine().catalog();

    let items: Vec<ListItem> = app
        .tests
        .items
        .iter()
        .filter_map(|&kind| catalog.get(kind).ok())
        .map(|def| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<24}", def.title),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>3} questions", def.question_count()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("   max score {}", def.max_score),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Choose an assessment ")
        .title_style(Style::default().fg(Color::Cyan));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.tests.selected);

    f.render_stateful_widget(list, area, &mut state);
}

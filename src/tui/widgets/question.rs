use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let engine = app.engine();
    let (Some(def), Some(question)) = (engine.active_definition(), engine.current_question())
    else {
        let block = Block::default().borders(Borders::ALL).title(" Question ");
        f.render_widget(Paragraph::new("No test in progress").block(block), area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress
            Constraint::Length(5), // Prompt
            Constraint::Min(0),    // Options
        ])
        .split(area);

    let position = question.index + 1;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", def.title))
                .title_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(position as f64 / question.total as f64)
        .label(format!("Question {} of {}", position, question.total));
    f.render_widget(gauge, chunks[0]);

    let prompt = Paragraph::new(question.prompt)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true });
    f.render_widget(prompt, chunks[1]);

    let items: Vec<ListItem> = question
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let chosen = question.selected == Some(option.value);
            let marker = if chosen { "(•)" } else { "( )" };
            let style = if chosen {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{} {}", marker, option.label), style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Answer "))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.option_cursor));
    f.render_stateful_widget(list, chunks[2], &mut state);
}

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::{score_bar, severity_color};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Tests ")
        .title_style(Style::default().fg(Color::Magenta));

    if app.history.is_empty() {
        let paragraph = Paragraph::new("No test results yet. Take an assessment to see it here.")
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .history
        .iter()
        .map(|entry| {
            let color = entry
                .severity_class
                .as_deref()
                .map(severity_color)
                .unwrap_or(Color::White);

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<12}", format_date(entry.taken_at)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<22}", truncate(&entry.name, 20)),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:>2}/{:<3} ", entry.score, entry.max_score),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    score_bar(entry.score, entry.max_score, 10),
                    Style::default().fg(color),
                ),
                Span::raw("  "),
                Span::styled(
                    entry.category.clone().unwrap_or_default(),
                    Style::default().fg(color),
                ),
            ]))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn format_date(taken_at: Option<DateTime<Utc>>) -> String {
    match taken_at {
        Some(dt) => dt.with_timezone(&Local).format("%b %d, %Y").to_string(),
        None => "Unknown".to_string(),
    }
}

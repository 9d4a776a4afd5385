pub mod history;
pub mod question;
pub mod result;
pub mod select;

use ratatui::style::Color;

/// Display colour for a range's severity class.
pub fn severity_color(severity_class: &str) -> Color {
    match severity_class {
        "minimal" => Color::Green,
        "mild" => Color::LightGreen,
        "moderate" => Color::Yellow,
        "moderately-severe" => Color::LightRed,
        "severe" => Color::Red,
        _ => Color::White,
    }
}

pub fn score_bar(score: u32, max_score: u32, width: usize) -> String {
    let filled = if max_score == 0 {
        0
    } else {
        (score.min(max_score) as usize * width) / max_score as usize
    };
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

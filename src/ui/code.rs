use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

const TAB: &str = "    ";

#[derive(Clone, Copy, Debug)]
pub struct CodeStyles {
    pub correct: Style,
    pub incorrect: Style,
    pub cursor: Style,
    pub untyped: Style,
}

/// Lay out `target` line by line, colouring each code point against `typed`.
/// Mistyped newlines are shown as `↵` so the error stays visible.
pub fn code_lines(target: &str, typed: &str, styles: &CodeStyles) -> Vec<Line<'static>> {
    let typed: Vec<char> = typed.chars().collect();
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();

    for (idx, expected) in target.chars().enumerate() {
        let style = match typed.get(idx) {
            Some(&c) if c == expected => styles.correct,
            Some(_) => styles.incorrect,
            None if idx == typed.len() => styles.cursor,
            None => styles.untyped,
        };

        if expected == '\n' {
            let marks_error = typed.get(idx).is_some_and(|&c| c != '\n');
            if marks_error || idx == typed.len() {
                spans.push(Span::styled("↵", style));
            }
            lines.push(Line::from(std::mem::take(&mut spans)));
            continue;
        }

        let text = match expected {
            '\t' => TAB.to_string(),
            ' ' if style == styles.incorrect => "·".to_string(),
            c => c.to_string(),
        };
        spans.push(Span::styled(text, style));
    }

    if target.chars().count() == typed.len() {
        spans.push(Span::styled(" ", styles.cursor));
    }
    lines.push(Line::from(spans));
    lines
}

pub fn default_styles() -> CodeStyles {
    use ratatui::style::Color;

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim_bold = bold.add_modifier(Modifier::DIM);
    CodeStyles {
        correct: bold.fg(Color::Green),
        incorrect: bold.fg(Color::Red),
        cursor: dim_bold.add_modifier(Modifier::UNDERLINED),
        untyped: dim_bold,
    }
}

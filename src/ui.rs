pub mod charting;
pub mod code;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, Screen, SubmitStatus},
    clock::Clock,
    config::Mode,
    history::{self, HistorySummary},
    keyboard::{self, Heat, KEYBOARD_ROWS},
    replay::ReplayPlayer,
    store::KeyValueStore,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const MISSED_KEYS_SHOWN: usize = 5;
const ACTIVITY_DAYS: u64 = 28;
const ACTIVITY_BLOCKS: [char; 5] = ['·', '░', '▒', '▓', '█'];

impl<S: KeyValueStore, C: Clock> Widget for &App<S, C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Typing => render_typing(self, area, buf),
            Screen::Results => render_results(self, area, buf),
            Screen::Replay => {
                if let Some(player) = &self.replay {
                    render_replay(self, player, area, buf);
                }
            }
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

/// Split `area` into a header, a vertically centered code block and a legend
fn code_layout(area: Rect, code_height: u16) -> [Rect; 3] {
    let free = area.height.saturating_sub(code_height + 2) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(free),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(code_height),
            Constraint::Length(1),
        ])
        .split(area);
    [chunks[1], chunks[3], chunks[4]]
}

fn render_typing<S: KeyValueStore, C: Clock>(app: &App<S, C>, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let config = session.config();
    let lines = code::code_lines(session.target(), session.user_input(), &code::default_styles());
    let [header, body, legend] = code_layout(area, lines.len() as u16);

    let clock = match config.mode {
        Mode::Timed => format!("{}s", session.time_remaining()),
        Mode::Practice => format!("{}s", session.elapsed_ms() / 1000),
    };
    let mut status = vec![
        Span::styled(format!("{} wpm", session.live_wpm()), bold().fg(Color::Yellow)),
        Span::raw("   "),
        Span::styled(clock, dim_bold()),
        Span::raw("   "),
        Span::styled(format!("{} · {}", config.language, config.mode), dim_bold()),
    ];
    if app.snippets_completed > 0 {
        status.push(Span::styled(
            format!("   {} done", app.snippets_completed),
            dim_bold(),
        ));
    }
    if session.is_paused() {
        status.push(Span::styled(
            "   PAUSED",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ));
    }
    Paragraph::new(Line::from(status)).render(header, buf);

    Paragraph::new(lines).render(body, buf);

    let hint = if session.is_active() {
        "(esc) stop / (ctrl+p) pause / (ctrl+r) restart / (ctrl+n) new"
    } else {
        "start typing / (→) new snippet / (esc)ape"
    };
    Paragraph::new(Span::styled(hint, italic())).render(legend, buf);
}

fn render_results<S: KeyValueStore, C: Clock>(app: &App<S, C>, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let Some(results) = session.results() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),                               // chart
            Constraint::Length(1),                            // stats
            Constraint::Length(1),                            // progress
            Constraint::Length(1),                            // missed keys
            Constraint::Length(KEYBOARD_ROWS.len() as u16),   // heatmap
            Constraint::Length(2),                            // history
            Constraint::Length(1),                            // settings
            Constraint::Length(1),                            // padding
            Constraint::Length(1),                            // legend
        ])
        .split(area);

    let history = session.wpm_history();
    let (overall_duration, highest_wpm) =
        charting::compute_chart_params(history, session.config().duration as f64);
    let net = charting::net_points(history);
    let raw = charting::raw_points(history);
    let datasets = vec![
        Dataset::default()
            .name("raw")
            .marker(ratatui::symbols::Marker::Braille)
            .style(Style::default().fg(Color::DarkGray))
            .graph_type(GraphType::Line)
            .data(&raw),
        Dataset::default()
            .name("wpm")
            .marker(ratatui::symbols::Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&net),
    ];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold()),
                    Span::styled(charting::format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(highest_wpm), bold()),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {:.2} sd",
            results.wpm,
            results.accuracy,
            session.consistency()
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let mut progress = vec![Span::styled(
        format!(
            "best {} wpm   streak {} day{}",
            session.personal_best(),
            results.daily_streak,
            if results.daily_streak == 1 { "" } else { "s" }
        ),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    )];
    if results.is_new_personal_best {
        progress.push(Span::styled(
            "   new personal best!",
            bold().fg(Color::Yellow),
        ));
    }
    match &app.submit_status {
        SubmitStatus::Saved => progress.push(Span::styled("   saved", dim_bold())),
        SubmitStatus::Failed(_) => {
            progress.push(Span::styled("   not saved", bold().fg(Color::Red)))
        }
        SubmitStatus::Skipped => {}
    }
    Paragraph::new(Line::from(progress))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let missed = session.most_missed_keys(MISSED_KEYS_SHOWN);
    let missed_text = if missed.is_empty() {
        "no missed keys".to_string()
    } else {
        let keys = missed
            .iter()
            .map(|(c, n)| format!("{} ×{n}", display_key(*c)))
            .collect::<Vec<_>>()
            .join("  ");
        format!("most missed: {keys}")
    };
    Paragraph::new(Span::styled(missed_text, dim_bold()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    render_heatmap(session.key_errors(), chunks[4], buf);

    if let Some(summary) = &app.history {
        render_history(summary, session.clock().today(), chunks[5], buf);
    }

    let config = session.config();
    Paragraph::new(Span::styled(
        format!(
            "(l)anguage: {}   (m)ode: {}   (d)uration: {}s",
            config.language, config.mode, config.duration
        ),
        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(chunks[6], buf);

    Paragraph::new(Span::styled(
        "(r)etry / (n)ew / re(p)lay / (esc)ape",
        italic(),
    ))
    .render(chunks[8], buf);
}

/// Totals over the score log plus a strip of recent daily activity
fn render_history(summary: &HistorySummary, today: NaiveDate, area: Rect, buf: &mut Buffer) {
    let mut totals = format!(
        "{} tests   best {} wpm   avg {} wpm {}% acc",
        summary.tests_completed,
        summary.best_wpm,
        summary.average_wpm,
        summary.average_accuracy
    );
    if let Some(top) = summary.languages.first() {
        totals.push_str(&format!("   top {} {}", top.language, top.best_weighted));
    }

    let max_daily = summary.max_daily();
    let mut strip = vec![Span::styled(
        format!("last {ACTIVITY_DAYS} days "),
        dim_bold(),
    )];
    strip.extend(
        summary
            .recent_activity(today, ACTIVITY_DAYS)
            .into_iter()
            .map(|(_, count)| {
                let level = history::activity_level(count, max_daily);
                let style = if level == 0 {
                    dim_bold()
                } else {
                    bold().fg(Color::Yellow)
                };
                Span::styled(ACTIVITY_BLOCKS[level as usize].to_string(), style)
            }),
    );
    strip.push(Span::styled(
        format!(" {} active days", summary.active_days()),
        dim_bold(),
    ));

    Paragraph::new(vec![
        Line::from(Span::styled(totals, italic())),
        Line::from(strip),
    ])
    .alignment(Alignment::Center)
    .render(area, buf);
}

fn render_heatmap(key_errors: &BTreeMap<char, u32>, area: Rect, buf: &mut Buffer) {
    let lines: Vec<Line> = KEYBOARD_ROWS
        .iter()
        .map(|row| {
            let spans = row
                .iter()
                .map(|&key| {
                    let style = match keyboard::heat(key_errors, key) {
                        Heat::None => dim_bold(),
                        Heat::Low => bold().fg(Color::Yellow),
                        Heat::Medium => bold().fg(Color::LightRed),
                        Heat::High => bold().fg(Color::Red).add_modifier(Modifier::REVERSED),
                    };
                    Span::styled(format!(" {key} "), style)
                })
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect();

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_replay<S: KeyValueStore, C: Clock>(
    app: &App<S, C>,
    player: &ReplayPlayer,
    area: Rect,
    buf: &mut Buffer,
) {
    let lines = code::code_lines(player.target(), player.display_input(), &code::default_styles());
    let [header, body, legend] = code_layout(area, lines.len() as u16);

    Paragraph::new(Line::from(vec![
        Span::styled(format!("{} wpm", player.current_wpm()), bold().fg(Color::Yellow)),
        Span::raw("   "),
        Span::styled(
            format!(
                "{}x {}",
                player.speed(),
                if player.is_playing() { "playing" } else { "paused" }
            ),
            dim_bold(),
        ),
    ]))
    .render(header, buf);

    Paragraph::new(lines).render(body, buf);

    let (wpm, accuracy) = app
        .session
        .results()
        .map(|r| (r.wpm, r.accuracy))
        .unwrap_or((0, 0));
    let summary = format!(
        "replay • {wpm} wpm • {accuracy}% acc • {}% complete",
        player.progress_percent()
    );
    let controls = "(space) play/pause / (r)eset / (1)(2)(4) speed / (b)ack";
    let width = legend.width as usize;
    let text = if summary.width() + controls.width() + 3 <= width {
        format!("{summary}   {controls}")
    } else {
        summary
    };
    Paragraph::new(Span::styled(text, italic())).render(legend, buf);
}

fn display_key(c: char) -> String {
    match c {
        ' ' => "space".to_string(),
        '\n' => "enter".to_string(),
        '\t' => "tab".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{Language, SessionConfig};
    use crate::score_log::{ScoreRecord, ScoreSubmission};
    use chrono::{Local, TimeZone};
    use crate::session::TypingSession;
    use crate::snippets::SnippetLibrary;
    use crate::store::MemoryStore;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn test_app(target: &str) -> (App<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let session = TypingSession::new(MemoryStore::new(), clock.clone());
        let mut app = App::new(session, SnippetLibrary::embedded(), None, 1);
        app.session.assign_target(target);
        (app, clock)
    }

    fn press(app: &mut App<MemoryStore, ManualClock>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn rendered(app: &App<MemoryStore, ManualClock>, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn typing_screen_shows_code_and_timer() {
        let (app, _clock) = test_app("let answer = 42;");
        let out = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(out.contains("let answer = 42;"));
        assert!(out.contains("30s"));
        assert!(out.contains("0 wpm"));
    }

    #[test]
    fn results_screen_shows_stats() {
        let (mut app, clock) = test_app("abcdef");
        for c in "abx".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        clock.advance_secs(3);
        app.on_frame();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Results);

        let out = rendered(&app, Rect::new(0, 0, 100, 30));
        assert!(out.contains("% acc"));
        assert!(out.contains("most missed: c ×1"));
        assert!(out.contains("(r)etry"));
    }

    #[test]
    fn results_screen_shows_score_history() {
        let (mut app, _clock) = test_app("abc");
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Esc);
        app.history = Some(HistorySummary::from_records(&[ScoreRecord {
            logged_at: Local.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap(),
            score: ScoreSubmission {
                wpm: 80,
                accuracy: 100,
                language: Language::Typescript,
                duration: 30,
            },
        }]));

        let out = rendered(&app, Rect::new(0, 0, 100, 32));
        assert!(out.contains("1 tests   best 80 wpm   avg 80 wpm 100% acc   top typescript 80"));
        assert!(out.contains("·░ 1 active days"));
    }

    #[test]
    fn replay_screen_shows_progress() {
        let (mut app, _clock) = test_app("ab");
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('p'));
        press(&mut app, KeyCode::Char(' '));

        let out = rendered(&app, Rect::new(0, 0, 120, 24));
        assert!(out.contains("50% complete"));
    }

    #[test]
    fn small_area_does_not_panic() {
        let (app, _clock) = test_app(&"x".repeat(300));
        let area = Rect::new(0, 0, 20, 5);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
        assert_eq!(*buffer.area(), area);
    }

    #[test]
    fn config_defaults_render() {
        assert_eq!(SessionConfig::default().mode.to_string(), "timed");
        assert_eq!(display_key(' '), "space");
        assert_eq!(display_key('{'), "{");
    }
}

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap},
};

use super::app::{App, Focus, MessageLevel, PanelAreas};
use super::view::{ListView, scroll_offset};

const GREEN: Color = Color::Rgb(34, 197, 94);            // Active green
const YELLOW: Color = Color::Rgb(250, 204, 21);          // Warning yellow
const RED: Color = Color::Rgb(239, 68, 68);              // Error red
const WHITE: Color = Color::Rgb(255, 255, 255);          // Pure white
const GRAY_100: Color = Color::Rgb(243, 244, 246);       // Near white
const GRAY_500: Color = Color::Rgb(107, 114, 128);       // Muted gray
const BG_DARK: Color = Color::Rgb(17, 17, 17);           // Main background
const BG_SELECTED: Color = Color::Rgb(39, 39, 42);       // Cursor row
const BORDER: Color = Color::Rgb(63, 63, 70);            // Border gray

// Semantic aliases
const ACCENT: Color = WHITE;
const SUCCESS: Color = GREEN;
const ERROR: Color = RED;
const TEXT_PRIMARY: Color = WHITE;
const TEXT_SECONDARY: Color = GRAY_100;
const TEXT_MUTED: Color = GRAY_500;

/// Height of the log panel including borders
const LOG_HEIGHT: u16 = 8;

/// Draws every panel and returns where the scrollable panels ended up.
pub fn draw(f: &mut Frame, app: &App) -> PanelAreas {
    let area = f.area();
    f.render_widget(Block::default().style(Style::default().bg(BG_DARK)), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),             // Panels
            Constraint::Length(LOG_HEIGHT), // Log
            Constraint::Length(1),          // Status bar
        ])
        .split(area);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25), // Streams
            Constraint::Percentage(25), // Records
            Constraint::Percentage(50), // Detail
        ])
        .split(rows[0]);

    let streams_title = if app.loading_streams {
        " Streams (loading) ".to_string()
    } else {
        format!(" Streams ({}) ", app.streams.len())
    };
    let streams = draw_list(
        f,
        panels[0],
        streams_title,
        &app.streams,
        app.focus == Focus::StreamList,
        if app.loading_streams {
            "Loading streams..."
        } else {
            "No streams"
        },
    );

    let records_title = match app.session_stream() {
        Some(stream) if app.ingesting => format!(" {stream} (loading {}) ", app.records.len()),
        Some(stream) => format!(" {stream} ({}) ", app.records.len()),
        None => " Records ".to_string(),
    };
    let records = draw_list(
        f,
        panels[1],
        records_title,
        &app.records,
        app.focus == Focus::RecordList,
        if app.ingesting {
            "Waiting for records..."
        } else {
            "No records"
        },
    );

    let detail = draw_detail(f, panels[2], app);

    draw_log(f, rows[1], app);
    draw_status_bar(f, rows[2], app);

    if app.focus == Focus::InsertOverlay {
        draw_insert_overlay(f, app);
    }

    PanelAreas {
        streams,
        records,
        detail,
    }
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .title(Line::from(Span::styled(
            title,
            Style::default()
                .fg(if focused { GREEN } else { TEXT_SECONDARY })
                .bold(),
        )))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { GREEN } else { BORDER }))
}

/// Draws a list panel and returns its inner area.
fn draw_list(
    f: &mut Frame,
    area: Rect,
    title: String,
    view: &ListView,
    focused: bool,
    empty_text: &str,
) -> Rect {
    let block = panel_block(title, focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if view.is_empty() {
        draw_placeholder(f, inner, empty_text);
        return inner;
    }

    let visible_height = inner.height as usize;
    let offset = scroll_offset(view.cursor(), visible_height);

    for (idx, line) in view.lines().iter().enumerate().skip(offset).take(visible_height) {
        let y = inner.y + (idx - offset) as u16;
        let row_area = Rect::new(inner.x, y, inner.width, 1);
        let is_cursor = idx == view.cursor();

        if is_cursor {
            f.render_widget(
                Block::default().style(Style::default().bg(BG_SELECTED)),
                row_area,
            );
        }

        let line = Line::from(vec![
            Span::styled(
                if is_cursor && focused { "▸" } else { " " },
                Style::default().fg(GREEN),
            ),
            Span::styled(
                line.as_str(),
                if is_cursor {
                    Style::default().fg(TEXT_PRIMARY).bold()
                } else {
                    Style::default().fg(TEXT_SECONDARY)
                },
            ),
        ]);
        f.render_widget(Paragraph::new(line), row_area);
    }

    inner
}

fn draw_placeholder(f: &mut Frame, area: Rect, text: &str) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(text, Style::default().fg(TEXT_MUTED))),
    ];
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_detail(f: &mut Frame, area: Rect, app: &App) -> Rect {
    let title = match app.detail.key() {
        Some(key) => format!(" {key} "),
        None => " Record ".to_string(),
    };
    let block = panel_block(title, app.focus == Focus::DetailView);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.detail.key().is_none() {
        draw_placeholder(f, inner, "Select a record to show its payload");
        return inner;
    }

    let lines: Vec<Line> = app
        .detail
        .text()
        .lines()
        .map(|line| Line::from(Span::styled(line, Style::default().fg(TEXT_PRIMARY))))
        .collect();
    let body = Paragraph::new(lines)
        .block(Block::default().padding(Padding::horizontal(1)))
        .scroll((app.detail.scroll().min(u16::MAX as usize) as u16, 0));
    f.render_widget(body, inner);

    inner
}

fn draw_log(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(Line::from(Span::styled(" Log ", Style::default().fg(TEXT_MUTED))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible = inner.height as usize;
    let skip = app.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = app
        .logs
        .iter()
        .skip(skip)
        .map(|log| {
            let color = match log.level {
                MessageLevel::Info => TEXT_SECONDARY,
                MessageLevel::Success => SUCCESS,
                MessageLevel::Error => ERROR,
            };
            Line::from(Span::styled(log.text.as_str(), Style::default().fg(color)))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let hints = match app.focus {
        Focus::StreamList => "jk nav | ⏎ open | r refresh | i insert | q quit",
        Focus::RecordList => "jk nav | ⏎ show | ← back | i insert | q quit",
        Focus::DetailView => "jk scroll | e export | ← back | i insert | q quit",
        Focus::InsertOverlay => "type | ⏎ publish | ^U clear | esc cancel",
    };

    let line = Line::from(vec![
        Span::styled(" ktui ", Style::default().fg(BG_DARK).bg(ACCENT).bold()),
        Span::styled("  ", Style::default()),
        Span::styled(hints, Style::default().fg(TEXT_MUTED)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn draw_insert_overlay(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 30, f.area());
    let stream = app.streams.current_line(0).unwrap_or("<no stream>");

    let (status, status_color) = if app.overlay.publishing {
        ("publishing...", YELLOW)
    } else {
        ("⏎ publish | esc cancel", TEXT_MUTED)
    };

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(&app.overlay.input, Style::default().fg(TEXT_PRIMARY)),
            Span::styled(
                if app.overlay.publishing { "" } else { "▎" },
                Style::default().fg(GREEN),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(status, Style::default().fg(status_color))),
    ];

    let block = Block::default()
        .title(Line::from(Span::styled(
            format!(" Insert record into {stream} "),
            Style::default().fg(GREEN).bold(),
        )))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GREEN))
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(BG_DARK));

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

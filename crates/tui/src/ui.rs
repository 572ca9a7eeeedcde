use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use pulse_core::interval::format_countdown;
use pulse_core::logger::{self, Level, LogLine};

use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    let (label, bg) = banner(app);
    let width = left[0].width as usize;
    let pad = width.saturating_sub(label.len());
    let centered = format!("{}{}{}", " ".repeat(pad / 2), label, " ".repeat(pad - pad / 2));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered,
        Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left[0]);

    let lines = if app.session.is_some() { capture_lines(app) } else { main_lines(app) };
    let body = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(body, left[1]);

    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let scroll = app.log_scroll.min(total.saturating_sub(visible_height));
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);
        let log_lines: Vec<Line> = app.log_messages[start..end].iter().map(log_line).collect();

        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Logs ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }

    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn banner(app: &App) -> (&'static str, Color) {
    if app.session.is_some() {
        ("CAPTURING (Esc to cancel)", Color::Yellow)
    } else if app.is_running() {
        ("RUNNING (Press S to stop)", Color::Green)
    } else {
        ("STOPPED (Press S to start)", Color::Red)
    }
}

fn key(k: &str) -> Span<'_> {
    Span::styled(k, Style::default().fg(Color::Yellow))
}

fn dim(s: String) -> Span<'static> {
    Span::styled(s, Style::default().fg(Color::DarkGray))
}

fn field(name: &str, value: String, keys: Vec<Span<'static>>) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!(" {:<12}", name), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled(format!("{:<18}", value), Style::default().fg(Color::Cyan)),
    ];
    spans.extend(keys);
    Line::from(spans)
}

fn main_lines(app: &App) -> Vec<Line<'static>> {
    let status = &app.status;
    let draft = &app.draft;
    let locked = app.is_running();
    let mut lines = vec![
        Line::from(Span::styled(format!(" {}", status.summary()), Style::default().fg(Color::White))),
        Line::from(""),
    ];

    let mut last = Vec::new();
    if let Some(sim) = status.last_similarity {
        let verdict = if status.last_action_taken { "clicked" } else { "skipped" };
        last.push(dim(format!(" last check: {:.1}% similar, {}", sim, verdict)));
    } else if status.running && status.click_count + status.skipped_count > 0 {
        last.push(dim(" last check: no gate".to_string()));
    }
    if let Some(at) = status.started_at.filter(|_| status.running) {
        last.push(dim(format!(" since {}", at.format("%H:%M:%S"))));
    }
    if let Some(at) = status.last_action_at {
        last.push(dim(format!("  at {}", at.format("%H:%M:%S"))));
    }
    if !last.is_empty() {
        lines.push(Line::from(last));
    }
    if let Some(err) = &status.last_error {
        lines.push(Line::from(Span::styled(
            format!(" error ({}x): {}", status.consecutive_failures, err),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(""));

    let point = draft.click_point.map_or("unset".to_string(), |p| p.to_string());
    lines.push(field("click point", point, vec![key("p"), dim(" pointer, ".into()), key("c"), dim(" capture".into())]));
    lines.push(field("click", draft.click_kind.label().to_string(), vec![key("m"), dim(" cycle".into())]));

    let interval = &draft.interval;
    lines.push(field(
        "interval",
        format_countdown(interval.min_seconds),
        vec![key("+"), dim("/".into()), key("-"), dim(" 10s".into())],
    ));
    let max = if interval.randomized {
        format!("up to {}", format_countdown(interval.max_seconds))
    } else {
        "off".to_string()
    };
    lines.push(field("random", max, vec![key("r"), dim(" toggle, ".into()), key("["), dim("/".into()), key("]"), dim(" max".into())]));

    let safety = &draft.safety;
    let gate = if safety.enabled {
        format!("on at {:.0}%", safety.threshold_percent)
    } else {
        "off".to_string()
    };
    lines.push(field("safety", gate, vec![key("g"), dim(" toggle, ".into()), key("<"), dim("/".into()), key(">"), dim(" threshold".into())]));

    let region = app.capture.as_ref().map_or("none".to_string(), |c| c.region.to_string());
    lines.push(field("region", region, Vec::new()));
    if let Some(c) = &app.capture {
        lines.push(field("rest point", c.rest_point.to_string(), Vec::new()));
    }

    lines.push(Line::from(""));
    if locked {
        lines.push(Line::from(dim(" settings apply on next start".into())));
    }
    if let Some(p) = app.pointer {
        lines.push(Line::from(dim(format!(" pointer {}", p))));
    }
    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(format!(" {}", notice), Style::default().fg(Color::Yellow))));
    }
    lines.push(Line::from(vec![
        Span::raw(" "),
        key("s"),
        dim(" start/stop  ".into()),
        key("l"),
        dim(" logs  ".into()),
        key("q"),
        dim(" quit".into()),
    ]));
    lines
}

fn capture_lines(app: &App) -> Vec<Line<'static>> {
    let Some(session) = &app.session else { return Vec::new() };
    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {}", session.step().prompt()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![Span::raw(" "), key("enter"), dim(" confirm  ".into()), key("esc"), dim(" cancel".into())]),
        Line::from(""),
    ];
    let snap = session.snapshot();
    lines.push(field("screen", format!("{}x{}", snap.width(), snap.height()), Vec::new()));
    if let Some(p) = session.click_point() {
        lines.push(field("click point", p.to_string(), Vec::new()));
    }
    if let Some(r) = session.region().or_else(|| session.live_region()) {
        lines.push(field("region", r.to_string(), Vec::new()));
    }
    let pointer = app.pointer.map_or("unavailable".to_string(), |p| p.to_string());
    lines.push(field("pointer", pointer, Vec::new()));
    if let Some(notice) = &app.notice {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", notice), Style::default().fg(Color::Yellow))));
    }
    lines
}

fn log_line(m: &LogLine) -> Line<'_> {
    let color = match m.color {
        logger::COLOR_GRAY => Color::DarkGray,
        logger::COLOR_BLUE => Color::LightBlue,
        logger::COLOR_GREEN => Color::Green,
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(m.timestamp.as_str(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];
    match m.level {
        Level::Error => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        Level::Warn => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        Level::Info => {}
    }
    if !m.prefix.is_empty() {
        spans.push(Span::styled(m.prefix.as_str(), Style::default().fg(color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(m.message.as_str(), Style::default().fg(color)));
    Line::from(spans)
}

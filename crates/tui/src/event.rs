use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::App;
use crate::ui;

const INTERVAL_STEP: i64 = 10;

pub fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> anyhow::Result<()> {
    loop {
        if app.should_quit {
            return Ok(());
        }

        app.drain_logs();
        app.drain_status();
        app.poll_pointer();

        terminal.draw(|f| ui::draw(f, app))?;

        // 100ms poll keeps the countdown and live region fresh
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.scroll_log_up(3),
                    MouseEventKind::ScrollDown => app.scroll_log_down(3),
                    _ => {}
                },
                _ => {}
            }
        }
    }
}

/// Route a key press. An open dialog or capture session takes the keyboard.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    if let Some(dialog) = app.confirm.as_mut() {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => dialog.toggle(),
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                dialog.selected = true;
                app.answer_confirm();
            }
            KeyCode::Enter => app.answer_confirm(),
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => app.confirm = None,
            _ => {}
        }
        return;
    }

    if app.session.is_some() {
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => app.confirm_capture_step(),
            KeyCode::Esc => app.cancel_capture(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.request_quit(),
        KeyCode::Char('s') | KeyCode::Char('S') => app.start_stop(),
        KeyCode::Char('c') | KeyCode::Char('C') => app.begin_capture(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.pick_point(),
        KeyCode::Char('m') | KeyCode::Char('M') => app.cycle_click_kind(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_min(INTERVAL_STEP),
        KeyCode::Char('-') | KeyCode::Char('_') => app.adjust_min(-INTERVAL_STEP),
        KeyCode::Char(']') => app.adjust_max(INTERVAL_STEP),
        KeyCode::Char('[') => app.adjust_max(-INTERVAL_STEP),
        KeyCode::Char('r') | KeyCode::Char('R') => app.toggle_random(),
        KeyCode::Char('g') | KeyCode::Char('G') => app.toggle_safety(),
        KeyCode::Char('>') | KeyCode::Char('.') => app.adjust_threshold(1.0),
        KeyCode::Char('<') | KeyCode::Char(',') => app.adjust_threshold(-1.0),
        KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_log(),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_log_up(1),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_log_down(1),
        _ => {}
    }
}

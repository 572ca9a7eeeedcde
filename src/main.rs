use std::io;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use pulse_core::logger;
use pulse_core::platform::create_platform;
use pulse_core::{ActionScheduler, ChannelReporter, ClickKind, IntervalConfig, Point, SafetyConfig};
use pulse_tui::{App, Draft};

/// Periodic clicker with an optional screen-region safety check
#[derive(Parser, Debug)]
#[command(name = "pulse", version)]
struct Cli {
    /// Use the in-memory platform instead of the real display
    #[arg(long)]
    stub: bool,

    /// Directory for app.log
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Time between clicks as M:SS or plain seconds (the lower bound when --max-interval is set)
    #[arg(long, short = 'i', default_value = "5:00", value_parser = parse_min_sec)]
    interval: (u64, u64),

    /// Randomize each delay between --interval and this, as M:SS or plain seconds
    #[arg(long, value_parser = parse_min_sec)]
    max_interval: Option<(u64, u64)>,

    /// left, right or double
    #[arg(long, short = 'c', default_value_t = ClickKind::Left)]
    click: ClickKind,

    /// Minimum similarity percent required to click when --safety is on
    #[arg(long, short = 't', default_value_t = 90.0)]
    threshold: f64,

    /// Skip clicks when the captured region no longer matches
    #[arg(long)]
    safety: bool,

    /// Initial click point; both --x and --y are needed
    #[arg(long, requires = "y")]
    x: Option<i32>,

    #[arg(long, requires = "x")]
    y: Option<i32>,
}

/// `"M:SS"` to `(minutes, seconds)`; a bare number is seconds.
fn parse_min_sec(s: &str) -> Result<(u64, u64), String> {
    let num = |part: &str| {
        part.trim()
            .parse::<u64>()
            .map_err(|_| format!("'{}' is not M:SS or a number of seconds", s))
    };
    match s.split_once(':') {
        Some((m, sec)) => Ok((num(m)?, num(sec)?)),
        None => Ok((0, num(s)?)),
    }
}

impl Cli {
    fn draft(&self) -> Draft {
        Draft {
            click_point: self.x.zip(self.y).map(|(x, y)| Point::new(x, y)),
            click_kind: self.click,
            interval: IntervalConfig::from_minutes_seconds(self.interval, self.max_interval),
            safety: SafetyConfig {
                enabled: self.safety,
                threshold_percent: self.threshold,
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init(&cli.log_dir)?;

    let platform = create_platform(cli.stub);
    let (reporter, status_rx) = ChannelReporter::channel();
    let scheduler = ActionScheduler::new(Arc::clone(&platform), Arc::new(reporter));

    let (log_tx, log_rx) = mpsc::channel();
    logger::set_tui_sender(log_tx);
    logger::info("pulse started");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(platform, scheduler, status_rx, log_rx, cli.draft());

    let result = pulse_tui::event::run(&mut terminal, &mut app);

    // Stop any run before the terminal is handed back
    app.quit();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_idle_draft() {
        let cli = Cli::parse_from(["pulse"]);
        let draft = cli.draft();
        assert_eq!(draft.interval, IntervalConfig::fixed(300));
        assert_eq!(draft.click_kind, ClickKind::Left);
        assert!(draft.click_point.is_none());
        assert!(!draft.safety.enabled);
    }

    #[test]
    fn max_interval_enables_random() {
        let cli = Cli::parse_from(["pulse", "-i", "60", "--max-interval", "120", "--click", "double", "--x", "5", "--y", "7"]);
        let draft = cli.draft();
        assert_eq!(draft.interval, IntervalConfig::random(60, 120));
        assert_eq!(draft.click_kind, ClickKind::Double);
        assert_eq!(draft.click_point, Some(Point::new(5, 7)));
    }

    #[test]
    fn intervals_accept_minutes_and_seconds() {
        let cli = Cli::parse_from(["pulse", "--interval", "1:30", "--max-interval", "2:05"]);
        assert_eq!(cli.draft().interval, IntervalConfig::random(90, 125));

        let cli = Cli::parse_from(["pulse", "-i", "0:45"]);
        assert_eq!(cli.draft().interval, IntervalConfig::fixed(45));

        assert_eq!(parse_min_sec("10"), Ok((0, 10)));
        assert!(parse_min_sec("1:xx").is_err());
        assert!(Cli::try_parse_from(["pulse", "-i", "soon"]).is_err());
    }

    #[test]
    fn lone_coordinate_is_rejected() {
        assert!(Cli::try_parse_from(["pulse", "--x", "5"]).is_err());
        assert!(Cli::try_parse_from(["pulse", "--click", "middle"]).is_err());
    }
}

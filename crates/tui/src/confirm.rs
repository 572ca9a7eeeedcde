use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Yes/No prompt drawn over the main view.
pub struct ConfirmDialog {
    pub message: String,
    pub selected: bool, // true = Yes, false = No
}

impl ConfirmDialog {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            selected: false,
        }
    }

    pub fn toggle(&mut self) {
        self.selected = !self.selected;
    }

    pub fn render(&self, f: &mut Frame) {
        let width = (self.message.chars().count() as u16 + 8).max(36);
        let area = centered_rect(width, 8, f.area());
        f.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Confirm ");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1), // message
                Constraint::Length(1),
                Constraint::Length(1), // buttons
                Constraint::Length(1), // key hint
            ])
            .split(inner);

        let msg = Paragraph::new(Line::from(Span::styled(&self.message, Style::default().fg(Color::White))))
            .alignment(Alignment::Center);
        f.render_widget(msg, rows[1]);

        let picked = |on: bool, bg: Color| {
            if on {
                Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        };
        let buttons = Line::from(vec![
            Span::styled("  [Yes]  ", picked(self.selected, Color::Green)),
            Span::raw("   "),
            Span::styled("  [No]  ", picked(!self.selected, Color::Red)),
        ]);
        f.render_widget(Paragraph::new(buttons).alignment(Alignment::Center), rows[3]);

        let hint = Line::from(Span::styled("left/right choose, enter confirm", Style::default().fg(Color::DarkGray)));
        f.render_widget(Paragraph::new(hint).alignment(Alignment::Center), rows[4]);
    }
}

/// Return a centered `Rect` of `width` columns and `height` rows inside `area`.
pub(crate) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

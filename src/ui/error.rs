//! Full-screen error display.
//!
//! A red screen with centered white text, dismissed by any key. Used for
//! failures that end a command, config problems and device errors mostly.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};

pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Creates the screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    /// - If raw mode cannot be enabled
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen { terminal })
    }

    /// Shows `message` until the user presses any key.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn show_error(&mut self, message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                let red = Style::default().bg(Color::Rgb(255, 0, 0));

                let fill = Paragraph::new("").style(red);
                frame.render_widget(fill, area);

                let padding_x = area.width / 10;
                let text_width = (area.width * 80) / 100;

                // Newlines in the message split into lines here.
                let body = Paragraph::new(message)
                    .style(red.fg(Color::Rgb(255, 255, 255)))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });

                let body_area = Rect {
                    x: area.x + padding_x,
                    y: area.y + area.height / 3,
                    width: text_width,
                    height: area.height.saturating_sub(area.height / 3),
                };
                frame.render_widget(body, body_area);

                if area.height > 2 {
                    let hint = Paragraph::new("press any key")
                        .style(red.fg(Color::Rgb(255, 180, 180)))
                        .alignment(Alignment::Center);
                    let hint_area = Rect {
                        x: area.x + padding_x,
                        y: area.y + area.height - 2,
                        width: text_width,
                        height: 1,
                    };
                    frame.render_widget(hint, hint_area);
                }
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Restores the terminal and leaves alternate screen mode.
    ///
    /// # Errors
    /// - If terminal modes cannot be restored
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

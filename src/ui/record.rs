//! Terminal user interface for a recording session.
//!
//! Draws a scrolling level waveform, the elapsed clock, per-channel meters and
//! the key help for the current session state. Input handling only reports
//! keys; session transitions live in the controller.

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    widgets::{Paragraph, Sparkline},
};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

use crate::monitor::ChannelLevels;
use crate::session::{ControlSurface, SessionState};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// User input command during recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCommand {
    /// Keep going (no key pressed)
    Continue,
    /// Stop and upload (Enter key)
    Finish,
    /// Exit without uploading (Escape or 'q')
    Cancel,
    /// Pause or resume (Space key)
    TogglePause,
}

/// One frame of session state for the screen to draw.
pub struct RecordView<'a> {
    pub state: SessionState,
    pub elapsed: Duration,
    pub levels: ChannelLevels,
    pub peaking: bool,
    pub controls: ControlSurface,
    pub status: Option<&'a str>,
}

/// Terminal UI for the recording session.
pub struct RecordScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    level_history: Vec<u64>,
    last_sample_time: Instant,
    sample_interval: Duration,
    terminal_width: usize,
}

impl RecordScreen {
    /// Creates a new screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    /// - If raw mode cannot be enabled
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let size = terminal.size()?;
        let terminal_width = size.width as usize;

        Ok(RecordScreen {
            terminal,
            level_history: vec![0u64; terminal_width],
            last_sample_time: Instant::now(),
            sample_interval: Duration::from_millis(50),
            terminal_width,
        })
    }

    /// Renders the waveform, meters and footer for the given view.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, view: &RecordView<'_>) -> anyhow::Result<()> {
        let paused = view.state == SessionState::Paused;

        // History scrolls only while audio is flowing.
        if !paused && self.last_sample_time.elapsed() >= self.sample_interval {
            let mean = (u64::from(view.levels.left) + u64::from(view.levels.right)) / 2;
            self.level_history.push(mean);

            if self.level_history.len() > self.terminal_width {
                self.level_history.remove(0);
            }

            self.last_sample_time = Instant::now();
        }

        let size = self.terminal.size()?;
        let current_width = size.width as usize;

        if current_width != self.terminal_width {
            self.terminal_width = current_width;
            while self.level_history.len() > self.terminal_width {
                self.level_history.remove(0);
            }
            while self.level_history.len() < self.terminal_width {
                self.level_history.insert(0, 0);
            }
        }

        // Copy values out before the draw closure to avoid borrow issues.
        let peaking = view.peaking && !paused;
        let (left, right) = if paused {
            (0u8, 0u8)
        } else {
            (view.levels.left, view.levels.right)
        };
        let elapsed = view.elapsed;
        let controls = view.controls;
        let status = view.status.map(str::to_owned);

        self.terminal.draw(|frame| {
            let area = frame.area();

            let footer_height = if status.is_some() { 2 } else { 1 };

            let content_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(footer_height),
            };

            let top_area_height = content_area.height / 3 * 2;

            let top_area = Rect {
                x: content_area.x,
                y: content_area.y,
                width: content_area.width,
                height: top_area_height,
            };

            let top_sparkline = Sparkline::default()
                .data(&self.level_history)
                .max(100)
                .style(
                    Style::default()
                        .bg(Color::Rgb(0, 0, 0))
                        .fg(Color::Rgb(206, 224, 220)),
                );

            frame.render_widget(top_sparkline, top_area);

            let bottom_area = Rect {
                x: content_area.x,
                y: content_area.y + top_area_height,
                width: content_area.width,
                height: content_area.height.saturating_sub(top_area_height),
            };

            let inverted_data: Vec<u64> = self
                .level_history
                .iter()
                .map(|&v| 100_u64.saturating_sub(v))
                .collect();

            let bottom_sparkline = Sparkline::default().data(&inverted_data).max(100).style(
                Style::default()
                    .bg(Color::Rgb(185, 207, 212))
                    .fg(Color::Rgb(0, 0, 0)),
            );

            frame.render_widget(bottom_sparkline, bottom_area);

            if let Some(ref text) = status {
                let status_area = Rect {
                    x: area.x,
                    y: area.y + area.height.saturating_sub(2),
                    width: area.width,
                    height: 1,
                };
                let line = Paragraph::new(Line::from(Span::raw(text.clone()))).style(
                    Style::default()
                        .fg(Color::Rgb(255, 220, 140))
                        .bg(Color::Rgb(0, 0, 0)),
                );
                frame.render_widget(line, status_area);
            }

            let footer_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };

            let indicator = if paused {
                Span::styled("⏸ ", Style::default().fg(Color::Yellow))
            } else {
                Span::styled("● ", Style::default().fg(Color::Red))
            };

            let duration_secs = elapsed.as_secs();
            let minutes = duration_secs / 60;
            let secs = duration_secs % 60;
            let duration_span = Span::raw(format!("{minutes}:{secs:02}"));

            let meter_style = if peaking {
                Style::default()
                    .bg(Color::Red)
                    .fg(Color::Rgb(255, 255, 255))
            } else {
                Style::default()
            };
            let meter_span = Span::styled(format!("L {left}% R {right}%"), meter_style);

            let pause_help = if controls.can_resume {
                "space resume"
            } else {
                "space pause"
            };
            let help_span = Span::raw(format!("  {pause_help} / enter finish / q cancel"));

            let footer_line = Line::from(vec![
                indicator,
                duration_span,
                Span::raw(" / "),
                meter_span,
                help_span,
            ]);

            let footer = Paragraph::new(footer_line).style(
                Style::default()
                    .fg(Color::Rgb(185, 207, 212))
                    .bg(Color::Rgb(0, 0, 0)),
            );

            frame.render_widget(footer, footer_area);
        })?;

        Ok(())
    }

    /// Renders a spinner frame while a background task runs.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render_busy(&mut self, message: &str, tick: usize) -> anyhow::Result<()> {
        let frame_glyph = SPINNER_FRAMES[tick % SPINNER_FRAMES.len()];
        let text = format!("{frame_glyph} {message}");

        self.terminal.draw(|frame| {
            let area = frame.area();

            let fill = Paragraph::new("").style(Style::default().bg(Color::Rgb(0, 0, 0)));
            frame.render_widget(fill, area);

            let body = Paragraph::new(Line::from(Span::styled(
                text.clone(),
                Style::default()
                    .fg(Color::Rgb(206, 224, 220))
                    .bg(Color::Rgb(0, 0, 0)),
            )))
            .alignment(Alignment::Center);

            let body_area = Rect {
                x: area.x,
                y: area.y + area.height / 2,
                width: area.width,
                height: 1,
            };
            frame.render_widget(body, body_area);
        })?;

        Ok(())
    }

    /// Processes user input and returns the matching command.
    ///
    /// # Returns
    /// - `Continue` if no key or an unrecognized key was pressed
    /// - `Finish` if Enter was pressed
    /// - `Cancel` if Escape, 'q' or Ctrl+C was pressed
    /// - `TogglePause` if Space was pressed
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> anyhow::Result<RecordCommand> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                return Ok(match key.code {
                    KeyCode::Enter => {
                        tracing::debug!("Enter pressed: finishing session");
                        RecordCommand::Finish
                    }
                    KeyCode::Char('q') | KeyCode::Esc => {
                        tracing::debug!("Escape or 'q' pressed: canceling session");
                        RecordCommand::Cancel
                    }
                    KeyCode::Char('c')
                        if key
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::CONTROL) =>
                    {
                        tracing::debug!("Ctrl+C pressed: canceling session");
                        RecordCommand::Cancel
                    }
                    KeyCode::Char(' ') => {
                        tracing::debug!("Space pressed: toggling pause");
                        RecordCommand::TogglePause
                    }
                    _ => RecordCommand::Continue,
                });
            }
        }
        Ok(RecordCommand::Continue)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal modes cannot be restored
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for RecordScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

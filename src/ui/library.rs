//! Interactive terminal UI for the recording library.
//!
//! Shows a scrollable list of recordings on the studio server with a playback
//! badge per row. Unlike a self-contained viewer this screen is driven from
//! the outside: the command loop pushes fresh rows each frame and receives
//! key commands back, since rows and badges change under async fetches.

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, HighlightSpacing, List, ListItem, ListState, Padding, Paragraph},
};
use std::io::{self, Stdout};
use std::time::Duration;

use crate::playback::UiState;

const BG: Color = Color::Rgb(0, 0, 0);
const FG: Color = Color::Rgb(255, 255, 255);
const DETAIL_FG: Color = Color::Rgb(100, 100, 100);
const HIGHLIGHT_BG: Color = Color::Rgb(20, 20, 20);
const HELP_FG: Color = Color::Rgb(100, 100, 100);
const STATUS_FG: Color = Color::Rgb(255, 220, 140);

/// One recording row as the screen draws it.
pub struct RowView {
    pub filename: String,
    pub detail: String,
    pub state: UiState,
}

/// Commands the library loop acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryCommand {
    Quit,
    Play,
    Stop,
    StopAll,
    Delete,
    Refresh,
}

/// Interactive library screen.
pub struct LibraryScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    list_state: ListState,
}

impl LibraryScreen {
    /// Creates the screen and enters alternate screen mode.
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            list_state: ListState::default(),
        })
    }

    /// Index of the currently highlighted row, if any.
    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    /// Renders the list with playback badges and an optional status line.
    pub fn draw(&mut self, rows: &[RowView], status: Option<&str>) -> Result<()> {
        // Rows shrink on delete and refresh; keep the selection in range.
        match self.list_state.selected() {
            Some(_) if rows.is_empty() => {
                self.list_state.select(None);
            }
            Some(idx) if idx >= rows.len() => {
                self.list_state.select(Some(rows.len() - 1));
            }
            None if !rows.is_empty() => {
                self.list_state.select(Some(0));
            }
            _ => {}
        }

        let name_width = rows.iter().map(|r| r.filename.len()).max().unwrap_or(0);
        let status_text = status.map(str::to_owned);

        self.terminal.draw(|frame| {
            let area = frame.area();

            let padding_block = Block::default()
                .padding(Padding::uniform(1))
                .style(Style::default().bg(BG));
            frame.render_widget(&padding_block, area);
            let padded_area = padding_block.inner(area);

            let main_block = Block::default().style(Style::default().fg(FG).bg(BG));
            frame.render_widget(&main_block, padded_area);
            let inner_area = main_block.inner(padded_area);

            let [header_area, list_area, status_area, footer_area] = Layout::vertical([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(inner_area);

            let header = Paragraph::new(" ┏┓┏┓┏┓ \n ┛ ┗┛┗┛ \n")
                .style(Style::default().fg(FG))
                .alignment(Alignment::Left);
            frame.render_widget(header, header_area);

            let items: Vec<ListItem> = rows
                .iter()
                .map(|row| {
                    let (badge, badge_style) = badge_for(row.state);
                    let line = Line::from(vec![
                        Span::styled(format!("{badge} "), badge_style),
                        Span::styled(
                            format!("{:<width$}", row.filename, width = name_width),
                            Style::default().fg(FG),
                        ),
                        Span::raw("  "),
                        Span::styled(row.detail.clone(), Style::default().fg(DETAIL_FG)),
                    ]);
                    ListItem::new(line)
                })
                .collect();

            let list = List::new(items)
                .block(
                    Block::default()
                        .title(" Recordings ")
                        .borders(Borders::ALL)
                        .padding(Padding::bottom(1)),
                )
                .highlight_style(Style::default().bg(HIGHLIGHT_BG))
                .highlight_symbol("> ")
                .highlight_spacing(HighlightSpacing::Always);

            frame.render_stateful_widget(list, list_area, &mut self.list_state);

            if let Some(ref text) = status_text {
                let status_line = Paragraph::new(text.clone())
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(STATUS_FG));
                frame.render_widget(status_line, status_area);
            }

            let help_text = "↑↓ select, ↵ play/pause, s stop, x stop all, d delete, r refresh, q quit";
            let help_paragraph = Paragraph::new(help_text)
                .alignment(Alignment::Center)
                .style(Style::default().fg(HELP_FG));
            frame.render_widget(help_paragraph, footer_area);
        })?;

        Ok(())
    }

    /// Polls for input. Navigation is handled internally; anything the loop
    /// must act on comes back as a command.
    pub fn poll_input(&mut self) -> Result<Option<LibraryCommand>> {
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => return Ok(self.handle_key(key)),
                Event::Mouse(mouse) => return Ok(self.handle_mouse(mouse)),
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> Option<LibraryCommand> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                tracing::debug!("Library exited via Escape/q");
                Some(LibraryCommand::Quit)
            }
            KeyCode::Char('c')
                if key
                    .modifiers
                    .contains(crossterm::event::KeyModifiers::CONTROL) =>
            {
                tracing::debug!("Library exited via Ctrl+C");
                Some(LibraryCommand::Quit)
            }
            KeyCode::Up => {
                self.list_state.select_previous();
                None
            }
            KeyCode::Down => {
                self.list_state.select_next();
                None
            }
            KeyCode::Enter => Some(LibraryCommand::Play),
            KeyCode::Char('s') => Some(LibraryCommand::Stop),
            KeyCode::Char('x') => Some(LibraryCommand::StopAll),
            KeyCode::Char('d') => Some(LibraryCommand::Delete),
            KeyCode::Char('r') => Some(LibraryCommand::Refresh),
            _ => None,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Option<LibraryCommand> {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.list_state.select_previous();
                None
            }
            MouseEventKind::ScrollDown => {
                self.list_state.select_next();
                None
            }
            MouseEventKind::Down(crossterm::event::MouseButton::Left) => {
                if self.list_state.selected().is_some() {
                    tracing::debug!("Row clicked, treating as play/pause");
                    Some(LibraryCommand::Play)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Cleans up terminal and restores normal mode.
    pub fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        tracing::debug!("Library terminal cleanup complete");
        Ok(())
    }
}

fn badge_for(state: UiState) -> (&'static str, Style) {
    match state {
        UiState::Playing => ("▶", Style::default().fg(Color::Green)),
        UiState::Paused => ("⏸", Style::default().fg(Color::Yellow)),
        UiState::Loading => ("◌", Style::default().fg(DETAIL_FG)),
        UiState::Error => ("✖", Style::default().fg(Color::Red)),
        UiState::Idle => (" ", Style::default()),
    }
}

impl Drop for LibraryScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

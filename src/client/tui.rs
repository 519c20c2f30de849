//! Full-screen chat UI.
//!
//! A scrolling transcript above a single-line message input. The whole
//! conversation is re-rendered from the first turn on every frame.

use crate::conversation::{ConversationStore, Role, Turn};
use crate::relay::{display_text, Generate, PromptRelay};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use tracing::debug;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use unicode_width::UnicodeWidthChar;

const PAGE: usize = 10;

/// Remove emphasis markers before display.
pub fn strip_emphasis(text: &str) -> String {
    text.replace('*', "")
}

/// State of one UI session. Dropped when the session ends.
#[derive(Default)]
pub struct ChatSession {
    store: ConversationStore,
    input: Input,
    working: bool,
    /// Lines scrolled back from the newest content.
    scroll_back: usize,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send the current input. Blank input is left alone and nothing is
    /// recorded. The frame is redrawn with a working indicator while the
    /// relay call is in flight.
    pub async fn submit<G, B>(
        &mut self,
        relay: &PromptRelay<G>,
        terminal: &mut Terminal<B>,
    ) -> Result<bool>
    where
        G: Generate,
        B: Backend,
    {
        let prompt = self.input.value().to_string();
        if prompt.trim().is_empty() {
            return Ok(false);
        }

        self.input.reset();
        self.store.push_user(prompt.as_str())?;
        self.working = true;
        self.scroll_back = 0;
        terminal.draw(|frame| draw_ui(frame, self))?;

        let result = relay.relay(&prompt).await;
        self.store.push_assistant(display_text(&result))?;
        self.working = false;
        debug!("Conversation has {} turns", self.store.len());
        Ok(true)
    }

    fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }
}

/// Run the chat UI until the user leaves with Esc or Ctrl+C.
pub async fn run_tui<G: Generate>(relay: &PromptRelay<G>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut session = ChatSession::new();
    let result = run_event_loop(&mut terminal, &mut session, relay).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// The main render/event loop.
async fn run_event_loop<B: Backend, G: Generate>(
    terminal: &mut Terminal<B>,
    session: &mut ChatSession,
    relay: &PromptRelay<G>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| draw_ui(frame, session))?;

        if let Event::Key(key) = event::read()? {
            // Only handle key press events (not release)
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Enter => {
                    session.submit(relay, terminal).await?;
                }
                KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(());
                }
                KeyCode::Up => session.scroll_up(1),
                KeyCode::Down => session.scroll_down(1),
                KeyCode::PageUp => session.scroll_up(PAGE),
                KeyCode::PageDown => session.scroll_down(PAGE),
                _ => {
                    session.input.handle_event(&Event::Key(key));
                }
            }
        }
    }
}

/// Draw the transcript and the input box.
fn draw_ui(frame: &mut Frame, session: &mut ChatSession) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(frame.area());

    draw_transcript(frame, session, chunks[0]);
    draw_input(frame, session, chunks[1]);
}

fn draw_transcript(frame: &mut Frame, session: &mut ChatSession, area: Rect) {
    let block = Block::default()
        .title(" Conversation ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = transcript_lines(session, inner.width as usize);
    let height = inner.height as usize;

    // Follow the newest line unless the user scrolled back.
    let max_top = lines.len().saturating_sub(height);
    session.scroll_back = session.scroll_back.min(max_top);
    let top = max_top - session.scroll_back;

    let paragraph = Paragraph::new(lines).scroll((top.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, inner);
}

fn transcript_lines(session: &ChatSession, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if session.store.is_empty() && !session.working {
        lines.push(Line::from(Span::styled(
            "Type a message and press Enter. Esc quits.",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    for turn in session.store.turns() {
        lines.push(speaker_line(turn.role()));
        for row in wrap_text(&turn_text(turn), width) {
            lines.push(Line::from(row));
        }
        lines.push(Line::default());
    }

    if session.working {
        lines.push(speaker_line(Role::Assistant));
        lines.push(Line::from(Span::styled(
            "Thinking...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn turn_text(turn: &Turn) -> String {
    match turn.role() {
        Role::User => turn.content().to_string(),
        Role::Assistant => strip_emphasis(turn.content()),
    }
}

fn speaker_line(role: Role) -> Line<'static> {
    let (label, color) = match role {
        Role::User => ("You", Color::Cyan),
        Role::Assistant => ("Gemini", Color::Green),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Hard-wrap text to `width` display columns, keeping explicit line breaks.
///
/// A character wider than the whole row still gets a row of its own.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for line in text.lines() {
        let mut row = String::new();
        let mut row_width = 0;
        for ch in line.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if row_width + ch_width > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push(ch);
            row_width += ch_width;
        }
        rows.push(row);
    }

    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

fn draw_input(frame: &mut Frame, session: &ChatSession, area: Rect) {
    let title = if session.working {
        " waiting for reply "
    } else {
        " message "
    };
    let block = Block::default()
        .title(title)
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    // Inner area for the input
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let input_width = inner_area.width as usize;
    if input_width == 0 || inner_area.height == 0 {
        return;
    }

    // Horizontal scroll in display columns, matching the visual cursor.
    let scroll = session.input.visual_scroll(input_width);
    let cursor_pos = session.input.visual_cursor();

    let input_paragraph = Paragraph::new(Line::from(vec![Span::styled(
        session.input.value(),
        Style::default().fg(Color::White),
    )]))
    .scroll((0, scroll.min(u16::MAX as usize) as u16));

    frame.render_widget(input_paragraph, inner_area);

    // Position the cursor
    let offset = cursor_pos.saturating_sub(scroll).min(input_width - 1);
    let cursor_x = inner_area.x + offset as u16;
    let cursor_y = inner_area.y;
    frame.set_cursor_position((cursor_x, cursor_y));
}

//! TUI module for polyvoice
//!
//! Draws the settings panel, the on-screen keyboard and a help bar.

pub mod keyboard;
mod panel;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use polyvoice::{synth::ActiveVoiceRegistry, Settings};

use keyboard::render_keyboard;
use panel::render_panel;

/// Everything a frame needs, borrowed from the app.
pub struct View<'a> {
    pub settings: &'a Settings,
    pub active: &'a ActiveVoiceRegistry,
    pub pointer_region: Option<usize>,
    pub connected: bool,
    pub status: &'a str,
    /// False when the terminal can't report key releases (tap fallback).
    pub release_events: bool,
}

/// Draw one frame. Returns the area the clickable keys occupy.
pub fn render(frame: &mut Frame, view: &View) -> Rect {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Settings panel
            Constraint::Min(8),    // Keyboard
            Constraint::Length(2), // Help bar
        ])
        .split(area);

    render_panel(frame, chunks[0], view);

    let keyboard_block = Block::default()
        .title(format!(" Octave {} ", view.settings.octave()))
        .borders(Borders::ALL);
    let keyboard_inner = keyboard_block.inner(chunks[1]);
    frame.render_widget(keyboard_block, chunks[1]);
    render_keyboard(frame, keyboard_inner, view);

    let mode = if view.release_events {
        ""
    } else {
        "  (tap mode: keys release after a short pause)"
    };
    let help = Paragraph::new(format!(
        " [a-k] Play  [z/x] Octave  [1-4] Wave  [[/]] Attack  [-/=] Release  [,/.] Volume\n [Tab] Reconnect audio  [Esc] Quit{mode}"
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);

    keyboard_inner
}

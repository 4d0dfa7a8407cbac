//! On-screen keyboard - one column per key region, lit while the note sounds

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use polyvoice::{input::KEY_MAP, synth::NotePhase};

use super::View;

/// Column for key region `index` inside `area`.
fn key_rect(area: Rect, index: usize) -> Rect {
    let count = KEY_MAP.len() as u32;
    let left = area.width as u32 * index as u32 / count;
    let right = area.width as u32 * (index as u32 + 1) / count;
    Rect {
        x: area.x + left as u16,
        y: area.y,
        width: (right - left) as u16,
        height: area.height,
    }
}

/// Key region under a terminal cell, if any.
pub fn hit_test(area: Rect, column: u16, row: u16) -> Option<usize> {
    if area.width == 0 || row < area.y || row >= area.bottom() {
        return None;
    }
    (0..KEY_MAP.len()).find(|&i| {
        let rect = key_rect(area, i);
        column >= rect.x && column < rect.right()
    })
}

pub fn render_keyboard(frame: &mut Frame, area: Rect, view: &View) {
    let octave = view.settings.octave();

    for (i, binding) in KEY_MAP.iter().enumerate() {
        let rect = key_rect(area, i);
        if rect.width == 0 {
            continue;
        }
        let note = binding.note(octave);
        let black = binding.pitch.is_black();

        let (fg, bg) = match view.active.get(note).map(|entry| entry.phase) {
            Some(NotePhase::Held) => (Color::Black, Color::Cyan),
            Some(NotePhase::Releasing) => (Color::White, Color::Blue),
            None if black => (Color::White, Color::DarkGray),
            None => (Color::Black, Color::White),
        };
        let mut style = Style::default().fg(fg).bg(bg);
        if view.pointer_region == Some(i) {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }

        // Black keys hang from the top like on a piano.
        let rect = if black {
            Rect {
                height: (rect.height * 2 / 3).max(3),
                ..rect
            }
            .intersection(area)
        } else {
            rect
        };

        let lines = vec![
            Line::from(note.to_string()),
            Line::from(""),
            Line::from(binding.key.to_ascii_uppercase().to_string()),
        ];
        let key = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .style(style)
            .block(Block::default().borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM));
        frame.render_widget(key, rect);
    }
}

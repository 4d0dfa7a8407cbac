//! Settings panel - waveform, volume, envelope times, octave and audio status

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use polyvoice::dsp::Waveform;

use super::View;

pub fn render_panel(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default().title(" polyvoice ").borders(Borders::ALL);
    let settings = view.settings;

    let mut waves = vec![Span::raw(" ")];
    for (i, waveform) in Waveform::ALL.iter().enumerate() {
        let style = if *waveform == settings.waveform() {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        waves.push(Span::styled(format!(" {} {} ", i + 1, waveform.label()), style));
        waves.push(Span::raw(" "));
    }

    let values = Line::from(vec![
        Span::styled(
            format!(" Volume: {:.0}%  ", settings.peak_level() * 100.0),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Attack: {:.2}s  ", settings.attack()),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            format!("Release: {:.2}s  ", settings.release()),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!("Voices: {}  ", view.active.len()),
            Style::default().fg(Color::Magenta),
        ),
        if view.connected {
            Span::styled(
                format!("● {}", view.status),
                Style::default().fg(Color::Green),
            )
        } else {
            Span::styled(
                format!("○ no audio: {}", view.status),
                Style::default().fg(Color::Red),
            )
        },
    ]);

    let paragraph = Paragraph::new(vec![Line::from(waves), values]).block(block);
    frame.render_widget(paragraph, area);
}

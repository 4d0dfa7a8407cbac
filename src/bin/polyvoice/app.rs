//! Application state and event loop: keyboard and mouse events in, note
//! triggers out.

use std::{
    collections::HashMap,
    io::stdout,
    time::{Duration, Instant},
};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyEventKind, KeyboardEnhancementFlags, MouseButton,
        MouseEvent, MouseEventKind, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use ratatui::{layout::Rect, DefaultTerminal};
use tracing::{info, warn};

use polyvoice::{
    dsp::Waveform, input::InputBinding, io::AudioSink, EngineConfig, PolySynth, Settings,
    VoiceManager,
};

use crate::ui;

/// Without key-release reporting, a key that stops auto-repeating for this
/// long counts as lifted.
pub const TAP_HOLD: Duration = Duration::from_millis(300);

/// How long a fresh press waits for its first auto-repeat. OS repeat delays
/// run 250-660 ms, well past [`TAP_HOLD`].
pub const FIRST_REPEAT_GRACE: Duration = Duration::from_millis(700);

const ATTACK_STEP: f32 = 0.01;
const RELEASE_STEP: f32 = 0.05;
const VOLUME_STEP: f32 = 0.05;

pub struct App {
    manager: VoiceManager,
    input: InputBinding,
    sink: Option<AudioSink>,
    device: Option<String>,
    taps: TapTracker,
    release_events: bool,
    /// Where the keyboard was drawn last frame, for mouse hit tests.
    keyboard_area: Rect,
    status: String,
    should_quit: bool,
}

impl App {
    pub fn new(settings: Settings, config: EngineConfig, device: Option<String>) -> Self {
        let (manager, synth) = VoiceManager::new(settings, config);
        let mut app = Self {
            manager,
            input: InputBinding::new(),
            sink: None,
            device,
            taps: TapTracker::default(),
            release_events: false,
            keyboard_area: Rect::default(),
            status: String::new(),
            should_quit: false,
        };
        app.attach(synth);
        app
    }

    /// Hand a renderer to a new output stream. Failure leaves the app running
    /// without sound; Tab retries.
    fn attach(&mut self, synth: PolySynth) {
        self.sink = None;
        match AudioSink::open(synth, self.device.as_deref()) {
            Ok(sink) => {
                self.status = format!("{} @ {} Hz", sink.device_name(), sink.sample_rate());
                self.sink = Some(sink);
            }
            Err(err) => {
                warn!(%err, "Audio output unavailable");
                self.status = err.to_string();
            }
        }
    }

    fn reconnect(&mut self) {
        self.input.release_all(&mut self.manager);
        // Close the old stream before opening the device again.
        self.sink = None;
        let synth = self.manager.reconnect();
        self.attach(synth);
        info!(connected = self.manager.is_connected(), "Audio reconnect");
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        self.release_events = supports_keyboard_enhancement().unwrap_or(false);
        if self.release_events {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .wrap_err("failed to enable key release events")?;
        }
        execute!(stdout(), EnableMouseCapture).wrap_err("failed to enable mouse capture")?;
        execute!(stdout(), EnableFocusChange).wrap_err("failed to enable focus reporting")?;

        let result = self.event_loop(terminal);

        self.input.release_all(&mut self.manager);
        self.manager.shutdown();
        let _ = execute!(stdout(), DisableFocusChange);
        let _ = execute!(stdout(), DisableMouseCapture);
        if self.release_events {
            let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
        }
        result
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.manager.poll();
            if !self.release_events {
                self.expire_taps(Instant::now());
            }

            terminal.draw(|frame| {
                let view = ui::View {
                    settings: self.manager.settings(),
                    active: self.manager.registry(),
                    pointer_region: self.input.pointer_region(),
                    connected: self.manager.is_connected(),
                    status: &self.status,
                    release_events: self.release_events,
                };
                self.keyboard_area = ui::render(frame, &view);
            })?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::FocusLost => {
                        self.input.release_all(&mut self.manager);
                        self.taps.clear();
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match (key.code, key.kind) {
            (KeyCode::Esc, KeyEventKind::Press) => self.should_quit = true,
            (KeyCode::Tab, KeyEventKind::Press) => self.reconnect(),
            (KeyCode::Char(c), kind) => {
                if self.handle_note_key(c, kind, Instant::now()) {
                    return;
                }
                if kind == KeyEventKind::Press {
                    self.handle_setting_key(c);
                }
            }
            _ => {}
        }
    }

    /// Returns true if `c` is a note key.
    fn handle_note_key(&mut self, c: char, kind: KeyEventKind, now: Instant) -> bool {
        if polyvoice::input::keymap::lookup(c).is_none() {
            return false;
        }
        match kind {
            // Without release reporting, auto-repeat arrives as more presses.
            KeyEventKind::Press if !self.release_events => {
                let repeat = !self.taps.press(c.to_ascii_lowercase(), now);
                self.input.key_down(&mut self.manager, c, repeat);
            }
            KeyEventKind::Press => {
                self.input.key_down(&mut self.manager, c, false);
            }
            KeyEventKind::Repeat => {
                self.input.key_down(&mut self.manager, c, true);
            }
            KeyEventKind::Release => {
                self.input.key_up(&mut self.manager, c);
            }
        }
        true
    }

    /// Release keys whose auto-repeat stopped arriving.
    fn expire_taps(&mut self, now: Instant) {
        for key in self.taps.expire(now) {
            self.input.key_up(&mut self.manager, key);
        }
    }

    fn handle_setting_key(&mut self, c: char) {
        let settings = self.manager.settings_mut();
        match c {
            'z' => settings.shift_octave(-1),
            'x' => settings.shift_octave(1),
            '1'..='4' => {
                let index = c as usize - '1' as usize;
                settings.set_waveform(Waveform::ALL[index]);
            }
            '[' => settings.set_attack(settings.attack() - ATTACK_STEP),
            ']' => settings.set_attack(settings.attack() + ATTACK_STEP),
            '-' => settings.set_release(settings.release() - RELEASE_STEP),
            '=' => settings.set_release(settings.release() + RELEASE_STEP),
            ',' => settings.set_peak_level(settings.peak_level() - VOLUME_STEP),
            '.' => settings.set_peak_level(settings.peak_level() + VOLUME_STEP),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let region = ui::keyboard::hit_test(self.keyboard_area, mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                match region {
                    Some(region) => {
                        self.input.pointer_down(&mut self.manager, region);
                    }
                    None => {
                        self.input.pointer_leave(&mut self.manager);
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.input.pointer_up(&mut self.manager);
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TapState {
    last: Instant,
    repeating: bool,
}

/// Tap fallback for terminals that never report key releases: a key counts
/// as held while presses keep arriving.
#[derive(Debug, Default)]
pub struct TapTracker {
    keys: HashMap<char, TapState>,
}

impl TapTracker {
    /// Record a press of `key` at `now`. Returns true for a fresh press,
    /// false for an auto-repeat of a key already held.
    pub fn press(&mut self, key: char, now: Instant) -> bool {
        match self.keys.get_mut(&key) {
            Some(state) => {
                state.last = now;
                state.repeating = true;
                false
            }
            None => {
                self.keys.insert(
                    key,
                    TapState {
                        last: now,
                        repeating: false,
                    },
                );
                true
            }
        }
    }

    /// Forget and return every key whose next press is overdue at `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<char> {
        let expired: Vec<char> = self
            .keys
            .iter()
            .filter(|(_, state)| {
                let wait = if state.repeating {
                    TAP_HOLD
                } else {
                    FIRST_REPEAT_GRACE
                };
                now.saturating_duration_since(state.last) >= wait
            })
            .map(|(&key, _)| key)
            .collect();
        for key in &expired {
            self.keys.remove(key);
        }
        expired
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.manager.shutdown();
    }
}

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

/// State shared between a [`VoiceManager`](super::VoiceManager) and the
/// [`PolySynth`](super::PolySynth) rendering for it.
///
/// Both fields are single-writer from the control side except `connected`,
/// which the audio side clears when the renderer goes away or its stream
/// fails.
#[derive(Debug)]
pub struct SinkLink {
    connected: AtomicBool,
    epoch: AtomicU64,
}

impl SinkLink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(true),
            epoch: AtomicU64::new(0),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Current shutdown epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Start a new epoch, invalidating every voice and queued message from
    /// the previous one. Returns the new epoch.
    pub fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }
}

// Purpose: Voice management and polyphony
// This layer sits above the DSP primitives and owns every voice's lifecycle.
//
// Control thread                         Audio thread
// --------------                         ------------
// VoiceManager ── SynthMessage (rtrb) ──→ PolySynth
//   registry   ←── VoiceEvent  (rtrb) ──   voice pool
//        └──────── SinkLink (atomics) ───────┘

pub mod link;
pub mod manager;
pub mod message;
pub mod poly;
pub mod registry;
pub mod voice;

pub use link::SinkLink;
pub use manager::{EngineConfig, VoiceManager, TEARDOWN_MARGIN};
pub use message::{SynthMessage, VoiceEvent};
pub use poly::PolySynth;
pub use registry::{ActiveVoiceRegistry, NotePhase, RegisteredVoice};
pub use voice::{Voice, VoiceId, VoiceState};

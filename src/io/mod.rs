// Purpose - external interfaces: the audio device the voices render into

pub mod sink;

pub use sink::{list_devices, AudioSink};

/// Failures the engine reports back to the input layer.
///
/// None of these are fatal: the caller logs them and the note simply does not
/// sound. The registry is never modified when an operation fails.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("audio sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("control queue is full")]
    QueueFull,

    #[error("all {max_voices} voices are in use")]
    PolyphonyExhausted { max_voices: usize },

    #[error("audio stream error: {0}")]
    Stream(String),
}

use std::sync::Arc;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, Sample, SampleFormat, SizedSample, StreamConfig,
};
use tracing::{error, info};

use crate::{error::EngineError, synth::poly::PolySynth, synth::SinkLink, MAX_BLOCK_SIZE};

/// The shared audio sink: a cpal output stream rendering one [`PolySynth`].
///
/// The synth moves into the audio callback. When the stream is dropped, or
/// fails, the synth's link reports disconnected and the manager stops
/// accepting notes until it is reconnected to a new sink.
pub struct AudioSink {
    _stream: cpal::Stream,
    link: Arc<SinkLink>,
    device_name: String,
    sample_rate: u32,
    channels: u16,
}

impl AudioSink {
    /// Open `device_name` (or the default output) and start rendering.
    pub fn open(mut synth: PolySynth, device_name: Option<&str>) -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()
                .map_err(|e| EngineError::SinkUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| n.trim() == name).unwrap_or(false))
                .ok_or_else(|| {
                    EngineError::SinkUnavailable(format!("no output device named {name}"))
                })?,
            None => host.default_output_device().ok_or_else(|| {
                EngineError::SinkUnavailable("no default output device available".to_string())
            })?,
        };
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_output_config()
            .map_err(|e| EngineError::SinkUnavailable(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        synth.set_sample_rate(sample_rate as f32);
        let link = synth.link();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, synth)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, synth)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, synth)?,
            other => {
                return Err(EngineError::SinkUnavailable(format!(
                    "unsupported sample format {other}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| EngineError::Stream(e.to_string()))?;

        info!(
            device = device_name.as_str(),
            sample_rate, channels, "Audio output started"
        );

        Ok(Self {
            _stream: stream,
            link,
            device_name,
            sample_rate,
            channels,
        })
    }

    /// False once the stream has reported an error.
    pub fn is_running(&self) -> bool {
        self.link.is_connected()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut synth: PolySynth,
) -> Result<cpal::Stream, EngineError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let err_link = synth.link();
    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames_to_render];
                    synth.render_block(block);

                    // Copy to output (mono to all channels)
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        let value = <T as Sample>::from_sample(s.clamp(-1.0, 1.0));
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = value;
                        }
                    }

                    frames_written += frames_to_render;
                }
            },
            move |err| {
                error!(err = err.to_string(), "Audio stream error");
                err_link.set_connected(false);
            },
            None,
        )
        .map_err(|e| EngineError::SinkUnavailable(e.to_string()))
}

/// Names of the output devices on the default host.
pub fn list_devices() -> Result<Vec<String>, EngineError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| EngineError::SinkUnavailable(e.to_string()))?;

    let mut names: Vec<String> = devices.filter_map(|d| d.name().ok()).collect();
    names.sort();
    Ok(names)
}

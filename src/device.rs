//! CPAL device discovery and output streams

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, SupportedStreamConfig};
use rtrb::Consumer;
use tracing::{debug, error};

use crate::error::{Error, Result};

/// A discovered audio output device
pub struct CpalDevice {
    device: cpal::Device,
    config: SupportedStreamConfig,
    name: String,
    sample_rate: u32,
    channels: u16,
}

impl CpalDevice {
    fn from_device(device: cpal::Device) -> Result<Self> {
        let config = device.default_output_config()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Ok(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
        })
    }

    /// Get the default output device
    pub fn default_output() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoDevice)?;
        Self::from_device(device)
    }

    /// List all available output devices
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(|device| Self::from_device(device).ok()).collect())
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Ring buffer size, in samples, for ~100ms of audio to handle scheduling jitter
    pub fn ring_capacity(&self) -> usize {
        let buffer_samples = ((self.sample_rate as f32 * 0.1) as usize) * self.channels as usize;
        buffer_samples.next_power_of_two().max(8192)
    }

    /// Start a stream that plays interleaved samples popped from `consumer`.
    ///
    /// The ring must carry [`channels`](Self::channels) interleaved channels.
    /// An empty ring plays silence and raises the underrun flag.
    pub fn open(&self, consumer: Consumer<f32>) -> Result<CpalStream> {
        let samples_consumed = Arc::new(AtomicUsize::new(0));
        let had_underrun = Arc::new(AtomicBool::new(false));
        let stream_config = self.config.config();
        let counters = (Arc::clone(&samples_consumed), Arc::clone(&had_underrun));

        let stream = match self.config.sample_format() {
            SampleFormat::F32 => build_stream(&self.device, &stream_config, consumer, counters, |s| s),
            SampleFormat::I16 => build_stream(&self.device, &stream_config, consumer, counters, |s| {
                (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
            }),
            SampleFormat::U16 => build_stream(&self.device, &stream_config, consumer, counters, |s| {
                ((s.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16
            }),
            other => return Err(Error::UnsupportedSampleFormat(format!("{:?}", other))),
        }?;
        stream.play()?;

        debug!(device = %self.name, sample_rate = self.sample_rate, channels = self.channels, "output stream started");

        Ok(CpalStream {
            stream,
            samples_consumed,
            had_underrun,
        })
    }
}

/// A running output stream. Playback stops when this is dropped.
pub struct CpalStream {
    stream: cpal::Stream,
    samples_consumed: Arc<AtomicUsize>,
    had_underrun: Arc<AtomicBool>,
}

impl CpalStream {
    /// Returns how many samples have been played
    #[inline]
    pub fn samples_consumed(&self) -> usize {
        self.samples_consumed.load(Ordering::Relaxed)
    }

    /// Check and clear the underrun flag
    pub fn check_underrun(&self) -> bool {
        self.had_underrun.swap(false, Ordering::Relaxed)
    }

    pub fn pause(&self) -> Result<()> {
        self.stream.pause()?;
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        self.stream.play()?;
        Ok(())
    }
}

fn build_stream<T: SizedSample>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut consumer: Consumer<f32>,
    (samples_consumed, had_underrun): (Arc<AtomicUsize>, Arc<AtomicBool>),
    convert: fn(f32) -> T,
) -> core::result::Result<cpal::Stream, cpal::BuildStreamError> {
    device.build_output_stream(
        stream_config,
        move |data: &mut [T], _| {
            let mut underrun = false;
            for sample in data.iter_mut() {
                let s = consumer.pop().unwrap_or_else(|_| {
                    underrun = true;
                    0.0
                });
                *sample = convert(s);
            }
            if underrun {
                had_underrun.store(true, Ordering::Relaxed);
            }
            samples_consumed.fetch_add(data.len(), Ordering::Relaxed);
        },
        |err| error!("CPAL stream error: {:?}", err),
        None,
    )
}

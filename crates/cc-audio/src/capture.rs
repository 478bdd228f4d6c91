use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::AudioError;

/// Microphone capture via cpal.
///
/// Writes mono f32 samples into a lock-free ring buffer.
///
/// # Example
/// ```no_run
/// use cc_audio::capture::AudioCapture;
/// let capture = AudioCapture::start_default().unwrap();
/// ```
pub struct AudioCapture {
    /// Garde le stream vivant : la capture s'arrête quand il est droppé.
    _stream: cpal::Stream,
    consumer: Consumer<f32>,
    sample_rate: u32,
}

impl AudioCapture {
    /// Start capturing from the default input device.
    ///
    /// # Errors
    /// Returns an error if there is no input device, the device refuses the
    /// stream (e.g. permission denied), or its sample format is unsupported.
    pub fn start_default() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;

        let config = device
            .default_input_config()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels()).max(1);
        let format = config.sample_format();

        // Ring buffer: 2 seconds of audio @ sample_rate
        let (producer, consumer) = RingBuffer::new(sample_rate as usize * 2);

        let stream_config: cpal::StreamConfig = config.into();
        let stream = match format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, channels, producer)
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, channels, producer)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, channels, producer)
            }
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        }?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        log::info!("Capture micro démarrée @ {sample_rate}Hz, {channels} canaux");

        Ok(Self {
            _stream: stream,
            consumer,
            sample_rate,
        })
    }

    /// Move every available sample from the ring buffer to the end of `out`.
    ///
    /// Returns how many samples were read.
    pub fn read_samples(&mut self, out: &mut Vec<f32>) -> usize {
        let available = self.consumer.slots();
        out.reserve(available);
        let mut count = 0;
        while let Ok(sample) = self.consumer.pop() {
            out.push(sample);
            count += 1;
        }
        count
    }

    /// The sample rate of the capture stream.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut producer: Producer<f32>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Downmix to mono; drop samples when the reader falls behind
                for chunk in data.chunks(channels) {
                    let sum: f32 = chunk.iter().map(|&s| f32::from_sample(s)).sum();
                    let _ = producer.push(sum / chunk.len() as f32);
                }
            },
            |err| {
                log::error!("Audio stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))
}

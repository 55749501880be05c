//! Conversion of captured glasses audio into the transport's input format.

use super::backend::AudioFrame;

/// Process audio frame: downsample and convert to target format
pub fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    // Downsample if needed
    if processed.sample_rate != target_sample_rate {
        processed = downsample_frame(processed, target_sample_rate);
    }

    // Convert to mono if needed
    if processed.channels != target_channels && target_channels == 1 {
        processed = stereo_to_mono(processed);
    }

    processed
}

/// Downsample audio frame by decimation
pub fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if frame.sample_rate == target_rate || target_rate == 0 {
        return frame;
    }

    let ratio = frame.sample_rate / target_rate;
    if ratio <= 1 {
        return frame; // Can't upsample
    }

    // Decimate whole interleaved frames so channels stay aligned
    let channels = frame.channels.max(1) as usize;
    let downsampled: Vec<i16> = frame
        .samples
        .chunks_exact(channels)
        .step_by(ratio as usize)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples: downsampled,
        sample_rate: target_rate,
        channels: frame.channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Convert stereo to mono by averaging channels
pub fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels != 2 {
        return frame; // Only support stereo -> mono
    }

    let mono_samples = frame
        .samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect();

    AudioFrame {
        samples: mono_samples,
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Little-endian PCM bytes, the layout the transport expects
pub fn to_pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// RMS level normalized to 0.0..=1.0
pub fn rms_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
    let rms = (sum / samples.len() as f64).sqrt();
    (rms / i16::MAX as f64).min(1.0) as f32
}

//! Sample conversions between cpal stream formats and 16-bit PCM.

/// Conversion of a device input sample to 16-bit PCM.
pub trait ToPcm16: Copy {
    fn to_pcm16(self) -> i16;
}

impl ToPcm16 for i16 {
    fn to_pcm16(self) -> i16 {
        self
    }
}

impl ToPcm16 for f32 {
    fn to_pcm16(self) -> i16 {
        (self.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
    }
}

/// Conversion of a normalized output value to a device output sample.
pub trait FromNormalized: Copy {
    fn from_normalized(value: f32) -> Self;
}

impl FromNormalized for f32 {
    fn from_normalized(value: f32) -> Self {
        value
    }
}

impl FromNormalized for i16 {
    fn from_normalized(value: f32) -> Self {
        (value.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
    }
}

impl FromNormalized for u16 {
    fn from_normalized(value: f32) -> Self {
        ((value.clamp(-1.0, 1.0) + 1.0) * 32767.5) as u16
    }
}

/// 16-bit PCM to `[-1.0, 1.0)`.
pub fn pcm16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Average interleaved frames down to one channel, replacing `out`'s contents.
pub fn downmix_to_mono<T: ToPcm16>(data: &[T], channels: usize, out: &mut Vec<i16>) {
    out.clear();
    if channels <= 1 {
        out.extend(data.iter().map(|s| s.to_pcm16()));
        return;
    }
    out.extend(data.chunks_exact(channels).map(|frame| {
        let sum: i32 = frame.iter().map(|s| i32::from(s.to_pcm16())).sum();
        (sum / channels as i32) as i16
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_to_pcm16_clamps() {
        assert_eq!(1.0f32.to_pcm16(), i16::MAX);
        assert_eq!(2.5f32.to_pcm16(), i16::MAX);
        assert_eq!((-1.0f32).to_pcm16(), -i16::MAX);
        assert_eq!(0.0f32.to_pcm16(), 0);
    }

    #[test]
    fn mono_passthrough() {
        let mut out = Vec::new();
        downmix_to_mono(&[1i16, -2, 3], 1, &mut out);
        assert_eq!(out, vec![1, -2, 3]);
    }

    #[test]
    fn stereo_frames_are_averaged() {
        let mut out = vec![99];
        downmix_to_mono(&[100i16, 200, -50, 50, 7, 8], 2, &mut out);
        assert_eq!(out, vec![150, 0, 7]);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let mut out = Vec::new();
        downmix_to_mono(&[0.5f32, 0.5, 0.5], 2, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn output_conversions_cover_range() {
        assert_eq!(u16::from_normalized(-1.0), 0);
        assert_eq!(u16::from_normalized(1.0), u16::MAX);
        assert_eq!(i16::from_normalized(0.0), 0);
        assert!((pcm16_to_f32(i16::MIN) + 1.0).abs() < f32::EPSILON);
    }
}

//! Per-bit-depth sample codecs.
//!
//! Samples are held as normalized `f64` in `[-1.0, 1.0]`. Positive integer
//! codes are scaled by `2^(W-1) - 1` and negative ones by `2^(W-1)`, so the
//! most negative code maps to exactly `-1.0` and every code survives a
//! decode/encode round trip unchanged.
//!
//! Negative values therefore land one code further out than a symmetric
//! `2^(W-1) - 1` scale would put them: at 8 bits `-0.5` meters as `-64`, not
//! `-63`, and `-1.0` encodes as `0x80` rather than `0x81`.

use alloc::vec::Vec;

use crate::error::Error;
use crate::header::AudioFormat;

// Products closer than this to an integer snap to it before truncation, so
// `code / scale * scale` lands back on `code` despite float rounding.
const SNAP: f64 = 1e-6;

/// Conversions between raw little-endian bytes, normalized floats and
/// integer PCM values for one sample width.
pub trait Converter {
    /// Width of a single sample in bytes
    fn sample_size(&self) -> usize;

    /// Decode `bytes` and append the normalized samples to `out`.
    ///
    /// Trailing bytes that do not form a whole sample are dropped.
    fn decode_into(&self, bytes: &[u8], out: &mut Vec<f64>);

    /// Encode normalized samples as little-endian bytes
    fn encode(&self, samples: &[f64]) -> Vec<u8>;

    /// Integer PCM values of normalized samples, for metering
    fn values(&self, samples: &[f64]) -> Vec<i32>;

    /// Decode `bytes` into a fresh buffer of normalized samples
    fn decode(&self, bytes: &[u8]) -> Vec<f64> {
        let mut out = Vec::with_capacity(bytes.len() / self.sample_size());
        self.decode_into(bytes, &mut out);
        out
    }
}

fn positive_scale(bits: u32) -> f64 {
    ((1_i64 << (bits - 1)) - 1) as f64
}

fn negative_scale(bits: u32) -> f64 {
    (1_i64 << (bits - 1)) as f64
}

fn normalize(code: i32, bits: u32) -> f64 {
    if code < 0 {
        code as f64 / negative_scale(bits)
    } else {
        code as f64 / positive_scale(bits)
    }
}

fn truncate(value: f64) -> i64 {
    let nearest = libm::round(value);
    if libm::fabs(value - nearest) < SNAP {
        nearest as i64
    } else {
        libm::trunc(value) as i64
    }
}

fn quantize(sample: f64, bits: u32) -> i32 {
    let scaled = if sample < 0.0 {
        sample * negative_scale(bits)
    } else {
        sample * positive_scale(bits)
    };
    let min = -(1_i64 << (bits - 1));
    let max = (1_i64 << (bits - 1)) - 1;
    truncate(scaled).clamp(min, max) as i32
}

/// 8-bit signed PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pcm8;

impl Converter for Pcm8 {
    fn sample_size(&self) -> usize {
        1
    }

    fn decode_into(&self, bytes: &[u8], out: &mut Vec<f64>) {
        out.extend(bytes.iter().map(|&b| normalize(b as i8 as i32, 8)));
    }

    fn encode(&self, samples: &[f64]) -> Vec<u8> {
        samples.iter().map(|&s| quantize(s, 8) as i8 as u8).collect()
    }

    fn values(&self, samples: &[f64]) -> Vec<i32> {
        samples.iter().map(|&s| quantize(s, 8)).collect()
    }
}

/// 16-bit signed little-endian PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pcm16;

impl Converter for Pcm16 {
    fn sample_size(&self) -> usize {
        2
    }

    fn decode_into(&self, bytes: &[u8], out: &mut Vec<f64>) {
        out.extend(
            bytes
                .chunks_exact(2)
                .map(|c| normalize(i16::from_le_bytes([c[0], c[1]]) as i32, 16)),
        );
    }

    fn encode(&self, samples: &[f64]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            bytes.extend_from_slice(&(quantize(sample, 16) as i16).to_le_bytes());
        }
        bytes
    }

    fn values(&self, samples: &[f64]) -> Vec<i32> {
        samples.iter().map(|&s| quantize(s, 16)).collect()
    }
}

/// 24-bit signed little-endian PCM, packed in 3-byte groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pcm24;

impl Pcm24 {
    fn widen(group: &[u8]) -> i32 {
        let mut word = u32::from_le_bytes([group[0], group[1], group[2], 0]);
        if word & 0x0080_0000 != 0 {
            word |= 0xFF00_0000;
        }
        word as i32
    }
}

impl Converter for Pcm24 {
    fn sample_size(&self) -> usize {
        3
    }

    fn decode_into(&self, bytes: &[u8], out: &mut Vec<f64>) {
        out.extend(
            bytes
                .chunks_exact(3)
                .map(|c| normalize(Self::widen(c), 24)),
        );
    }

    fn encode(&self, samples: &[f64]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(samples.len() * 3);
        for &sample in samples {
            let word = quantize(sample, 24).to_le_bytes();
            bytes.extend_from_slice(&word[..3]);
        }
        bytes
    }

    fn values(&self, samples: &[f64]) -> Vec<i32> {
        samples.iter().map(|&s| quantize(s, 24)).collect()
    }
}

/// 32-bit signed little-endian PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pcm32;

impl Converter for Pcm32 {
    fn sample_size(&self) -> usize {
        4
    }

    fn decode_into(&self, bytes: &[u8], out: &mut Vec<f64>) {
        out.extend(
            bytes
                .chunks_exact(4)
                .map(|c| normalize(i32::from_le_bytes([c[0], c[1], c[2], c[3]]), 32)),
        );
    }

    fn encode(&self, samples: &[f64]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(samples.len() * 4);
        for &sample in samples {
            bytes.extend_from_slice(&quantize(sample, 32).to_le_bytes());
        }
        bytes
    }

    fn values(&self, samples: &[f64]) -> Vec<i32> {
        samples.iter().map(|&s| quantize(s, 32)).collect()
    }
}

/// 32-bit IEEE float
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Float32;

impl Converter for Float32 {
    fn sample_size(&self) -> usize {
        4
    }

    fn decode_into(&self, bytes: &[u8], out: &mut Vec<f64>) {
        out.extend(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64),
        );
    }

    fn encode(&self, samples: &[f64]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(samples.len() * 4);
        for &sample in samples {
            bytes.extend_from_slice(&(sample as f32).to_le_bytes());
        }
        bytes
    }

    fn values(&self, samples: &[f64]) -> Vec<i32> {
        samples.iter().map(|&s| quantize(s, 32)).collect()
    }
}

/// Supported sample widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// 8 bits per sample
    Eight = 8,
    /// 16 bits per sample
    Sixteen = 16,
    /// 24 bits per sample
    TwentyFour = 24,
    /// 32 bits per sample
    ThirtyTwo = 32,
}

impl BitDepth {
    /// Check `bits` against the supported widths
    pub fn from_bits(bits: u16) -> Result<Self, Error> {
        match bits {
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            24 => Ok(BitDepth::TwentyFour),
            32 => Ok(BitDepth::ThirtyTwo),
            _ => Err(Error::UnsupportedBitDepth(bits)),
        }
    }

    /// Bits per sample
    pub fn bits(self) -> u16 {
        self as u16
    }

    /// Bytes per sample
    pub fn bytes(self) -> usize {
        self as usize / 8
    }
}

/// The codec for one data chunk, picked once from its bit depth and audio format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// 8-bit PCM
    Pcm8(Pcm8),
    /// 16-bit PCM
    Pcm16(Pcm16),
    /// 24-bit PCM
    Pcm24(Pcm24),
    /// 32-bit PCM
    Pcm32(Pcm32),
    /// 32-bit IEEE float
    Float32(Float32),
}

impl Codec {
    /// Select the codec for `depth`; 32-bit IEEE float data gets [`Float32`].
    pub fn new(depth: BitDepth, format: AudioFormat) -> Self {
        match (depth, format) {
            (BitDepth::Eight, _) => Codec::Pcm8(Pcm8),
            (BitDepth::Sixteen, _) => Codec::Pcm16(Pcm16),
            (BitDepth::TwentyFour, _) => Codec::Pcm24(Pcm24),
            (BitDepth::ThirtyTwo, AudioFormat::IeeeFloat) => Codec::Float32(Float32),
            (BitDepth::ThirtyTwo, AudioFormat::Pcm) => Codec::Pcm32(Pcm32),
        }
    }

    fn inner(&self) -> &dyn Converter {
        match self {
            Codec::Pcm8(c) => c,
            Codec::Pcm16(c) => c,
            Codec::Pcm24(c) => c,
            Codec::Pcm32(c) => c,
            Codec::Float32(c) => c,
        }
    }
}

impl Converter for Codec {
    fn sample_size(&self) -> usize {
        self.inner().sample_size()
    }

    fn decode_into(&self, bytes: &[u8], out: &mut Vec<f64>) {
        self.inner().decode_into(bytes, out)
    }

    fn encode(&self, samples: &[f64]) -> Vec<u8> {
        self.inner().encode(samples)
    }

    fn values(&self, samples: &[f64]) -> Vec<i32> {
        self.inner().values(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_empty_input() {
        let codecs: [&dyn Converter; 5] = [&Pcm8, &Pcm16, &Pcm24, &Pcm32, &Float32];
        for codec in codecs {
            assert!(codec.decode(&[]).is_empty());
            assert!(codec.encode(&[]).is_empty());
            assert!(codec.values(&[]).is_empty());
        }
    }

    #[test]
    fn test_8bit_conversions() {
        assert_eq!(Pcm8.decode(&[0x00, 0x7f, 0x80]), vec![0.0, 1.0, -1.0]);
        assert_eq!(Pcm8.encode(&[0.0, 1.0, -1.0]), vec![0x00, 0x7f, 0x80]);
        assert_eq!(Pcm8.values(&[0.5, -0.5]), vec![63, -64]);
    }

    #[test]
    fn test_16bit_conversions() {
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x01, 0x00];
        let samples = Pcm16.decode(&bytes);

        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 1.0);
        assert_eq!(samples[2], -1.0);
        assert_eq!(samples[3], 1.0 / 32767.0);
        assert_eq!(Pcm16.encode(&samples), bytes);
        assert_eq!(Pcm16.values(&samples), vec![0, 32767, -32768, 1]);
    }

    #[test]
    fn test_24bit_sign_extension() {
        assert_eq!(Pcm24.decode(&[0x00, 0x00, 0x80]), vec![-1.0]);
        assert_eq!(Pcm24.decode(&[0xff, 0xff, 0x7f]), vec![1.0]);
        assert_eq!(Pcm24.values(&Pcm24.decode(&[0xff, 0xff, 0xff])), vec![-1]);
        assert_eq!(Pcm24.values(&Pcm24.decode(&[0x13, 0x3c, 0x14])), vec![0x143c13]);
    }

    #[test]
    fn test_24bit_encode_keeps_low_three_bytes() {
        let bytes = [0x1e, 0xf3, 0x3c, 0x16, 0xf9, 0xf8, 0x00, 0x00, 0x80];
        assert_eq!(Pcm24.encode(&Pcm24.decode(&bytes)), bytes);
    }

    #[test]
    fn test_32bit_conversions() {
        let bytes = [0xff, 0xff, 0xff, 0x7f, 0x00, 0x00, 0x00, 0x80];
        assert_eq!(Pcm32.decode(&bytes), vec![1.0, -1.0]);
        assert_eq!(Pcm32.values(&[1.0, -1.0]), vec![i32::MAX, i32::MIN]);
        assert_eq!(Pcm32.encode(&Pcm32.decode(&bytes)), bytes);
    }

    #[test]
    fn test_float32_passthrough() {
        let samples = [0.5_f32, -0.25, 1.0];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        assert_eq!(Float32.decode(&bytes), vec![0.5, -0.25, 1.0]);
        assert_eq!(Float32.encode(&Float32.decode(&bytes)), bytes);
    }

    #[test]
    fn test_remainder_bytes_are_dropped() {
        assert_eq!(Pcm16.decode(&[0xff, 0x7f, 0x01]).len(), 1);
        assert_eq!(Pcm24.decode(&[0, 0, 0, 1, 2]).len(), 1);
        assert_eq!(Pcm32.decode(&[0, 0, 0]).len(), 0);
    }

    #[test]
    fn test_every_16bit_code_round_trips() {
        let bytes: Vec<u8> = (i16::MIN..=i16::MAX).flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(Pcm16.encode(&Pcm16.decode(&bytes)), bytes);
    }

    #[test]
    fn test_values_within_one_step() {
        let input = [0.3, -0.7, 0.999, -0.001, 0.123456];
        for (codec, bits) in [
            (Codec::Pcm8(Pcm8), 8),
            (Codec::Pcm16(Pcm16), 16),
            (Codec::Pcm24(Pcm24), 24),
            (Codec::Pcm32(Pcm32), 32),
        ] {
            let values = codec.values(&codec.decode(&codec.encode(&input)));
            let step = 1.0 / positive_scale(bits);
            for (value, expected) in values.iter().zip(input) {
                let restored = normalize(*value, bits);
                assert!(
                    libm::fabs(restored - expected) <= 2.0 * step,
                    "{bits}-bit: {restored} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn test_decode_encode_is_idempotent() {
        let input = [0.3, -0.7, 0.999, -0.001, 0.123456, 1.0, -1.0];
        for codec in [
            Codec::Pcm8(Pcm8),
            Codec::Pcm16(Pcm16),
            Codec::Pcm24(Pcm24),
            Codec::Pcm32(Pcm32),
            Codec::Float32(Float32),
        ] {
            let once = codec.decode(&codec.encode(&input));
            let twice = codec.decode(&codec.encode(&once));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_codec_selection() {
        assert_eq!(
            Codec::new(BitDepth::ThirtyTwo, AudioFormat::IeeeFloat),
            Codec::Float32(Float32)
        );
        assert_eq!(
            Codec::new(BitDepth::ThirtyTwo, AudioFormat::Pcm),
            Codec::Pcm32(Pcm32)
        );
        assert_eq!(BitDepth::from_bits(12), Err(Error::UnsupportedBitDepth(12)));
        assert_eq!(BitDepth::from_bits(24).map(BitDepth::bytes), Ok(3));
    }

    #[test]
    fn test_negative_scale_is_one_code_wider() {
        assert_eq!(Pcm8.values(&[-0.5, 0.5]), vec![-64, 63]);
        assert_eq!(Pcm8.encode(&[-1.0, 1.0]), vec![0x80, 0x7f]);
        assert_eq!(Pcm16.encode(&[-1.0]), vec![0x00, 0x80]);
    }
}

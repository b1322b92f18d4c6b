use alloc::vec::Vec;

use crate::error::{Error, HeaderViolation, Violations};

const RIFF: [u8; 4] = *b"RIFF";
const WAVE: [u8; 4] = *b"WAVE";
const FMT: [u8; 4] = *b"fmt ";
const FMT_SIZE: u32 = 16;

/// Sample rates a [`FileHeader`] may declare
pub const SAMPLE_RATES: [u32; 6] = [44_100, 48_000, 88_200, 96_000, 176_400, 192_000];

/// Audio format types supported by the WAV format
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum AudioFormat {
    /// PCM (Pulse Code Modulation) - integer samples
    #[default]
    Pcm = 1,
    /// IEEE float - floating point samples
    IeeeFloat = 3,
}

impl AudioFormat {
    fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(AudioFormat::Pcm),
            3 => Some(AudioFormat::IeeeFloat),
            _ => None,
        }
    }

    pub(crate) fn to_u16(self) -> u16 {
        self as u16
    }
}

/// The 36 bytes at the start of a WAV file: the RIFF descriptor followed by
/// the `fmt ` sub-chunk
///
/// for more information see [`here`]
///
/// [`here`]: http://soundfile.sapp.org/doc/WaveFormat/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// size of everything after the first 8 bytes; grown on encode, never shrunk
    pub chunk_size: u32,
    /// audio format, PCM or IEEE float
    pub audio_format: AudioFormat,
    /// number of audio channels in the sample data, channels are interleaved
    pub num_channels: u16,
    /// sample rate, one of [`SAMPLE_RATES`]
    pub sample_rate: u32,
    /// bytes of audio per second
    pub byte_rate: u32,
    /// bytes per frame across all channels
    pub block_align: u16,
    /// bit depth for each sample, one of `8`, `16`, `24` or `32`
    pub bits_per_sample: u16,
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn tag_at(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

fn check_format(
    sample_rate: u32,
    bits_per_sample: u16,
    num_channels: u16,
    audio_format: u16,
    violations: &mut Vec<HeaderViolation>,
) {
    if !SAMPLE_RATES.contains(&sample_rate) {
        violations.push(HeaderViolation::SampleRate(sample_rate));
    }
    if !matches!(bits_per_sample, 8 | 16 | 24 | 32) {
        violations.push(HeaderViolation::BitDepth(bits_per_sample));
    }
    if !matches!(num_channels, 1 | 2) {
        violations.push(HeaderViolation::NumChannels(num_channels));
    }
    // IEEE float data is only read as 32-bit
    match AudioFormat::from_u16(audio_format) {
        Some(AudioFormat::Pcm) => {}
        Some(AudioFormat::IeeeFloat) if bits_per_sample == 32 => {}
        _ => violations.push(HeaderViolation::AudioFormat(audio_format)),
    }
}

fn into_result(violations: Vec<HeaderViolation>) -> Result<(), Error> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::MalformedHeader(Violations(violations)))
    }
}

impl FileHeader {
    /// Encoded length in bytes
    pub const SIZE: usize = 36;

    /// Build a header for a new file, deriving the byte rate and block align.
    ///
    /// Every invalid field is reported in the returned error, not just the first.
    pub fn new(
        sample_rate: u32,
        bits_per_sample: u16,
        num_channels: u16,
        audio_format: AudioFormat,
    ) -> Result<Self, Error> {
        let header = FileHeader {
            chunk_size: 0,
            audio_format,
            num_channels,
            sample_rate,
            byte_rate: (sample_rate as u64 * bits_per_sample as u64 * num_channels as u64 / 8)
                as u32,
            block_align: (bits_per_sample as u32 * num_channels as u32 / 8) as u16,
            bits_per_sample,
        };
        header.validate()?;
        Ok(header)
    }

    /// Cheap check for the `RIFF`, `WAVE` and `fmt ` markers
    pub fn is_header(bytes: &[u8]) -> bool {
        bytes.len() >= 16
            && bytes[0..4] == RIFF
            && bytes[8..12] == WAVE
            && bytes[12..16] == FMT
    }

    /// Parse and validate the first 36 bytes of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < Self::SIZE {
            return Err(Error::ShortBuffer {
                needed: Self::SIZE,
                got: bytes.len(),
            });
        }

        let mut violations = Vec::new();
        let chunk_id = tag_at(bytes, 0);
        if chunk_id != RIFF {
            violations.push(HeaderViolation::ChunkId(chunk_id));
        }
        let format = tag_at(bytes, 8);
        if format != WAVE {
            violations.push(HeaderViolation::Format(format));
        }
        let format_id = tag_at(bytes, 12);
        if format_id != FMT {
            violations.push(HeaderViolation::FormatId(format_id));
        }
        let format_size = u32_at(bytes, 16);
        if format_size != FMT_SIZE {
            violations.push(HeaderViolation::FormatSize(format_size));
        }

        let audio_format = u16_at(bytes, 20);
        let num_channels = u16_at(bytes, 22);
        let sample_rate = u32_at(bytes, 24);
        let bits_per_sample = u16_at(bytes, 34);
        check_format(
            sample_rate,
            bits_per_sample,
            num_channels,
            audio_format,
            &mut violations,
        );
        into_result(violations)?;

        Ok(FileHeader {
            chunk_size: u32_at(bytes, 4),
            audio_format: AudioFormat::from_u16(audio_format).unwrap_or_default(),
            num_channels,
            sample_rate,
            byte_rate: u32_at(bytes, 28),
            block_align: u16_at(bytes, 32),
            bits_per_sample,
        })
    }

    /// Check the format fields, collecting every violation
    pub fn validate(&self) -> Result<(), Error> {
        let mut violations = Vec::new();
        check_format(
            self.sample_rate,
            self.bits_per_sample,
            self.num_channels,
            self.audio_format.to_u16(),
            &mut violations,
        );
        into_result(violations)
    }

    /// Serialize to the 36-byte on-disk layout
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut bytes = [0u8; 36];
        bytes[0..4].copy_from_slice(&RIFF);
        bytes[4..8].copy_from_slice(&self.chunk_size.to_le_bytes());
        bytes[8..12].copy_from_slice(&WAVE);
        bytes[12..16].copy_from_slice(&FMT);
        bytes[16..20].copy_from_slice(&FMT_SIZE.to_le_bytes());
        bytes[20..22].copy_from_slice(&self.audio_format.to_u16().to_le_bytes());
        bytes[22..24].copy_from_slice(&self.num_channels.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        bytes[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        bytes[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[rustfmt::skip]
    const STEREO_16_48000: [u8; 36] = [
        0x52, 0x49, 0x46, 0x46, // RIFF
        0x24, 0x08, 0x00, 0x00, // chunk size
        0x57, 0x41, 0x56, 0x45, // WAVE
        0x66, 0x6d, 0x74, 0x20, // fmt_
        0x10, 0x00, 0x00, 0x00, // fmt chunk size
        0x01, 0x00,             // audio format
        0x02, 0x00,             // num channels
        0x80, 0xbb, 0x00, 0x00, // sample rate
        0x00, 0xee, 0x02, 0x00, // byte rate
        0x04, 0x00,             // block align
        0x10, 0x00,             // bits per sample
    ];

    #[test]
    fn test_parse_header() {
        let header = FileHeader::from_bytes(&STEREO_16_48000).unwrap();

        assert_eq!(header.chunk_size, 0x0824);
        assert_eq!(header.audio_format, AudioFormat::Pcm);
        assert_eq!(header.num_channels, 2);
        assert_eq!(header.sample_rate, 48_000);
        assert_eq!(header.byte_rate, 192_000);
        assert_eq!(header.block_align, 4);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.to_bytes(), STEREO_16_48000);
    }

    #[test]
    fn test_new_derives_rates() {
        let header = FileHeader::new(48_000, 16, 2, AudioFormat::Pcm).unwrap();

        assert_eq!(header.byte_rate, 192_000);
        assert_eq!(header.block_align, 4);
        assert_eq!(header.chunk_size, 0);

        let mut expected = STEREO_16_48000;
        expected[4..8].copy_from_slice(&[0; 4]);
        assert_eq!(header.to_bytes(), expected);
    }

    #[test]
    fn test_new_collects_all_violations() {
        let err = FileHeader::new(22_050, 12, 6, AudioFormat::Pcm).unwrap_err();

        assert_eq!(
            err,
            Error::MalformedHeader(Violations(vec![
                HeaderViolation::SampleRate(22_050),
                HeaderViolation::BitDepth(12),
                HeaderViolation::NumChannels(6),
            ]))
        );
    }

    #[test]
    fn test_float_requires_32_bits() {
        assert!(FileHeader::new(44_100, 32, 1, AudioFormat::IeeeFloat).is_ok());
        assert_eq!(
            FileHeader::new(44_100, 16, 1, AudioFormat::IeeeFloat),
            Err(Error::MalformedHeader(Violations(vec![
                HeaderViolation::AudioFormat(3)
            ])))
        );
    }

    #[test]
    fn test_bad_magic_is_reported() {
        let mut bytes = STEREO_16_48000;
        bytes[0..4].copy_from_slice(b"RIFX");
        bytes[16] = 18;
        bytes[20] = 2;

        assert!(!FileHeader::is_header(&bytes));
        assert_eq!(
            FileHeader::from_bytes(&bytes),
            Err(Error::MalformedHeader(Violations(vec![
                HeaderViolation::ChunkId(*b"RIFX"),
                HeaderViolation::FormatSize(18),
                HeaderViolation::AudioFormat(2),
            ])))
        );
    }

    #[test]
    fn test_short_header() {
        assert_eq!(
            FileHeader::from_bytes(&STEREO_16_48000[..20]),
            Err(Error::ShortBuffer {
                needed: 36,
                got: 20
            })
        );
    }
}

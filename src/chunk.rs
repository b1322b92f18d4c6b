use alloc::vec::Vec;
use core::time::Duration;

use crate::conversion::BitDepth;
use crate::data::{DataChunk, JunkChunk};
use crate::error::Error;
use crate::header::AudioFormat;
use crate::synth::Waveform;

/// Sub-chunk IDs this crate understands
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChunkTag {
    /// `data`, PCM samples
    Data,
    /// `junk`, opaque padding
    Junk,
}

impl ChunkTag {
    fn from_id(id: [u8; 4]) -> Result<Self, Error> {
        match &id {
            b"data" => Ok(ChunkTag::Data),
            b"junk" => Ok(ChunkTag::Junk),
            _ => Err(Error::UnknownChunkId(id)),
        }
    }

    fn id(self) -> [u8; 4] {
        match self {
            ChunkTag::Data => *b"data",
            ChunkTag::Junk => *b"junk",
        }
    }
}

/// The 8 bytes preceding each sub-chunk payload
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SubchunkHeader {
    /// sub-chunk ID
    pub tag: ChunkTag,
    /// payload length in bytes, header excluded
    pub size: u32,
}

impl SubchunkHeader {
    /// Encoded length in bytes
    pub const SIZE: usize = 8;

    /// A header with no declared payload
    pub const fn new(tag: ChunkTag) -> Self {
        SubchunkHeader { tag, size: 0 }
    }

    /// Parse the first 8 bytes of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < Self::SIZE {
            return Err(Error::ShortBuffer {
                needed: Self::SIZE,
                got: bytes.len(),
            });
        }

        let tag = ChunkTag::from_id([bytes[0], bytes[1], bytes[2], bytes[3]])?;
        let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(SubchunkHeader { tag, size })
    }

    /// Serialize to the 8-byte on-disk layout
    pub fn to_bytes(&self) -> [u8; 8] {
        let id = self.tag.id();
        let size = self.size.to_le_bytes();
        [
            id[0], id[1], id[2], id[3], // ID
            size[0], size[1], size[2], size[3], // size
        ]
    }
}

/// A sub-chunk of a WAV file
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// PCM samples
    Data(DataChunk),
    /// Opaque bytes, round-tripped untouched
    Junk(JunkChunk),
}

impl Chunk {
    /// Build a chunk for `header`.
    ///
    /// A `junk` header or a width of 0 gives a [`Chunk::Junk`]; anything else
    /// must be a supported width.
    pub fn new(
        header: Option<SubchunkHeader>,
        bits: u16,
        format: AudioFormat,
    ) -> Result<Self, Error> {
        match header {
            Some(h) if h.tag == ChunkTag::Junk => Ok(Chunk::Junk(JunkChunk::new(header))),
            _ if bits == 0 => Ok(Chunk::Junk(JunkChunk::new(header))),
            _ => DataChunk::new(header, bits, format).map(Chunk::Data),
        }
    }

    /// Append raw payload bytes (the first parse after a reset replaces)
    pub fn parse(&mut self, bytes: &[u8]) {
        match self {
            Chunk::Data(data) => data.parse(bytes),
            Chunk::Junk(junk) => junk.parse(bytes),
        }
    }

    /// Append normalized samples; ignored by junk chunks
    pub fn parse_floats(&mut self, samples: &[f64]) {
        if let Chunk::Data(data) = self {
            data.parse_floats(samples);
        }
    }

    /// Append a synthesized wave.
    ///
    /// Shapes that do not convert to a [`Waveform`] leave the chunk unchanged,
    /// as do junk chunks.
    pub fn generate<W: TryInto<Waveform>>(
        &mut self,
        shape: W,
        freq: u32,
        sample_rate: u32,
        duration: Duration,
    ) {
        let Chunk::Data(data) = self else {
            return;
        };
        if let Ok(shape) = shape.try_into() {
            data.generate(shape, freq, sample_rate, duration);
        }
    }

    /// Encoded payload
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Chunk::Data(data) => data.bytes(),
            Chunk::Junk(junk) => junk.bytes().to_vec(),
        }
    }

    /// Integer values, PCM for data and raw bytes for junk
    pub fn values(&self) -> Vec<i32> {
        match self {
            Chunk::Data(data) => data.values(),
            Chunk::Junk(junk) => junk.values(),
        }
    }

    /// Normalized samples; empty for junk
    pub fn floats(&self) -> &[f64] {
        match self {
            Chunk::Data(data) => data.floats(),
            Chunk::Junk(_) => &[],
        }
    }

    /// Drop the payload, keeping the header
    pub fn reset(&mut self) {
        match self {
            Chunk::Data(data) => data.reset(),
            Chunk::Junk(junk) => junk.reset(),
        }
    }

    /// Header to encode
    pub fn header(&self) -> SubchunkHeader {
        match self {
            Chunk::Data(data) => data.header(),
            Chunk::Junk(junk) => junk.header(),
        }
    }

    /// Header and payload bytes accounted since the last reset
    pub fn size(&self) -> u32 {
        match self {
            Chunk::Data(data) => data.size(),
            Chunk::Junk(junk) => junk.size(),
        }
    }

    /// Sample width, `None` for junk
    pub fn bit_depth(&self) -> Option<BitDepth> {
        match self {
            Chunk::Data(data) => Some(data.bit_depth()),
            Chunk::Junk(_) => None,
        }
    }

    /// A data chunk holding this chunk's payload at width `bits`.
    ///
    /// Junk payloads are decoded as PCM.
    pub fn set_bit_depth(&self, bits: u16) -> Result<Chunk, Error> {
        match self {
            Chunk::Data(data) => data.set_bit_depth(bits).map(Chunk::Data),
            Chunk::Junk(junk) => junk.to_data(bits, AudioFormat::Pcm).map(Chunk::Data),
        }
    }

    /// Whether this is a `data` chunk
    pub fn is_data(&self) -> bool {
        matches!(self, Chunk::Data(_))
    }

    /// The data body, if any
    pub fn as_data(&self) -> Option<&DataChunk> {
        match self {
            Chunk::Data(data) => Some(data),
            Chunk::Junk(_) => None,
        }
    }

    /// The data body, if any
    pub fn as_data_mut(&mut self) -> Option<&mut DataChunk> {
        match self {
            Chunk::Data(data) => Some(data),
            Chunk::Junk(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_subchunk_header() {
        let bytes = [0x64, 0x61, 0x74, 0x61, 0x10, 0x00, 0x00, 0x00];
        let header = SubchunkHeader::from_bytes(&bytes).unwrap();

        assert_eq!(header.tag, ChunkTag::Data);
        assert_eq!(header.size, 16);
        assert_eq!(header.to_bytes(), bytes);
    }

    #[test]
    fn test_subchunk_header_errors() {
        assert_eq!(
            SubchunkHeader::from_bytes(b"LIST\x04\x00\x00\x00"),
            Err(Error::UnknownChunkId(*b"LIST"))
        );
        assert_eq!(
            SubchunkHeader::from_bytes(b"data"),
            Err(Error::ShortBuffer { needed: 8, got: 4 })
        );
    }

    #[test]
    fn test_new_picks_variant() {
        let junk = SubchunkHeader::new(ChunkTag::Junk);

        assert!(!Chunk::new(Some(junk), 16, AudioFormat::Pcm).unwrap().is_data());
        assert!(!Chunk::new(None, 0, AudioFormat::Pcm).unwrap().is_data());
        assert!(Chunk::new(None, 16, AudioFormat::Pcm).unwrap().is_data());
        assert_eq!(
            Chunk::new(None, 4, AudioFormat::Pcm),
            Err(Error::UnsupportedBitDepth(4))
        );
    }

    #[test]
    fn test_generate_unknown_shape_is_noop() {
        let mut chunk = Chunk::new(None, 16, AudioFormat::Pcm).unwrap();
        chunk.parse(&[0x01, 0x02, 0x03, 0x04]);
        let before = chunk.clone();

        chunk.generate("noise", 440, 44_100, Duration::from_secs(1));
        chunk.generate(200u8, 440, 44_100, Duration::from_secs(1));

        assert_eq!(chunk, before);
        assert_eq!(chunk.bytes(), vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_generate_by_name() {
        let mut chunk = Chunk::new(None, 16, AudioFormat::Pcm).unwrap();
        chunk.generate("sine", 1_000, 48_000, Duration::from_millis(20));

        assert_eq!(chunk.floats().len(), 960);
        assert_eq!(chunk.header().size, 1_920);
    }

    #[test]
    fn test_junk_ignores_samples() {
        let mut chunk = Chunk::new(None, 0, AudioFormat::Pcm).unwrap();
        chunk.parse(&[9, 9]);
        chunk.parse_floats(&[0.5]);
        chunk.generate(Waveform::Sine, 440, 44_100, Duration::from_secs(1));

        assert_eq!(chunk.bytes(), vec![9, 9]);
        assert!(chunk.floats().is_empty());
        assert_eq!(chunk.bit_depth(), None);
    }

    #[test]
    fn test_junk_set_bit_depth() {
        let mut chunk = Chunk::new(None, 0, AudioFormat::Pcm).unwrap();
        chunk.parse(&[0x7f, 0x80]);

        let data = chunk.set_bit_depth(8).unwrap();
        assert_eq!(data.floats(), &[1.0, -1.0]);
        assert_eq!(data.bit_depth(), Some(BitDepth::Eight));
    }
}

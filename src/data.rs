use alloc::vec::Vec;
use core::time::Duration;

use crate::chunk::{ChunkTag, SubchunkHeader};
use crate::conversion::{BitDepth, Codec, Converter};
use crate::error::Error;
use crate::header::AudioFormat;
use crate::synth::{self, Waveform};

/// Bytes accounted for by one parse into a chunk whose counter is `size`.
///
/// The first parse counts the sub-chunk header too; later parses only add.
fn account(size: u32, len: usize) -> u32 {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    if size == 0 {
        len.saturating_add(SubchunkHeader::SIZE as u32)
    } else {
        size.saturating_add(len)
    }
}

/// A `data` sub-chunk: normalized samples plus the codec for their width
#[derive(Debug, Clone, PartialEq)]
pub struct DataChunk {
    header: SubchunkHeader,
    depth: BitDepth,
    format: AudioFormat,
    codec: Codec,
    samples: Vec<f64>,
    size: u32,
}

impl DataChunk {
    /// Create an empty data chunk; `header` defaults to a blank `data` header
    pub fn new(
        header: Option<SubchunkHeader>,
        bits: u16,
        format: AudioFormat,
    ) -> Result<Self, Error> {
        let depth = BitDepth::from_bits(bits)?;
        Ok(DataChunk {
            header: header.unwrap_or(SubchunkHeader::new(ChunkTag::Data)),
            depth,
            format,
            codec: Codec::new(depth, format),
            samples: Vec::new(),
            size: 0,
        })
    }

    /// Decode `bytes` at this chunk's width.
    ///
    /// The first parse replaces the samples; later ones append.
    pub fn parse(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.size == 0 {
            self.samples.clear();
        }
        self.codec.decode_into(bytes, &mut self.samples);
        self.size = account(self.size, bytes.len());
    }

    /// Append samples that are already normalized
    pub fn parse_floats(&mut self, samples: &[f64]) {
        if samples.is_empty() {
            return;
        }
        if self.size == 0 {
            self.samples.clear();
        }
        self.samples.extend_from_slice(samples);
        self.size = account(self.size, samples.len() * self.depth.bytes());
    }

    /// Append `duration` of `shape` at `freq` Hz, quantized to this chunk's width
    pub fn generate(&mut self, shape: Waveform, freq: u32, sample_rate: u32, duration: Duration) {
        let mut wave = alloc::vec![0.0; synth::sample_count(sample_rate, duration)];
        synth::synthesize(shape, &mut wave, freq, self.depth.bits(), sample_rate);
        self.parse_floats(&wave);
    }

    /// Encoded payload
    pub fn bytes(&self) -> Vec<u8> {
        self.codec.encode(&self.samples)
    }

    /// Integer PCM values, for metering
    pub fn values(&self) -> Vec<i32> {
        self.codec.values(&self.samples)
    }

    /// Normalized samples
    pub fn floats(&self) -> &[f64] {
        &self.samples
    }

    /// Drop all samples, keeping the allocation and the header
    pub fn reset(&mut self) {
        self.samples.clear();
        self.size = 0;
    }

    /// Header to encode: the declared size, grown to fit the payload
    pub fn header(&self) -> SubchunkHeader {
        let payload = u32::try_from(self.samples.len() * self.depth.bytes()).unwrap_or(u32::MAX);
        SubchunkHeader {
            tag: self.header.tag,
            size: self.header.size.max(payload),
        }
    }

    /// Header and payload bytes accounted by parses since the last reset
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Sample width
    pub fn bit_depth(&self) -> BitDepth {
        self.depth
    }

    /// A copy of this chunk holding the same samples at width `bits`
    pub fn set_bit_depth(&self, bits: u16) -> Result<DataChunk, Error> {
        let depth = BitDepth::from_bits(bits)?;
        let payload = self.samples.len() * depth.bytes();
        Ok(DataChunk {
            header: SubchunkHeader {
                tag: ChunkTag::Data,
                size: u32::try_from(payload).unwrap_or(u32::MAX),
            },
            depth,
            format: self.format,
            codec: Codec::new(depth, self.format),
            samples: self.samples.clone(),
            size: self.size,
        })
    }
}

/// A `junk` sub-chunk, kept as opaque bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunkChunk {
    header: SubchunkHeader,
    bytes: Vec<u8>,
    size: u32,
}

impl JunkChunk {
    /// Create an empty junk chunk; `header` defaults to a blank `junk` header
    pub fn new(header: Option<SubchunkHeader>) -> Self {
        JunkChunk {
            header: header.unwrap_or(SubchunkHeader::new(ChunkTag::Junk)),
            bytes: Vec::new(),
            size: 0,
        }
    }

    /// Store `bytes` verbatim; the first parse replaces, later ones append
    pub fn parse(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.size == 0 {
            self.bytes.clear();
        }
        self.bytes.extend_from_slice(bytes);
        self.size = account(self.size, bytes.len());
    }

    /// Raw payload
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Each raw byte widened to an integer
    pub fn values(&self) -> Vec<i32> {
        self.bytes.iter().map(|&b| i32::from(b)).collect()
    }

    /// Drop the payload, keeping the allocation and the header
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.size = 0;
    }

    /// Header to encode: the declared size, grown to fit the payload
    pub fn header(&self) -> SubchunkHeader {
        let payload = u32::try_from(self.bytes.len()).unwrap_or(u32::MAX);
        SubchunkHeader {
            tag: self.header.tag,
            size: self.header.size.max(payload),
        }
    }

    /// Header and payload bytes accounted by parses since the last reset
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decode the raw payload as PCM of width `bits`
    pub fn to_data(&self, bits: u16, format: AudioFormat) -> Result<DataChunk, Error> {
        let mut data = DataChunk::new(None, bits, format)?;
        data.parse(&self.bytes);
        data.header.size = data.header().size;
        Ok(data)
    }
}

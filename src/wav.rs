use alloc::vec;
use alloc::vec::Vec;
use core::time::Duration;

use crate::chunk::{Chunk, ChunkTag, SubchunkHeader};
use crate::data::DataChunk;
use crate::error::Error;
use crate::header::{AudioFormat, FileHeader};
use crate::synth::Waveform;

#[cfg(feature = "io")]
use crate::error::ReadError;

/// An in-memory WAV file: its header and every sub-chunk in file order
#[derive(Debug, Clone, PartialEq)]
pub struct WavFile {
    /// Contains data from the RIFF descriptor and the fmt chunk
    pub header: FileHeader,
    /// Sub-chunks in the order they appear in the file
    pub chunks: Vec<Chunk>,
    active: Option<usize>,
    /// tail of a split write, shorter than one frame
    carry: Vec<u8>,
}

impl WavFile {
    /// Create an empty file with one blank data chunk
    ///
    /// ```
    /// use std::time::Duration;
    /// use wavring::{AudioFormat, WavFile, Waveform};
    ///
    /// let mut wav = WavFile::new(44_100, 16, 1, AudioFormat::Pcm).unwrap();
    /// wav.generate(Waveform::Sine, 440, Duration::from_millis(100));
    ///
    /// assert_eq!(wav.data().unwrap().floats().len(), 4_410);
    /// assert_eq!(wav.encode().len(), 44 + 8_820);
    /// ```
    pub fn new(
        sample_rate: u32,
        bits_per_sample: u16,
        num_channels: u16,
        audio_format: AudioFormat,
    ) -> Result<Self, Error> {
        Self::from_header(FileHeader::new(
            sample_rate,
            bits_per_sample,
            num_channels,
            audio_format,
        )?)
    }

    /// Create an empty file with one blank data chunk from an existing header
    pub fn from_header(header: FileHeader) -> Result<Self, Error> {
        header.validate()?;
        let blank = Chunk::new(None, header.bits_per_sample, header.audio_format)?;

        Ok(WavFile {
            header,
            chunks: vec![blank],
            active: Some(0),
            carry: vec![],
        })
    }

    /// Create new [`WavFile`] instance from a slice of bytes
    ///
    /// ```
    /// use std::fs;
    /// use wavring::WavFile;
    ///
    /// let bytes = fs::read("./test_files/stereo_16bit_48000hz.wav").unwrap();
    /// let wav = WavFile::decode(&bytes).unwrap();
    ///
    /// assert_eq!(wav.header.num_channels, 2);
    /// assert_eq!(wav.header.bits_per_sample, 16);
    /// assert_eq!(wav.header.sample_rate, 48_000);
    /// assert_eq!(wav.encode(), bytes);
    /// ```
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < FileHeader::SIZE {
            return Err(Error::ShortBuffer {
                needed: FileHeader::SIZE,
                got: bytes.len(),
            });
        }
        if !FileHeader::is_header(bytes) {
            return Err(Error::MissingHeader);
        }

        let mut wav = WavFile {
            header: FileHeader::from_bytes(bytes)?,
            chunks: vec![],
            active: None,
            carry: vec![],
        };
        wav.decode_chunks(&bytes[FileHeader::SIZE..])?;

        Ok(wav)
    }

    /// Continue decoding with the next bytes of the same file.
    ///
    /// The header is already established, so `bytes` are read as sub-chunks
    /// or as more payload for the active data chunk. A partial frame left by
    /// the previous call is completed first.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.decode_chunks(bytes)
    }

    /// Cut `payload` at its last whole frame and hold the rest back for the
    /// next write
    fn whole_frames<'a>(&mut self, payload: &'a [u8]) -> &'a [u8] {
        let frame = usize::from(self.header.block_align.max(1));
        let end = payload.len() - payload.len() % frame;
        self.carry.extend_from_slice(&payload[end..]);
        &payload[..end]
    }

    fn decode_chunks(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let pending = core::mem::take(&mut self.carry);
        let joined;
        let mut bytes = if pending.is_empty() {
            bytes
        } else {
            joined = [pending.as_slice(), bytes].concat();
            joined.as_slice()
        };

        while !bytes.is_empty() {
            if let Ok(sub) = SubchunkHeader::from_bytes(bytes) {
                let bits = match sub.tag {
                    ChunkTag::Junk => 0,
                    ChunkTag::Data => self.header.bits_per_sample,
                };
                let mut chunk = Chunk::new(Some(sub), bits, self.header.audio_format)?;

                // declared sizes past the end of the buffer are clamped
                let body = &bytes[SubchunkHeader::SIZE..];
                let end = (sub.size as usize).min(body.len());
                if end < sub.size as usize && chunk.is_data() {
                    let whole = self.whole_frames(&body[..end]);
                    chunk.parse(whole);
                } else {
                    chunk.parse(&body[..end]);
                }
                bytes = &body[end..];

                if chunk.is_data() {
                    self.active = Some(self.chunks.len());
                }
                self.chunks.push(chunk);
                continue;
            }

            let Some(active) = self.active else {
                return Err(Error::MissingDataBuffer);
            };
            let whole = self.whole_frames(bytes);
            if let Some(chunk) = self.chunks.get_mut(active) {
                chunk.parse(whole);
            }
            bytes = &[];
        }

        Ok(())
    }

    /// Create a [`WavFile`] instance from a reader.
    #[cfg(feature = "io")]
    pub fn from_reader<R: embedded_io::Read>(reader: &mut R) -> Result<Self, ReadError<R::Error>> {
        let mut bytes = vec![];
        loop {
            let mut tmp = [0; 512];
            match reader.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => bytes.extend(&tmp[..n]),
                Err(e) => return Err(ReadError::Reader(e)),
            }
        }

        Ok(Self::decode(&bytes)?)
    }

    /// Read and decode the file at `path`
    #[cfg(feature = "std")]
    pub fn from_file<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, ReadError<std::io::Error>> {
        let bytes = std::fs::read(path).map_err(ReadError::Reader)?;
        Ok(Self::decode(&bytes)?)
    }

    /// Convert a [`WavFile`] instance into bytes.
    ///
    /// ChunkSize is raised to fit the chunks when the header declares less;
    /// a larger declared size is kept.
    pub fn encode(&self) -> Vec<u8> {
        let bodies: Vec<(SubchunkHeader, Vec<u8>)> =
            self.chunks.iter().map(|c| (c.header(), c.bytes())).collect();
        let chunks_len: usize = bodies
            .iter()
            .map(|(_, body)| SubchunkHeader::SIZE + body.len())
            .sum();

        // "WAVE" plus every sub-chunk
        let mut header = self.header;
        let needed = u32::try_from(4 + chunks_len).unwrap_or(u32::MAX);
        header.chunk_size = header.chunk_size.max(needed);

        let mut bytes = Vec::with_capacity(FileHeader::SIZE + chunks_len);
        bytes.extend_from_slice(&header.to_bytes());
        for (sub, body) in &bodies {
            bytes.extend_from_slice(&sub.to_bytes());
            bytes.extend_from_slice(body);
        }

        bytes
    }

    /// The active data chunk
    pub fn data(&self) -> Option<&DataChunk> {
        self.active
            .and_then(|i| self.chunks.get(i))
            .and_then(Chunk::as_data)
    }

    /// The active data chunk, mutably
    pub fn data_mut(&mut self) -> Option<&mut DataChunk> {
        self.active
            .and_then(|i| self.chunks.get_mut(i))
            .and_then(Chunk::as_data_mut)
    }

    /// Append a synthesized wave to the active data chunk at the header's sample rate
    pub fn generate(&mut self, shape: Waveform, freq: u32, duration: Duration) {
        let sample_rate = self.header.sample_rate;
        if let Some(data) = self.data_mut() {
            data.generate(shape, freq, sample_rate, duration);
        }
    }
}

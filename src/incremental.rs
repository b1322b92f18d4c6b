//! Bounded-memory streaming decoder.
//!
//! A [`RingDecoder`] reads the header and sub-chunk headers of a WAV stream,
//! then writes the data payload into a fixed-capacity circular buffer. A
//! payload ends at its declared size, after which sub-chunk headers are read
//! again; a declared size of zero runs to the end of the source. Each
//! time the write cursor wraps (a lap), the filled buffer is decoded into the
//! active [`DataChunk`] and handed to a caller hook, and the chunk is reset.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::time::Duration;

use embedded_io::Error as _;

use crate::chunk::{ChunkTag, SubchunkHeader};
use crate::data::DataChunk;
use crate::error::Error;
use crate::header::FileHeader;

/// How much audio the ring buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BufferSize {
    /// One second of audio at the stream's byte rate
    #[default]
    OneSecond,
    /// An explicit number of bytes
    Bytes(usize),
    /// A span of audio at the stream's byte rate
    Duration(Duration),
    /// A fraction of a second; values that are not positive mean one second
    Ratio(f64),
}

/// Ring decoder settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StreamConfig {
    /// ring buffer capacity
    pub size: BufferSize,
}

impl StreamConfig {
    /// Config with the given ring size
    pub fn new(size: BufferSize) -> Self {
        StreamConfig { size }
    }

    /// Ring capacity in bytes for a stream described by `header`.
    ///
    /// Never smaller than `bits_per_sample` bytes and always a multiple of
    /// it, so every lap ends on a frame boundary.
    pub fn buffer_size(&self, header: &FileHeader) -> usize {
        let byte_rate = u64::from(header.sample_rate)
            * u64::from(header.bits_per_sample)
            * u64::from(header.num_channels)
            / 8;
        let one_second = usize::try_from(byte_rate).unwrap_or(usize::MAX);

        let size = match self.size {
            BufferSize::OneSecond => one_second,
            BufferSize::Bytes(n) => n,
            BufferSize::Duration(d) => {
                usize::try_from(u128::from(byte_rate) * d.as_nanos() / 1_000_000_000)
                    .unwrap_or(usize::MAX)
            }
            BufferSize::Ratio(r) if r > 0.0 && r.is_finite() => {
                libm::round(byte_rate as f64 * r) as usize
            }
            BufferSize::Ratio(_) => one_second,
        };

        let unit = usize::from(header.bits_per_sample.max(1));
        size.max(unit).div_ceil(unit) * unit
    }
}

/// Why a streaming session ended
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Terminal {
    /// The source was exhausted; the expected way for a finite stream to end
    #[error("end of stream")]
    EndOfStream,
    /// The session deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// The caller cancelled the session
    #[error("cancelled")]
    Cancelled,
    /// The byte source failed
    #[error("source read failed: {0:?}")]
    Io(embedded_io::ErrorKind),
    /// Decoding failed or a hook aborted
    #[error(transparent)]
    Failed(Error),
}

impl Terminal {
    /// Whether the session ran to the end of its source
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Terminal::EndOfStream)
    }
}

/// A boxed lap hook, for combining with [`multi_hook`]
pub type BoxedHook<'a> = Box<dyn FnMut(&RingDecoder, &[u8]) -> Result<(), Error> + 'a>;

/// Run several lap hooks as one, in order.
///
/// With `fail_fast` the first error is returned and the remaining hooks are
/// skipped. Otherwise every hook runs; a single error is returned as is and
/// several are joined into [`Error::Hooks`].
pub fn multi_hook<'a>(
    fail_fast: bool,
    mut hooks: Vec<BoxedHook<'a>>,
) -> impl FnMut(&RingDecoder, &[u8]) -> Result<(), Error> + 'a {
    move |decoder: &RingDecoder, block: &[u8]| {
        if fail_fast {
            return hooks.iter_mut().try_for_each(|hook| hook(decoder, block));
        }

        let mut errors: Vec<Error> = hooks
            .iter_mut()
            .filter_map(|hook| hook(decoder, block).err())
            .collect();
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Hooks(errors)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Subchunk,
    /// remaining bytes of a junk payload
    Skip(usize),
    /// remaining bytes of a data payload; `None` runs to the end of the source
    Data(Option<u64>),
}

/// Streaming WAV decoder over a fixed-capacity ring buffer
#[derive(Debug)]
pub struct RingDecoder {
    config: StreamConfig,
    state: State,
    staging: [u8; FileHeader::SIZE],
    staged: usize,
    header: Option<FileHeader>,
    chunks: Vec<SubchunkHeader>,
    data: Option<DataChunk>,
    ring: Vec<u8>,
    write_pos: usize,
    offset: u64,
    laps: u64,
}

impl RingDecoder {
    /// A decoder expecting the stream to start with a WAV header
    pub fn new(config: StreamConfig) -> Self {
        RingDecoder {
            config,
            state: State::Header,
            staging: [0; FileHeader::SIZE],
            staged: 0,
            header: None,
            chunks: vec![],
            data: None,
            ring: vec![],
            write_pos: 0,
            offset: 0,
            laps: 0,
        }
    }

    /// A decoder for a stream whose header was already read; the stream
    /// starts at a sub-chunk header
    pub fn with_header(header: FileHeader, config: StreamConfig) -> Result<Self, Error> {
        header.validate()?;
        let mut decoder = Self::new(config);
        decoder.establish(header);
        Ok(decoder)
    }

    fn establish(&mut self, header: FileHeader) {
        let capacity = self.config.buffer_size(&header);
        crate::debug!(
            "wav header: {} Hz, {} bit, {} ch; ring of {} bytes",
            header.sample_rate,
            header.bits_per_sample,
            header.num_channels,
            capacity
        );
        self.ring = vec![0; capacity];
        self.header = Some(header);
        self.state = State::Subchunk;
        self.staged = 0;
    }

    /// The region the next read should fill; never empty
    pub fn spare(&mut self) -> &mut [u8] {
        match self.state {
            State::Header => &mut self.staging[self.staged..],
            State::Subchunk => &mut self.staging[self.staged..SubchunkHeader::SIZE],
            // skipped bytes land past the unfinished lap and are overwritten
            State::Skip(remaining) => {
                let n = remaining.min(self.ring.len() - self.write_pos);
                &mut self.ring[self.write_pos..self.write_pos + n]
            }
            State::Data(remaining) => {
                let free = self.ring.len() - self.write_pos;
                let n = match remaining {
                    Some(r) => free.min(usize::try_from(r).unwrap_or(usize::MAX)),
                    None => free,
                };
                &mut self.ring[self.write_pos..self.write_pos + n]
            }
        }
    }

    /// Account for `n` bytes just read into [`spare`](Self::spare).
    ///
    /// Runs `hook` once if this completes a lap of the ring; its error aborts.
    pub fn commit<F>(&mut self, n: usize, hook: &mut F) -> Result<(), Error>
    where
        F: FnMut(&RingDecoder, &[u8]) -> Result<(), Error>,
    {
        match self.state {
            State::Header => {
                self.staged += n;
                if self.staged == FileHeader::SIZE {
                    if !FileHeader::is_header(&self.staging) {
                        return Err(Error::MissingHeader);
                    }
                    let header = FileHeader::from_bytes(&self.staging)?;
                    self.establish(header);
                }
            }
            State::Subchunk => {
                self.staged += n;
                if self.staged == SubchunkHeader::SIZE {
                    self.staged = 0;
                    self.enter(SubchunkHeader::from_bytes(&self.staging)?)?;
                }
            }
            State::Skip(remaining) => {
                self.state = match remaining - n {
                    0 => State::Subchunk,
                    left => State::Skip(left),
                };
            }
            State::Data(remaining) => {
                self.write_pos += n;
                self.offset += n as u64;
                if let Some(remaining) = remaining {
                    self.state = match remaining - n as u64 {
                        0 => State::Subchunk,
                        left => State::Data(Some(left)),
                    };
                }
                if self.write_pos == self.ring.len() {
                    return self.lap(hook);
                }
            }
        }

        Ok(())
    }

    fn enter(&mut self, sub: SubchunkHeader) -> Result<(), Error> {
        crate::debug!("sub-chunk {:?}, {} bytes", sub.tag, sub.size);
        self.chunks.push(sub);

        match sub.tag {
            ChunkTag::Junk if sub.size > 0 => self.state = State::Skip(sub.size as usize),
            ChunkTag::Junk => {}
            ChunkTag::Data => {
                let Some(header) = self.header else {
                    return Err(Error::MissingHeader);
                };
                self.data = Some(DataChunk::new(
                    Some(sub),
                    header.bits_per_sample,
                    header.audio_format,
                )?);
                // a zero size is a stream of unknown length
                self.state = State::Data(match sub.size {
                    0 => None,
                    size => Some(u64::from(size)),
                });
            }
        }

        Ok(())
    }

    fn lap<F>(&mut self, hook: &mut F) -> Result<(), Error>
    where
        F: FnMut(&RingDecoder, &[u8]) -> Result<(), Error>,
    {
        self.write_pos = 0;
        self.laps += 1;
        crate::trace!("lap {} at offset {}", self.laps, self.offset);

        if let Some(data) = &mut self.data {
            data.parse(&self.ring);
        }
        let result = hook(&*self, &self.ring);
        if let Some(data) = &mut self.data {
            data.reset();
        }

        result
    }

    /// Handle the end of the source.
    ///
    /// Bytes written since the last lap are decoded into the data chunk
    /// without running the hook.
    pub fn finish(&mut self) -> Terminal {
        if let Some(data) = &mut self.data {
            data.parse(&self.ring[..self.write_pos]);
        }

        let terminal = match self.state {
            State::Header => Terminal::Failed(Error::ShortBuffer {
                needed: FileHeader::SIZE,
                got: self.staged,
            }),
            State::Subchunk if self.staged > 0 => Terminal::Failed(Error::ShortBuffer {
                needed: SubchunkHeader::SIZE,
                got: self.staged,
            }),
            State::Subchunk | State::Skip(_) | State::Data(_) => Terminal::EndOfStream,
        };

        self.terminate(terminal)
    }

    fn terminate(&self, terminal: Terminal) -> Terminal {
        crate::debug!(
            "stream ended after {} bytes, {} laps: {}",
            self.offset,
            self.laps,
            terminal
        );
        terminal
    }

    /// Drain a blocking reader through the decoder until it ends or fails
    pub fn read_from<R, F>(&mut self, reader: &mut R, mut hook: F) -> Terminal
    where
        R: embedded_io::Read,
        F: FnMut(&RingDecoder, &[u8]) -> Result<(), Error>,
    {
        loop {
            let n = match reader.read(self.spare()) {
                Ok(0) => return self.finish(),
                Ok(n) => n,
                Err(e) => return self.terminate(Terminal::Io(e.kind())),
            };
            if let Err(e) = self.commit(n, &mut hook) {
                return self.terminate(Terminal::Failed(e));
            }
        }
    }

    /// Drain an async reader through the decoder until it ends or fails
    pub async fn read_from_async<R, F>(&mut self, reader: &mut R, mut hook: F) -> Terminal
    where
        R: embedded_io_async::Read,
        F: FnMut(&RingDecoder, &[u8]) -> Result<(), Error>,
    {
        loop {
            let n = match reader.read(self.spare()).await {
                Ok(0) => return self.finish(),
                Ok(n) => n,
                Err(e) => return self.terminate(Terminal::Io(e.kind())),
            };
            if let Err(e) = self.commit(n, &mut hook) {
                return self.terminate(Terminal::Failed(e));
            }
        }
    }

    /// The stream's header, once read
    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    /// The active data chunk; inside a hook it holds the lap just completed
    pub fn data(&self) -> Option<&DataChunk> {
        self.data.as_ref()
    }

    /// Sub-chunk headers seen so far, in stream order
    pub fn chunks(&self) -> &[SubchunkHeader] {
        &self.chunks
    }

    /// Data payload bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Completed laps of the ring
    pub fn laps(&self) -> u64 {
        self.laps
    }

    /// Ring capacity in bytes; zero until the header is known
    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    /// The decoder's settings
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

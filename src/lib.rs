//! `no_std` WAV codec with a ring-buffer streaming decoder and a waveform
//! synthesizer.
//!
//! Decoding and re-encoding a WAV file:
//! ```
//! use std::fs;
//! use wavring::WavFile;
//!
//! let bytes = fs::read("./test_files/mono_16bit_44100hz.wav").unwrap();
//! let wav = WavFile::decode(&bytes).unwrap();
//!
//! assert_eq!(wav.header.num_channels, 1);
//! assert_eq!(wav.header.bits_per_sample, 16);
//! assert_eq!(wav.header.sample_rate, 44_100);
//!
//! let data = wav.data().unwrap();
//! println!("{} samples, first {:?}", data.floats().len(), data.values()[0]);
//!
//! // byte-exact round trip
//! assert_eq!(wav.encode(), bytes);
//! ```
//!
//! Generating a test tone:
//! ```
//! use std::time::Duration;
//! use wavring::{AudioFormat, WavFile, Waveform};
//!
//! let mut wav = WavFile::new(48_000, 24, 1, AudioFormat::Pcm).unwrap();
//! wav.generate(Waveform::Triangle, 1_000, Duration::from_millis(250));
//!
//! let bytes = wav.encode();
//! assert_eq!(bytes.len(), 44 + 12_000 * 3);
//! ```
//!
//! Streaming with bounded memory (requires the "io" feature):
//! ```
//! # #[cfg(feature = "io")]
//! # fn main() {
//! use std::fs;
//! use wavring::{BufferSize, RingDecoder, StreamConfig};
//!
//! let bytes = fs::read("./test_files/stereo_16bit_48000hz.wav").unwrap();
//! let mut decoder = RingDecoder::new(StreamConfig::new(BufferSize::Bytes(256)));
//!
//! let mut peak = 0.0_f64;
//! let end = decoder.read_from(&mut bytes.as_slice(), |decoder, _block| {
//!     for sample in decoder.data().unwrap().floats() {
//!         peak = peak.max(sample.abs());
//!     }
//!     Ok(())
//! });
//!
//! assert!(end.is_end_of_stream());
//! assert_eq!(decoder.laps(), 4);
//! assert_eq!(peak, 1.0);
//! # }
//! # #[cfg(not(feature = "io"))]
//! # fn main() {}
//! ```
//!
//! Supervised streaming from a file with a deadline (requires the "std" feature):
//! ```
//! # #[cfg(feature = "std")]
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::time::Duration;
//! use wavring::{stream, RingDecoder, StreamConfig, StreamContext, TokioSource};
//!
//! let mut source = TokioSource::open("./test_files/mono_24bit_96000hz.wav").await.unwrap();
//! let mut decoder = RingDecoder::new(StreamConfig::default());
//! let ctx = StreamContext::new().with_timeout(Duration::from_secs(5));
//!
//! let cause = stream(&mut decoder, &mut source, |_, _| Ok(()), &ctx).await;
//! assert!(cause.is_end_of_stream());
//! # }
//! # #[cfg(not(feature = "std"))]
//! # fn main() {}
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(feature = "log")]
macro_rules! debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {{}};
}

#[cfg(feature = "log")]
macro_rules! trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($arg:tt)*) => {{}};
}

#[allow(unused_imports)]
pub(crate) use {debug, trace};

mod chunk;
mod conversion;
mod data;
mod error;
mod header;
mod synth;
mod wav;

pub use chunk::{Chunk, ChunkTag, SubchunkHeader};
pub use conversion::{BitDepth, Codec, Converter, Float32, Pcm16, Pcm24, Pcm32, Pcm8};
pub use data::{DataChunk, JunkChunk};
pub use error::{Error, HeaderViolation, Violations};
pub use header::{AudioFormat, FileHeader, SAMPLE_RATES};
pub use synth::{sample_count, synthesize, UnknownWaveform, Waveform};
pub use wav::WavFile;

#[cfg(feature = "io")]
pub use error::ReadError;

#[cfg(feature = "io")]
mod incremental;
#[cfg(feature = "io")]
pub use incremental::{multi_hook, BoxedHook, BufferSize, RingDecoder, StreamConfig, Terminal};

#[cfg(feature = "std")]
mod stream;
#[cfg(feature = "std")]
pub use stream::{stream, Canceller, StreamContext, TokioSource};

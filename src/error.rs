use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::{self, Write as _};

/// A single field of a [`FileHeader`](crate::FileHeader) that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderViolation {
    /// ChunkID is not `RIFF`
    ChunkId([u8; 4]),
    /// Format is not `WAVE`
    Format([u8; 4]),
    /// format sub-chunk ID is not `fmt `
    FormatId([u8; 4]),
    /// format sub-chunk size is not 16
    FormatSize(u32),
    /// sample rate outside the supported set
    SampleRate(u32),
    /// bits per sample outside {8, 16, 24, 32}
    BitDepth(u16),
    /// neither mono nor stereo
    NumChannels(u16),
    /// neither PCM nor IEEE float
    AudioFormat(u16),
}

impl fmt::Display for HeaderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderViolation::ChunkId(id) => write!(f, "ChunkID {}", tag(id)),
            HeaderViolation::Format(id) => write!(f, "Format {}", tag(id)),
            HeaderViolation::FormatId(id) => write!(f, "Subchunk1ID {}", tag(id)),
            HeaderViolation::FormatSize(size) => write!(f, "Subchunk1Size {size}"),
            HeaderViolation::SampleRate(rate) => write!(f, "SampleRate {rate}"),
            HeaderViolation::BitDepth(depth) => write!(f, "BitsPerSample {depth}"),
            HeaderViolation::NumChannels(channels) => write!(f, "NumChannels {channels}"),
            HeaderViolation::AudioFormat(format) => write!(f, "AudioFormat {format}"),
        }
    }
}

fn tag(id: &[u8; 4]) -> &str {
    core::str::from_utf8(id).unwrap_or("<non-ascii>")
}

/// Every violation found while validating one header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(pub Vec<HeaderViolation>);

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Error type for decoding, encoding and streaming failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Fewer bytes than the structure being read requires
    #[error("short buffer: needed {needed} bytes, got {got}")]
    ShortBuffer {
        /// bytes the structure requires
        needed: usize,
        /// bytes that were available
        got: usize,
    },
    /// No RIFF/WAVE header where one was required
    #[error("missing WAV header")]
    MissingHeader,
    /// Header present but one or more fields are invalid
    #[error("malformed WAV header: {0}")]
    MalformedHeader(Violations),
    /// Sub-chunk ID other than `data` or `junk`
    #[error("unknown sub-chunk ID {0:?}")]
    UnknownChunkId([u8; 4]),
    /// Unsupported bit depth
    #[error("unsupported bit depth {0}")]
    UnsupportedBitDepth(u16),
    /// No sub-chunk header to parse and no active data chunk to continue
    #[error("missing data buffer")]
    MissingDataBuffer,
    /// A processing hook aborted the stream
    #[error("processing hook failed: {0}")]
    Hook(Arc<dyn core::error::Error + Send + Sync>),
    /// More than one combined hook failed on the same lap
    #[error("processing hooks failed: {}", join(.0))]
    Hooks(Vec<Error>),
}

fn join(errors: &[Error]) -> String {
    let mut joined = String::new();
    for (i, err) in errors.iter().enumerate() {
        if i > 0 {
            joined.push_str("; ");
        }
        let _ = write!(joined, "{err}");
    }
    joined
}

impl Error {
    /// Wrap a caller error so a processing hook can return it
    pub fn hook<E>(err: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Error::Hook(Arc::new(err))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Error::ShortBuffer { needed, got },
                Error::ShortBuffer {
                    needed: other_needed,
                    got: other_got,
                },
            ) => needed == other_needed && got == other_got,
            (Error::MissingHeader, Error::MissingHeader) => true,
            (Error::MalformedHeader(a), Error::MalformedHeader(b)) => a == b,
            (Error::UnknownChunkId(a), Error::UnknownChunkId(b)) => a == b,
            (Error::UnsupportedBitDepth(a), Error::UnsupportedBitDepth(b)) => a == b,
            (Error::MissingDataBuffer, Error::MissingDataBuffer) => true,
            (Error::Hook(a), Error::Hook(b)) => Arc::ptr_eq(a, b),
            (Error::Hooks(a), Error::Hooks(b)) => a == b,
            _ => false,
        }
    }
}

/// Error raised while draining a reader into a [`WavFile`](crate::WavFile)
#[cfg(feature = "io")]
#[derive(Debug, PartialEq)]
pub enum ReadError<E> {
    /// Error from the underlying reader
    Reader(E),
    /// Error from the parser
    Parser(Error),
}

#[cfg(feature = "io")]
impl<E> From<Error> for ReadError<E> {
    fn from(e: Error) -> Self {
        ReadError::Parser(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[derive(Debug)]
    struct Overload;

    impl fmt::Display for Overload {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("overload")
        }
    }

    impl core::error::Error for Overload {}

    #[test]
    fn violations_are_listed_together() {
        let err = Error::MalformedHeader(Violations(vec![
            HeaderViolation::SampleRate(22_050),
            HeaderViolation::BitDepth(12),
        ]));

        assert_eq!(
            err.to_string(),
            "malformed WAV header: SampleRate 22050; BitsPerSample 12"
        );
    }

    #[test]
    fn hook_errors_compare_by_identity() {
        let err = Error::hook(Overload);
        let copy = err.clone();

        assert_eq!(err, copy);
        assert_ne!(err, Error::hook(Overload));
        assert_eq!(err.to_string(), "processing hook failed: overload");
    }

    #[test]
    fn joined_hook_errors_are_listed_together() {
        let err = Error::Hooks(vec![Error::hook(Overload), Error::MissingDataBuffer]);

        assert_eq!(
            err.to_string(),
            "processing hooks failed: processing hook failed: overload; missing data buffer"
        );
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("sample rate must be > 0")]
    InvalidSampleRate,

    #[error("sample rate of {0} Hz overflows the byte rate field")]
    SampleRateTooHigh(u32),

    #[error("payload of {0} bytes does not fit a RIFF container")]
    PayloadTooLarge(usize),

    #[error("not a RIFF file (missing RIFF tag)")]
    NotRiff,

    #[error("not a WAVE file (missing WAVE tag)")]
    NotWave,

    #[error("incomplete WAV: missing {0} chunk")]
    MissingChunk(&'static str),

    #[error("unsupported WAV encoding: {0}")]
    Unsupported(String),

    #[error("malformed WAV: {0}")]
    Malformed(String),

    #[error("truncated WAV data at byte {0}")]
    Truncated(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for WavError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => WavError::Io(e),
            hound::Error::FormatError("missing fmt chunk") => WavError::MissingChunk("fmt"),
            hound::Error::FormatError(msg) => WavError::Malformed(msg.to_string()),
            other @ (hound::Error::TooWide
            | hound::Error::Unsupported
            | hound::Error::InvalidSampleFormat) => WavError::Unsupported(other.to_string()),
            other => WavError::Malformed(other.to_string()),
        }
    }
}

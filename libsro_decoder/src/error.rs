use std::path::PathBuf;
use thiserror::Error;

use super::constants::*;
use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("Bank payload of {0} bytes is not a whole number of 32-bit words")]
    MisalignedPayload(usize),
    #[error("Bank buffer has {0} bytes; a bank header requires {size}", size=BANK_HEADER_SIZE_BYTES)]
    BufferTooSmall(usize),
    #[error("Bank declares {declared} words but only {available} words remain in the buffer")]
    LengthOverrun { declared: usize, available: usize },
    #[error("Bank declares length 0, which cannot hold the bank header")]
    ZeroLength,
    #[error("Bank nesting exceeds the maximum depth of {max}", max=MAX_BANK_DEPTH)]
    TooDeep,
}

#[derive(Debug, Error)]
pub enum EvioFileError {
    #[error("EvioFile failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not open EvioFile because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("EvioFile header has bad magic number {0:#010X}; expected {exp:#010X}", exp=EVIO_MAGIC)]
    BadMagic(u32),
    #[error("EvioFile has unsupported format version {0}; expected {v4} or {v6}", v4=EVIO_VERSION_4, v6=EVIO_VERSION_6)]
    UnsupportedVersion(u32),
    #[error("EvioFile record {0} is compressed (type {1}); only uncompressed records are supported")]
    UnsupportedCompression(u32, u32),
    #[error("EvioFile failed to convert header words: {0}")]
    BadWords(#[from] BankError),
    #[error("EvioFile record {record} is corrupt: {reason}")]
    CorruptRecord { record: u32, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has invalid number of threads {0}; must be at least 1")]
    BadThreadCount(i32),
    #[error("Config has invalid chunk size {0}; must be at least 1")]
    BadChunkSize(usize),
    #[error("Config does not list any input files")]
    NoInputFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Hit columns have unequal lengths: payload_id {id}, payload_ch {ch}, payload_timestamp {time}, payload_charge {charge}")]
    ColumnLengthMismatch {
        id: usize,
        ch: usize,
        time: usize,
        charge: usize,
    },
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("JsonWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("JsonWriter failed to serialize an event record: {0}")]
    SerializeError(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to EvioFile error: {0}")]
    EvioError(#[from] EvioFileError),
    #[error("Processor failed due to JsonWriter error: {0}")]
    WriterError(#[from] WriterError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed because a decode worker panicked")]
    WorkerPanic,
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Broad classes of event rejection. The class decides how loudly a rejection is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    Structural,
    Consistency,
    Internal,
}

/// Reason an event was dropped by the EventDecoder.
///
/// Rejections are ordinary values, not failures of the run: the processor counts them and
/// moves on to the next event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("root bank tag {0:#06X} is not a streaming event")]
    NotStreamingEvent(u16),
    #[error("bank has {found} children; at least {required} are required")]
    TooFewChildren { found: usize, required: usize },
    #[error("first child bank has tag {0:#06X}; expected the stream info bank")]
    MissingStreamInfo(u16),
    #[error("first time slice child has tag {0:#06X}; expected the nested stream info bank")]
    MissingNestedStreamInfo(u16),
    #[error("stream info bank has {0} words; at least {min} are required", min=STREAM_INFO_WORDS)]
    InsufficientData(usize),
    #[error("time slice frame number {inner} != stream info frame number {outer}")]
    FrameMismatch { outer: u32, inner: u32 },
    #[error("time slice timestamp {inner} != stream info timestamp {outer}")]
    TimestampMismatch { outer: u64, inner: u64 },
    #[error("internal decode error: {0}")]
    InternalError(#[from] BankError),
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::NotStreamingEvent(_)
            | Self::TooFewChildren { .. }
            | Self::MissingStreamInfo(_)
            | Self::MissingNestedStreamInfo(_)
            | Self::InsufficientData(_) => RejectionKind::Structural,
            Self::FrameMismatch { .. } | Self::TimestampMismatch { .. } => {
                RejectionKind::Consistency
            }
            Self::InternalError(_) => RejectionKind::Internal,
        }
    }

    /// Stable name used as a key in run summaries
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStreamingEvent(_) => "NOT_STREAMING_EVENT",
            Self::TooFewChildren { .. } => "TOO_FEW_CHILDREN",
            Self::MissingStreamInfo(_) => "MISSING_STREAM_INFO",
            Self::MissingNestedStreamInfo(_) => "MISSING_NESTED_STREAM_INFO",
            Self::InsufficientData(_) => "INSUFFICIENT_DATA",
            Self::FrameMismatch { .. } => "FRAME_MISMATCH",
            Self::TimestampMismatch { .. } => "TIMESTAMP_MISMATCH",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

use fxhash::FxHashMap;
use std::path::Path;
use std::sync::mpsc::Sender;

use super::config::Config;
use super::error::{ProcessorError, Rejection, RejectionKind};
use super::event_decoder::{DecodedEvent, EventDecoder};
use super::evio_file::{EvioFile, RawEvent};
use super::json_writer::JsonWriter;
use super::worker_status::WorkerStatus;

type DecodeOutcome = Result<DecodedEvent, Rejection>;

/// Tallies for one file or a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub events_seen: u64,
    pub events_accepted: u64,
    pub malformed_words: u64,
    pub rejections_by_kind: FxHashMap<RejectionKind, u64>,
    pub rejections_by_reason: FxHashMap<&'static str, u64>,
    pub hits_per_payload: FxHashMap<u16, u64>,
    /// Set when reading stopped early because the container itself was unreadable
    pub read_error: bool,
}

impl RunSummary {
    fn record_accepted(&mut self, decoded: &DecodedEvent) {
        self.events_seen += 1;
        self.events_accepted += 1;
        self.malformed_words += decoded.malformed_words as u64;
        for hit in decoded.record.hits.iter() {
            *self.hits_per_payload.entry(hit.payload_id).or_default() += 1;
        }
    }

    fn record_rejected(&mut self, rejection: &Rejection) {
        self.events_seen += 1;
        *self.rejections_by_kind.entry(rejection.kind()).or_default() += 1;
        *self.rejections_by_reason.entry(rejection.name()).or_default() += 1;
    }

    pub fn events_rejected(&self) -> u64 {
        self.events_seen - self.events_accepted
    }

    pub fn rejected_of_kind(&self, kind: RejectionKind) -> u64 {
        self.rejections_by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn rejected_for(&self, reason: &str) -> u64 {
        self.rejections_by_reason.get(reason).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> u64 {
        self.hits_per_payload.values().sum()
    }

    /// Fold another summary into this one
    pub fn merge(&mut self, other: &RunSummary) {
        self.events_seen += other.events_seen;
        self.events_accepted += other.events_accepted;
        self.malformed_words += other.malformed_words;
        for (kind, count) in other.rejections_by_kind.iter() {
            *self.rejections_by_kind.entry(*kind).or_default() += count;
        }
        for (reason, count) in other.rejections_by_reason.iter() {
            *self.rejections_by_reason.entry(*reason).or_default() += count;
        }
        for (id, count) in other.hits_per_payload.iter() {
            *self.hits_per_payload.entry(*id).or_default() += count;
        }
        self.read_error |= other.read_error;
    }

    pub fn log_report(&self, label: &str) {
        log::info!(
            "{label}: {} events, {} accepted, {} rejected ({} structural, {} consistency, {} internal)",
            self.events_seen,
            self.events_accepted,
            self.events_rejected(),
            self.rejected_of_kind(RejectionKind::Structural),
            self.rejected_of_kind(RejectionKind::Consistency),
            self.rejected_of_kind(RejectionKind::Internal),
        );
        let mut reasons: Vec<_> = self.rejections_by_reason.iter().collect();
        reasons.sort();
        for (reason, count) in reasons {
            log::info!("{label}: rejected {count} events with {reason}");
        }
        let mut payloads: Vec<_> = self.hits_per_payload.iter().collect();
        payloads.sort();
        for (id, count) in payloads {
            log::info!("{label}: payload {id} produced {count} hits");
        }
        if self.malformed_words > 0 {
            log::info!("{label}: dropped {} malformed hit words", self.malformed_words);
        }
    }
}

/// Report a rejected event at the level its class calls for.
///
/// Structural rejections are routine (non-streaming events are common), so they only show
/// up in verbose output. Consistency failures point at the hardware and are always shown.
fn report_rejection(event_index: u64, rejection: &Rejection) {
    match rejection.kind() {
        RejectionKind::Structural => {
            log::debug!("Skipping event {event_index}: {rejection}")
        }
        RejectionKind::Consistency => log::warn!("Rejected event {event_index}: {rejection}"),
        RejectionKind::Internal => log::error!("Error processing event {event_index}: {rejection}"),
    }
}

/// Decode a batch of events across n_threads scoped workers.
///
/// Each worker gets a contiguous slice of the batch and results are concatenated in slice
/// order, so the output order matches the input order regardless of which worker finishes
/// first.
pub fn decode_batch(
    decoder: &EventDecoder,
    batch: &[RawEvent],
    n_threads: usize,
) -> Result<Vec<DecodeOutcome>, ProcessorError> {
    if n_threads <= 1 || batch.len() < 2 {
        return Ok(batch.iter().map(|e| decoder.decode_raw(e)).collect());
    }
    let chunk_len = batch.len().div_ceil(n_threads);
    std::thread::scope(|s| {
        let handles: Vec<_> = batch
            .chunks(chunk_len)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|e| decoder.decode_raw(e))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        // Join everything before inspecting, so a panicked worker is never left unjoined
        let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
        let mut results = Vec::with_capacity(batch.len());
        for outcome in joined {
            match outcome {
                Ok(chunk_results) => results.extend(chunk_results),
                Err(_) => return Err(ProcessorError::WorkerPanic),
            }
        }
        Ok(results)
    })
}

/// Pull up to chunk_size events from the file, stopping early at the configured event limit.
///
/// Returns true if the file can still produce events.
fn fill_batch(
    evio: &mut EvioFile,
    config: &Config,
    batch: &mut Vec<RawEvent>,
    events_read: u64,
) -> Result<bool, ProcessorError> {
    batch.clear();
    while batch.len() < config.chunk_size {
        if config.is_event_limit_reached(events_read + batch.len() as u64) {
            return Ok(false);
        }
        match evio.next_event()? {
            Some(event) => batch.push(event),
            None => return Ok(false),
        }
    }
    Ok(true)
}

/// Decode every event of a single EVIO file and write the accepted ones to JSON.
///
/// Only an invalid config and failures of the file itself (open, output) are errors; every per-event problem is
/// counted in the returned summary. If the container becomes unreadable partway through,
/// the events read so far are kept and the summary is flagged.
pub fn process_file(
    config: &Config,
    path: &Path,
    file_index: usize,
    tx: &Sender<WorkerStatus>,
) -> Result<RunSummary, ProcessorError> {
    config.validate()?;
    let n_files = config.input_paths.len();
    let mut evio = EvioFile::open(path)?;
    log::info!(
        "Processing file: {} ({}, EVIO v{})",
        path.to_string_lossy(),
        human_bytes::human_bytes(evio.size_bytes() as f64),
        evio.version()
    );
    log::info!("File contains {} records", evio.record_count());
    log::info!("File total event count = {}", evio.total_event_count());
    let max_event = config
        .max_events
        .map_or(evio.total_event_count(), |m| m.min(evio.total_event_count()));
    log::info!("max_event is set to: {max_event}");

    let decoder = EventDecoder::new(config.tags);
    let mut writer = JsonWriter::new(&config.get_output_file_name(path))?;
    let mut summary = RunSummary::default();
    let mut batch: Vec<RawEvent> = Vec::with_capacity(config.chunk_size);

    tx.send(WorkerStatus::new(0.0, file_index, n_files))?;
    loop {
        let more = match fill_batch(&mut evio, config, &mut batch, summary.events_seen) {
            Ok(more) => more,
            Err(ProcessorError::EvioError(e)) => {
                log::error!(
                    "Stopped reading {} after {} events: {e}",
                    path.to_string_lossy(),
                    summary.events_seen + batch.len() as u64
                );
                summary.read_error = true;
                false
            }
            Err(e) => return Err(e),
        };

        let results = decode_batch(&decoder, &batch, config.n_threads as usize)?;
        for (event, result) in batch.iter().zip(results) {
            match result {
                Ok(decoded) => {
                    writer.write_record(&decoded.record)?;
                    summary.record_accepted(&decoded);
                }
                Err(rejection) => {
                    report_rejection(event.event_index, &rejection);
                    summary.record_rejected(&rejection);
                }
            }
        }

        let progress = if max_event == 0 {
            1.0
        } else {
            summary.events_seen as f32 / max_event as f32
        };
        tx.send(WorkerStatus::new(progress, file_index, n_files))?;

        if !more {
            break;
        }
    }

    let output_path = writer.path().to_path_buf();
    let written = writer.close()?;
    log::info!(
        "Wrote {written} events to {}",
        output_path.to_string_lossy()
    );
    summary.log_report(&path.to_string_lossy());
    tx.send(WorkerStatus::new(1.0, file_index, n_files))?;
    Ok(summary)
}

/// The main loop of the decoder. Processes every configured input file in order.
///
/// Files that do not exist or cannot be opened as EVIO are skipped with an error message.
/// Intended to be run on its own thread, with progress reported over tx.
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<RunSummary, ProcessorError> {
    config.validate()?;
    std::fs::create_dir_all(&config.output_path)?;

    let mut total = RunSummary::default();
    for (file_index, path) in config.input_paths.iter().enumerate() {
        if !path.exists() {
            log::warn!("File {} does not exist, skipping...", path.to_string_lossy());
            continue;
        }
        match process_file(&config, path, file_index, &tx) {
            Ok(summary) => total.merge(&summary),
            Err(ProcessorError::EvioError(e)) => {
                log::error!("Could not read {}: {e}", path.to_string_lossy());
            }
            Err(e) => return Err(e),
        }
    }
    if config.input_paths.len() > 1 {
        total.log_report("All files");
    }
    Ok(total)
}

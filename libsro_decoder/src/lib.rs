//! # sro_decoder
//!
//! sro_decoder extracts FADC250 hits from streaming readout (SRO) data, written in Rust. It
//! takes EVIO files produced by the streaming data acquisition chain, walks the bank tree
//! of every event, cross-checks the two stream info descriptors each event carries, and
//! unpacks the bit-packed hit words of each digitizer module into a flat JSON record.
//!
//! ## Building & Install
//!
//! To build and install the CLI use `cargo install --path ./sro_decoder_cli` from the top
//! level repository. The binary will be installed to your cargo install location
//! (typically something like `~/.cargo/bin/`).
//!
//! ## Configuration
//!
//! The decoder is driven by a YAML configuration file. A template can be generated with
//! `sro_decoder_cli new -p config.yml`. The format is as follows:
//!
//! ```yml
//! input_paths:
//! - /data/sro/run_0042.evio
//! output_path: output
//! max_events: null
//! n_threads: 4
//! chunk_size: 10000
//! verbose: false
//! tags:
//!   streaming_event: 65376
//!   stream_info: 65329
//!   nested_stream_info: 65328
//! ```
//!
//! - `max_events`: stop after this many events of each file (null for all)
//! - `n_threads`: number of worker threads used to decode each batch of events. Must be at
//! least 1.
//! - `chunk_size`: number of events read into memory per batch
//! - `verbose`: also log events that were skipped for structural reasons and malformed hit
//! words
//! - `tags`: the designated bank tags (0xFF60, 0xFF31, 0xFF30 by default). These have
//! changed between firmware revisions, which is why they are configurable.
//!
//! ## Event Structure
//!
//! ```text
//! streaming event (0xFF60)
//! |---- stream info bank (0xFF31) - frame number, timestamp
//! |---- ROC time slice bank
//! |    |---- stream info bank (0xFF30) - frame number, timestamp
//! |    |---- payload bank (tag = module id) - hit words
//! |    |---- ...
//! ```
//!
//! An event is only accepted if both stream info banks report the same frame number and
//! timestamp. Each hit word packs an error flag (bit 31), time in 4 ns ticks (bits 30:17),
//! channel (bits 16:13), and charge (bits 12:0).
//!
//! ## Output
//!
//! One JSON file is written per input file, `<input stem>_sro_data.json`, holding an array of
//! event records:
//!
//! ```text
//! sib_frame_number, sib_timestamp, rts_frame_number, rts_sib_timestamp,
//! payload_id[], payload_ch[], payload_timestamp[], payload_charge[]
//! ```
//!
//! The four payload arrays are index aligned; entry i of each describes one hit.
pub mod bank;
pub mod config;
pub mod consistency;
pub mod constants;
pub mod error;
pub mod event_decoder;
pub mod event_record;
pub mod evio_file;
pub mod hit;
pub mod json_writer;
pub mod process;
pub mod stream_info;
pub mod worker_status;

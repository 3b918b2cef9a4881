use serde::{Deserialize, Serialize};

use super::bank::Bank;
use super::consistency::validate;
use super::constants::*;
use super::error::Rejection;
use super::event_record::EventRecord;
use super::evio_file::RawEvent;
use super::hit::decode_payload;
use super::stream_info::StreamInfo;

/// The designated bank tags of the streaming readout format.
///
/// These have moved between firmware revisions, so they are part of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagConfig {
    pub streaming_event: u16,
    pub stream_info: u16,
    pub nested_stream_info: u16,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            streaming_event: DEFAULT_STREAMING_EVENT_TAG,
            stream_info: DEFAULT_STREAM_INFO_TAG,
            nested_stream_info: DEFAULT_NESTED_STREAM_INFO_TAG,
        }
    }
}

/// A successfully decoded event, with the count of hit words that were dropped along the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub record: EventRecord,
    pub malformed_words: usize,
}

/// EventDecoder turns one streaming event bank tree into an EventRecord.
///
/// Expected layout:
///
/// ```text
/// streaming event (root tag)
/// |---- stream info bank (frame number, timestamp)
/// |---- time slice bank
/// |    |---- nested stream info bank (frame number, timestamp)
/// |    |---- payload bank (tag = payload id), one per module
/// |    |---- ...
/// ```
///
/// Decoding reads nothing but the tree it is handed, so a single decoder can be shared by
/// any number of worker threads.
#[derive(Debug, Clone, Default)]
pub struct EventDecoder {
    tags: TagConfig,
}

impl EventDecoder {
    pub fn new(tags: TagConfig) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &TagConfig {
        &self.tags
    }

    /// Parse the raw event bytes and decode the resulting tree.
    ///
    /// A buffer that cannot be parsed is rejected as an internal error.
    pub fn decode_raw(&self, event: &RawEvent) -> Result<DecodedEvent, Rejection> {
        let root = event.root_bank()?;
        self.decode(&root)
    }

    /// Run the full decode of one event
    pub fn decode(&self, root: &Bank) -> Result<DecodedEvent, Rejection> {
        if root.tag != self.tags.streaming_event {
            return Err(Rejection::NotStreamingEvent(root.tag));
        }

        let children = root.get_children();
        require_children(children, 2)?;

        let sib_bank = &children[0];
        if sib_bank.tag != self.tags.stream_info {
            return Err(Rejection::MissingStreamInfo(sib_bank.tag));
        }
        let outer = StreamInfo::decode(sib_bank)?;

        // Time slice bank
        let slice_children = children[1].get_children();
        require_children(slice_children, 1)?;

        let rts_sib_bank = &slice_children[0];
        if rts_sib_bank.tag != self.tags.nested_stream_info {
            return Err(Rejection::MissingNestedStreamInfo(rts_sib_bank.tag));
        }
        let inner = StreamInfo::decode(rts_sib_bank)?;

        validate(&outer, &inner)?;

        let mut hits = Vec::new();
        let mut malformed_words = 0;
        for payload_bank in slice_children[1..].iter() {
            if payload_bank.is_empty() {
                continue;
            }
            let decoded = decode_payload(&payload_bank.words()?, payload_bank.tag);
            hits.extend(decoded.hits);
            malformed_words += decoded.malformed_words;
        }

        Ok(DecodedEvent {
            record: EventRecord::new(&outer, &inner, hits),
            malformed_words,
        })
    }
}

fn require_children(children: &[Bank], required: usize) -> Result<(), Rejection> {
    if children.len() < required {
        Err(Rejection::TooFewChildren {
            found: children.len(),
            required,
        })
    } else {
        Ok(())
    }
}

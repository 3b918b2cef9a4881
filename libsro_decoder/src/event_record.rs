use serde::{Deserialize, Serialize};

use super::error::RecordError;
use super::hit::Hit;
use super::stream_info::StreamInfo;

/// One accepted streaming event.
///
/// The time slice descriptor is kept alongside the event-level one even though the decoder
/// only accepts events where they agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SerializedRecord", try_from = "SerializedRecord")]
pub struct EventRecord {
    pub sib_frame_number: u32,
    pub sib_timestamp: u64,
    pub rts_frame_number: u32,
    pub rts_sib_timestamp: u64,
    pub hits: Vec<Hit>,
}

impl EventRecord {
    pub fn new(outer: &StreamInfo, inner: &StreamInfo, hits: Vec<Hit>) -> Self {
        Self {
            sib_frame_number: outer.frame_number,
            sib_timestamp: outer.timestamp,
            rts_frame_number: inner.frame_number,
            rts_sib_timestamp: inner.timestamp,
            hits,
        }
    }
}

/// Flat, column-wise layout of an EventRecord used for the JSON output. The payload arrays
/// are index aligned; entry i of each describes one hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedRecord {
    sib_frame_number: u32,
    sib_timestamp: u64,
    rts_frame_number: u32,
    rts_sib_timestamp: u64,
    payload_id: Vec<u16>,
    payload_ch: Vec<u8>,
    payload_timestamp: Vec<u16>,
    payload_charge: Vec<u16>,
}

impl From<EventRecord> for SerializedRecord {
    fn from(record: EventRecord) -> Self {
        let n_hits = record.hits.len();
        let mut flat = Self {
            sib_frame_number: record.sib_frame_number,
            sib_timestamp: record.sib_timestamp,
            rts_frame_number: record.rts_frame_number,
            rts_sib_timestamp: record.rts_sib_timestamp,
            payload_id: Vec::with_capacity(n_hits),
            payload_ch: Vec::with_capacity(n_hits),
            payload_timestamp: Vec::with_capacity(n_hits),
            payload_charge: Vec::with_capacity(n_hits),
        };
        for hit in record.hits {
            flat.payload_id.push(hit.payload_id);
            flat.payload_ch.push(hit.channel);
            flat.payload_timestamp.push(hit.time);
            flat.payload_charge.push(hit.charge);
        }
        flat
    }
}

impl TryFrom<SerializedRecord> for EventRecord {
    type Error = RecordError;

    fn try_from(flat: SerializedRecord) -> Result<Self, Self::Error> {
        let n_hits = flat.payload_id.len();
        if flat.payload_ch.len() != n_hits
            || flat.payload_timestamp.len() != n_hits
            || flat.payload_charge.len() != n_hits
        {
            return Err(RecordError::ColumnLengthMismatch {
                id: n_hits,
                ch: flat.payload_ch.len(),
                time: flat.payload_timestamp.len(),
                charge: flat.payload_charge.len(),
            });
        }
        let hits = flat
            .payload_id
            .iter()
            .zip(flat.payload_ch.iter())
            .zip(flat.payload_timestamp.iter())
            .zip(flat.payload_charge.iter())
            .map(|(((id, ch), time), charge)| Hit {
                payload_id: *id,
                channel: *ch,
                time: *time,
                charge: *charge,
            })
            .collect();
        Ok(Self {
            sib_frame_number: flat.sib_frame_number,
            sib_timestamp: flat.sib_timestamp,
            rts_frame_number: flat.rts_frame_number,
            rts_sib_timestamp: flat.rts_sib_timestamp,
            hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_field_layout() {
        let info = StreamInfo {
            frame_number: 7,
            timestamp: 100,
        };
        let hits = vec![
            Hit {
                payload_id: 15,
                channel: 1,
                time: 16,
                charge: 1,
            },
            Hit {
                payload_id: 13,
                channel: 4,
                time: 200,
                charge: 8191,
            },
        ];
        let record = EventRecord::new(&info, &info, hits);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "sib_frame_number": 7,
                "sib_timestamp": 100,
                "rts_frame_number": 7,
                "rts_sib_timestamp": 100,
                "payload_id": [15, 13],
                "payload_ch": [1, 4],
                "payload_timestamp": [16, 200],
                "payload_charge": [1, 8191],
            })
        );
        let back: EventRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_uneven_columns_rejected() {
        let value = serde_json::json!({
            "sib_frame_number": 7,
            "sib_timestamp": 100,
            "rts_frame_number": 7,
            "rts_sib_timestamp": 100,
            "payload_id": [15, 13],
            "payload_ch": [1, 4],
            "payload_timestamp": [16],
            "payload_charge": [1, 8191],
        });
        let err = serde_json::from_value::<EventRecord>(value).unwrap_err();
        assert!(err.to_string().contains("payload_timestamp 1"));
    }
}

use super::constants::*;

/// A single FADC250 channel hit decoded from one payload word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hit {
    /// Tag of the payload bank the word came from (module/slot)
    pub payload_id: u16,
    pub channel: u8,
    /// Hit time in 4 ns ticks
    pub time: u16,
    pub charge: u16,
}

/// Outcome of decoding a whole payload bank
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PayloadHits {
    pub hits: Vec<Hit>,
    pub malformed_words: usize,
}

/// A word with the error flag (bit 31) set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedWord(pub u32);

/// Unpack one hit word.
///
/// Layout, from the most significant bit: error flag (1), time (14), channel (4), charge (13).
/// Words with the error flag set are rejected.
pub fn decode_hit_word(word: u32, payload_id: u16) -> Result<Hit, MalformedWord> {
    if word & HIT_ERROR_FLAG_MASK != 0 {
        return Err(MalformedWord(word));
    }
    Ok(Hit {
        payload_id,
        channel: ((word >> HIT_CHANNEL_SHIFT) & HIT_CHANNEL_MASK) as u8,
        time: ((word >> HIT_TIME_SHIFT) & HIT_TIME_MASK) as u16,
        charge: (word & HIT_CHARGE_MASK) as u16,
    })
}

/// Pack the hit fields back into a word. Fields wider than their slot are masked.
pub fn encode_hit_word(channel: u8, time: u16, charge: u16) -> u32 {
    (((time as u32) & HIT_TIME_MASK) << HIT_TIME_SHIFT)
        | (((channel as u32) & HIT_CHANNEL_MASK) << HIT_CHANNEL_SHIFT)
        | ((charge as u32) & HIT_CHARGE_MASK)
}

/// Decode every word of a payload bank. A malformed word is logged and skipped; it never
/// stops the rest of the bank from being decoded.
pub fn decode_payload(words: &[u32], payload_id: u16) -> PayloadHits {
    let mut result = PayloadHits {
        hits: Vec::with_capacity(words.len()),
        malformed_words: 0,
    };
    for (idx, word) in words.iter().enumerate() {
        match decode_hit_word(*word, payload_id) {
            Ok(hit) => result.hits.push(hit),
            Err(MalformedWord(w)) => {
                log::debug!(
                    "Skipping malformed hit word {w:#010X} at index {idx} of payload {payload_id}"
                );
                result.malformed_words += 1;
            }
        }
    }
    result
}

use super::bank::Bank;
use super::constants::*;
use super::error::Rejection;

/// Frame number and 64-bit timestamp reported by a stream info bank.
///
/// Both the event-level stream info bank and the one nested in the time slice bank share
/// this layout: word 0 is skipped, word 1 is the frame number, words 2 and 3 are the low
/// and high halves of the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamInfo {
    pub frame_number: u32,
    pub timestamp: u64,
}

impl StreamInfo {
    /// Decode the first four payload words of a bank.
    ///
    /// The tag is not checked here; that is up to the caller.
    pub fn decode(bank: &Bank) -> Result<Self, Rejection> {
        let words = bank.words()?;
        Self::from_words(&words)
    }

    pub fn from_words(words: &[u32]) -> Result<Self, Rejection> {
        if words.len() < STREAM_INFO_WORDS {
            return Err(Rejection::InsufficientData(words.len()));
        }
        Ok(Self {
            frame_number: words[STREAM_INFO_FRAME_WORD],
            timestamp: compose_timestamp(
                words[STREAM_INFO_TS_LOW_WORD],
                words[STREAM_INFO_TS_HIGH_WORD],
            ),
        })
    }
}

/// Join the split timestamp words into a single 64-bit value
pub fn compose_timestamp(low: u32, high: u32) -> u64 {
    (low as u64) + ((high as u64) << 32)
}

/// Split a 64-bit timestamp into its (low, high) words
pub fn split_timestamp(timestamp: u64) -> (u32, u32) {
    (timestamp as u32, (timestamp >> 32) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Endian;

    #[test]
    fn test_compose_timestamp() {
        let pairs = [
            (0, 0),
            (100, 0),
            (0, 1),
            (u32::MAX, 0),
            (u32::MAX, u32::MAX),
            (0xDEAD_BEEF, 0x0123_4567),
        ];
        for (low, high) in pairs {
            let ts = compose_timestamp(low, high);
            assert_eq!(ts, low as u64 + ((high as u64) << 32));
            assert_eq!(split_timestamp(ts), (low, high));
        }
        assert_eq!(compose_timestamp(0, 1), 1u64 << 32);
    }

    #[test]
    fn test_decode_stream_info() {
        let bank = Bank::from_words(0xFF31, Endian::Big, &[0xFFFF_FFFF, 7, 100, 2]);
        let info = StreamInfo::decode(&bank).unwrap();
        assert_eq!(info.frame_number, 7);
        assert_eq!(info.timestamp, 100 + (2u64 << 32));
    }

    #[test]
    fn test_extra_words_ignored() {
        let bank = Bank::from_words(0xFF31, Endian::Little, &[0, 3, 4, 0, 99, 98]);
        let info = StreamInfo::decode(&bank).unwrap();
        assert_eq!(
            info,
            StreamInfo {
                frame_number: 3,
                timestamp: 4
            }
        );
    }

    #[test]
    fn test_insufficient_data() {
        let bank = Bank::from_words(0xFF31, Endian::Little, &[0, 7, 100]);
        assert_eq!(
            StreamInfo::decode(&bank),
            Err(Rejection::InsufficientData(3))
        );
        let empty = Bank::new(0xFF31, Endian::Little, Vec::new());
        assert_eq!(
            StreamInfo::decode(&empty),
            Err(Rejection::InsufficientData(0))
        );
    }
}

use super::error::Rejection;
use super::stream_info::StreamInfo;

/// Check that the event-level stream info (outer) and the time slice stream info (inner)
/// describe the same frame.
///
/// Equality is exact. Frame number is checked before timestamp, so an event that disagrees
/// on both is reported as a frame mismatch.
pub fn validate(outer: &StreamInfo, inner: &StreamInfo) -> Result<(), Rejection> {
    if outer.frame_number != inner.frame_number {
        return Err(Rejection::FrameMismatch {
            outer: outer.frame_number,
            inner: inner.frame_number,
        });
    }
    if outer.timestamp != inner.timestamp {
        return Err(Rejection::TimestampMismatch {
            outer: outer.timestamp,
            inner: inner.timestamp,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(frame_number: u32, timestamp: u64) -> StreamInfo {
        StreamInfo {
            frame_number,
            timestamp,
        }
    }

    #[test]
    fn test_equal_descriptors_pass() {
        assert_eq!(validate(&info(7, 100), &info(7, 100)), Ok(()));
    }

    #[test]
    fn test_frame_mismatch() {
        assert_eq!(
            validate(&info(7, 100), &info(8, 100)),
            Err(Rejection::FrameMismatch { outer: 7, inner: 8 })
        );
    }

    #[test]
    fn test_timestamp_mismatch() {
        assert_eq!(
            validate(&info(7, 100), &info(7, 101)),
            Err(Rejection::TimestampMismatch {
                outer: 100,
                inner: 101
            })
        );
    }

    #[test]
    fn test_no_tolerance_in_high_word() {
        let outer = info(1, 5);
        let inner = info(1, 5 + (1u64 << 32));
        assert!(matches!(
            validate(&outer, &inner),
            Err(Rejection::TimestampMismatch { .. })
        ));
    }

    #[test]
    fn test_frame_checked_first() {
        assert!(matches!(
            validate(&info(1, 1), &info(2, 2)),
            Err(Rejection::FrameMismatch { .. })
        ));
    }
}

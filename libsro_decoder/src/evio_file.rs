use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::bank::{Bank, Endian};
use super::constants::*;
use super::error::{BankError, EvioFileError};

/// The bytes of one event as stored in the file, tagged with where it came from.
///
/// Parsing into a Bank tree is deferred so that it can happen on a worker thread, and so a
/// malformed event only costs that event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub record_index: u32,
    /// Index of the event within the whole file
    pub event_index: u64,
    pub endian: Endian,
    pub bytes: Vec<u8>,
}

impl RawEvent {
    pub fn root_bank(&self) -> Result<Bank, BankError> {
        Bank::parse(&self.bytes, self.endian)
    }
}

/// A reader for uncompressed EVIO version 4 and version 6 files.
///
/// EVIO files are a sequence of blocks (v4) or records (v6), each holding a header and a
/// number of events. Version 6 files additionally start with a file header. Byte order is
/// taken from the magic number of each header.
#[derive(Debug)]
pub struct EvioFile {
    reader: BufReader<File>,
    path: PathBuf,
    version: u32,
    size_bytes: u64,
    record_count: u32,
    total_event_count: u64,
    pending: VecDeque<RawEvent>,
    next_record_offset: u64,
    record_index: u32,
    event_index: u64,
    is_ended: bool,
}

impl EvioFile {
    /// Open a file, determine its version, and count the records and events it holds
    pub fn open(path: &Path) -> Result<Self, EvioFileError> {
        if !path.exists() {
            return Err(EvioFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut first = [0u8; EVIO_V4_HEADER_WORDS * WORD_SIZE_BYTES];
        reader.read_exact(&mut first)?;
        let endian = detect_endian(&first)?;
        let first_words = endian.to_words(&first)?;

        let (version, first_record_offset) = if first_words[0] == EVIO_FILE_ID {
            let mut rest = [0u8; (EVIO_V6_HEADER_WORDS - EVIO_V4_HEADER_WORDS) * WORD_SIZE_BYTES];
            reader.read_exact(&mut rest)?;
            let mut words = first_words;
            words.extend(endian.to_words(&rest)?);
            let header_bytes = words[2] as u64 * WORD_SIZE_BYTES as u64;
            let index_bytes = words[4] as u64;
            let user_bytes = words[6] as u64;
            let user_pad = ((words[5] >> EVIO_V6_USER_PAD_SHIFT) & EVIO_V6_PAD_MASK) as u64;
            (
                EVIO_VERSION_6,
                header_bytes + index_bytes + user_bytes + user_pad,
            )
        } else {
            match first_words[5] & EVIO_VERSION_MASK {
                EVIO_VERSION_4 => (EVIO_VERSION_4, 0),
                EVIO_VERSION_6 => (EVIO_VERSION_6, 0),
                other => return Err(EvioFileError::UnsupportedVersion(other)),
            }
        };

        let (record_count, total_event_count) =
            Self::scan_headers(&mut reader, version, first_record_offset, size_bytes)?;
        reader.seek(SeekFrom::Start(first_record_offset))?;

        Ok(Self {
            reader,
            path: path.to_path_buf(),
            version,
            size_bytes,
            record_count,
            total_event_count,
            pending: VecDeque::new(),
            next_record_offset: first_record_offset,
            record_index: 0,
            event_index: 0,
            is_ended: false,
        })
    }

    /// Walk every block/record header, summing the event counts
    fn scan_headers(
        reader: &mut BufReader<File>,
        version: u32,
        first_record_offset: u64,
        size_bytes: u64,
    ) -> Result<(u32, u64), EvioFileError> {
        let header_words = header_words_for(version);
        let mut offset = first_record_offset;
        let mut record_count = 0;
        let mut event_count = 0;
        while offset + (header_words * WORD_SIZE_BYTES) as u64 <= size_bytes {
            reader.seek(SeekFrom::Start(offset))?;
            let header = read_header(reader, header_words)?;
            if header.length_words == 0 {
                return Err(EvioFileError::CorruptRecord {
                    record: record_count,
                    reason: String::from("record declares zero length"),
                });
            }
            event_count += header.event_count as u64;
            if record_count == 0 && header.has_dictionary(version) {
                event_count = event_count.saturating_sub(1);
            }
            record_count += 1;
            offset += header.length_words as u64 * WORD_SIZE_BYTES as u64;
            if header.is_last(version) {
                break;
            }
        }
        Ok((record_count, event_count))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    pub fn total_event_count(&self) -> u64 {
        self.total_event_count
    }

    /// Get the next event in file order.
    ///
    /// Returns a `Result<Option<RawEvent>>`. The Option is None once the file has no more events.
    pub fn next_event(&mut self) -> Result<Option<RawEvent>, EvioFileError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.is_ended {
                return Ok(None);
            }
            self.read_next_record()?;
        }
    }

    /// Read one block/record and queue its events
    fn read_next_record(&mut self) -> Result<(), EvioFileError> {
        let header_words = header_words_for(self.version);
        let header = match read_header(&mut self.reader, header_words) {
            Ok(h) => h,
            Err(EvioFileError::IOError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                self.is_ended = true;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let record = self.record_index;
        self.record_index += 1;

        let record_bytes = header.length_words as usize * WORD_SIZE_BYTES;
        let fixed_bytes = header_words * WORD_SIZE_BYTES;
        if record_bytes < fixed_bytes {
            return Err(corrupt(record, "record is shorter than its header"));
        }
        if self.next_record_offset + record_bytes as u64 > self.size_bytes {
            return Err(corrupt(record, "record runs past the end of the file"));
        }
        self.next_record_offset += record_bytes as u64;
        let mut body = vec![0u8; record_bytes - fixed_bytes];
        self.reader.read_exact(&mut body)?;

        // Offsets below are relative to the end of the fixed header
        let extra_header = (header.header_words as usize)
            .saturating_sub(header_words)
            * WORD_SIZE_BYTES;
        let n_events = header.event_count as usize;
        let mut event_lengths: Vec<usize> = Vec::new();
        let data_start = if self.version == EVIO_VERSION_6 {
            if header.compression != 0 {
                return Err(EvioFileError::UnsupportedCompression(
                    record,
                    header.compression,
                ));
            }
            let index_start = extra_header;
            let index_end = index_start + header.index_bytes as usize;
            if index_end > body.len() {
                return Err(corrupt(record, "index array runs past the record"));
            }
            if header.index_bytes as usize >= n_events * WORD_SIZE_BYTES {
                event_lengths = header
                    .endian
                    .to_words(&body[index_start..index_start + n_events * WORD_SIZE_BYTES])?
                    .into_iter()
                    .map(|l| l as usize)
                    .collect();
            }
            index_end + header.user_header_bytes as usize + header.user_header_pad as usize
        } else {
            extra_header
        };

        let mut offset = data_start;
        let skip_dictionary = record == 0 && header.has_dictionary(self.version);
        for idx in 0..n_events {
            let length = match event_lengths.get(idx) {
                Some(l) => *l,
                None => {
                    if offset + WORD_SIZE_BYTES > body.len() {
                        return Err(corrupt(record, "event header runs past the record"));
                    }
                    (header.endian.read_u32(&body[offset..]) as usize + 1) * WORD_SIZE_BYTES
                }
            };
            if offset + length > body.len() {
                return Err(corrupt(record, "event runs past the record"));
            }
            if idx == 0 && skip_dictionary {
                offset += length;
                continue;
            }
            self.pending.push_back(RawEvent {
                record_index: record,
                event_index: self.event_index,
                endian: header.endian,
                bytes: body[offset..offset + length].to_vec(),
            });
            self.event_index += 1;
            offset += length;
        }

        if header.is_last(self.version) {
            self.is_ended = true;
        }
        Ok(())
    }
}

/// The fields of a v4 block header or v6 record header that the reader uses
#[derive(Debug, Clone, Copy)]
struct RecordHeader {
    endian: Endian,
    length_words: u32,
    header_words: u32,
    event_count: u32,
    index_bytes: u32,
    bit_info: u32,
    user_header_bytes: u32,
    user_header_pad: u32,
    compression: u32,
}

impl RecordHeader {
    fn is_last(&self, version: u32) -> bool {
        // v6 trailers are header type 3 in the top nibble of the bit info word
        self.bit_info & EVIO_LAST_BLOCK_BIT != 0
            || (version == EVIO_VERSION_6
                && self.bit_info >> EVIO_V6_HEADER_TYPE_SHIFT == EVIO_V6_TRAILER_TYPE)
    }

    /// v6 keeps the dictionary in the file header, so only v4 blocks carry one as an event
    fn has_dictionary(&self, version: u32) -> bool {
        version == EVIO_VERSION_4 && self.bit_info & EVIO_V4_DICTIONARY_BIT != 0
    }
}

fn header_words_for(version: u32) -> usize {
    if version == EVIO_VERSION_6 {
        EVIO_V6_HEADER_WORDS
    } else {
        EVIO_V4_HEADER_WORDS
    }
}

fn read_header<R: Read>(
    reader: &mut R,
    header_words: usize,
) -> Result<RecordHeader, EvioFileError> {
    let mut buf = vec![0u8; header_words * WORD_SIZE_BYTES];
    reader.read_exact(&mut buf)?;
    let endian = detect_endian(&buf)?;
    let words = endian.to_words(&buf)?;
    let v6 = header_words == EVIO_V6_HEADER_WORDS;
    Ok(RecordHeader {
        endian,
        length_words: words[0],
        header_words: words[2],
        event_count: words[3],
        index_bytes: if v6 { words[4] } else { 0 },
        bit_info: words[5],
        user_header_bytes: if v6 { words[6] } else { 0 },
        user_header_pad: if v6 {
            (words[5] >> EVIO_V6_USER_PAD_SHIFT) & EVIO_V6_PAD_MASK
        } else {
            0
        },
        compression: if v6 {
            words[9] >> EVIO_V6_COMPRESSION_SHIFT
        } else {
            0
        },
    })
}

/// Byte order is whichever one makes word 7 read as the magic number
fn detect_endian(header: &[u8]) -> Result<Endian, EvioFileError> {
    let offset = EVIO_MAGIC_WORD * WORD_SIZE_BYTES;
    let magic = &header[offset..offset + WORD_SIZE_BYTES];
    if Endian::Big.read_u32(magic) == EVIO_MAGIC {
        Ok(Endian::Big)
    } else if Endian::Little.read_u32(magic) == EVIO_MAGIC {
        Ok(Endian::Little)
    } else {
        Err(EvioFileError::BadMagic(Endian::Big.read_u32(magic)))
    }
}

fn corrupt(record: u32, reason: &str) -> EvioFileError {
    EvioFileError::CorruptRecord {
        record,
        reason: String::from(reason),
    }
}

fn push_words(buf: &mut Vec<u8>, endian: Endian, words: &[u32]) {
    for word in words {
        let mut bytes = [0u8; WORD_SIZE_BYTES];
        endian.write_u32(&mut bytes, *word);
        buf.extend_from_slice(&bytes);
    }
}

/// Encode events as a single-block EVIO v4 file. Used to generate synthetic data.
pub fn encode_v4_file(events: &[Bank], endian: Endian) -> Vec<u8> {
    encode_v4_blocks(events, events.len().max(1), endian)
}

/// Encode events as an EVIO v4 file, splitting them into blocks of at most events_per_block
pub fn encode_v4_blocks(events: &[Bank], events_per_block: usize, endian: Endian) -> Vec<u8> {
    let blocks: Vec<&[Bank]> = if events.is_empty() {
        vec![events]
    } else {
        events.chunks(events_per_block.max(1)).collect()
    };
    let mut buf = Vec::new();
    for (block_idx, block) in blocks.iter().enumerate() {
        let data: Vec<u8> = block.iter().flat_map(|e| e.to_bytes()).collect();
        let length = (EVIO_V4_HEADER_WORDS + data.len() / WORD_SIZE_BYTES) as u32;
        let mut bit_info = EVIO_VERSION_4;
        if block_idx == blocks.len() - 1 {
            bit_info |= EVIO_LAST_BLOCK_BIT;
        }
        push_words(
            &mut buf,
            endian,
            &[
                length,
                block_idx as u32 + 1,
                EVIO_V4_HEADER_WORDS as u32,
                block.len() as u32,
                0,
                bit_info,
                0,
                EVIO_MAGIC,
            ],
        );
        buf.extend(data);
    }
    buf
}

/// Encode events as an EVIO v6 file holding one uncompressed record. Used to generate
/// synthetic data.
pub fn encode_v6_file(events: &[Bank], endian: Endian) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = events.iter().map(|e| e.to_bytes()).collect();
    let data_bytes: usize = encoded.iter().map(|e| e.len()).sum();
    let n_events = events.len() as u32;
    let header_words = EVIO_V6_HEADER_WORDS as u32;

    let mut buf = Vec::new();
    // File header
    push_words(
        &mut buf,
        endian,
        &[
            EVIO_FILE_ID,
            1,
            header_words,
            1,
            0,
            EVIO_VERSION_6,
            0,
            EVIO_MAGIC,
            0,
            0,
            0,
            0,
            0,
            0,
        ],
    );
    // Record header, index array, events
    let record_words = header_words + n_events + (data_bytes / WORD_SIZE_BYTES) as u32;
    push_words(
        &mut buf,
        endian,
        &[
            record_words,
            1,
            header_words,
            n_events,
            n_events * WORD_SIZE_BYTES as u32,
            EVIO_VERSION_6 | EVIO_LAST_BLOCK_BIT,
            0,
            EVIO_MAGIC,
            data_bytes as u32,
            0,
            0,
            0,
            0,
            0,
        ],
    );
    let lengths: Vec<u32> = encoded.iter().map(|e| e.len() as u32).collect();
    push_words(&mut buf, endian, &lengths);
    for event in encoded {
        buf.extend(event);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    /// Overwrite the word at word_offset in an encoded file
    fn patch_word(buf: &mut [u8], endian: Endian, word_offset: usize, value: u32) {
        let start = word_offset * WORD_SIZE_BYTES;
        endian.write_u32(&mut buf[start..start + WORD_SIZE_BYTES], value);
    }

    fn read_word(buf: &[u8], endian: Endian, word_offset: usize) -> u32 {
        endian.read_u32(&buf[word_offset * WORD_SIZE_BYTES..])
    }

    /// Word offset of the first v6 record header, past the file header
    const V6_RECORD: usize = EVIO_V6_HEADER_WORDS;

    fn sample_events(endian: Endian) -> Vec<Bank> {
        (0..3u32)
            .map(|i| Bank::from_words(0xFF60, endian, &[i, i + 1, i + 2]))
            .collect()
    }

    fn read_all(file: &mut EvioFile) -> Vec<RawEvent> {
        let mut events = Vec::new();
        while let Some(event) = file.next_event().unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_read_v6_both_endians() {
        for endian in [Endian::Little, Endian::Big] {
            let banks = sample_events(endian);
            let tmp = temp_file(&encode_v6_file(&banks, endian));
            let mut file = EvioFile::open(tmp.path()).unwrap();
            assert_eq!(file.version(), EVIO_VERSION_6);
            assert_eq!(file.record_count(), 1);
            assert_eq!(file.total_event_count(), 3);

            let events = read_all(&mut file);
            assert_eq!(events.len(), 3);
            for (idx, (event, bank)) in events.iter().zip(banks.iter()).enumerate() {
                assert_eq!(event.event_index, idx as u64);
                assert_eq!(event.endian, endian);
                assert_eq!(&event.root_bank().unwrap(), bank);
            }
        }
    }

    #[test]
    fn test_read_v4() {
        let banks = sample_events(Endian::Big);
        let tmp = temp_file(&encode_v4_file(&banks, Endian::Big));
        let mut file = EvioFile::open(tmp.path()).unwrap();
        assert_eq!(file.version(), EVIO_VERSION_4);
        assert_eq!(file.total_event_count(), 3);
        let events = read_all(&mut file);
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].root_bank().unwrap(), banks[2]);
        assert!(file.next_event().unwrap().is_none());
    }

    #[test]
    fn test_bad_magic() {
        let tmp = temp_file(&[0u8; 64]);
        assert!(matches!(
            EvioFile::open(tmp.path()),
            Err(EvioFileError::BadMagic(0))
        ));
    }

    #[test]
    fn test_missing_file() {
        let path = PathBuf::from("/this/path/does/not/exist.evio");
        assert!(matches!(
            EvioFile::open(&path),
            Err(EvioFileError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_read_v4_multiple_blocks() {
        let banks: Vec<Bank> = (0..5u32)
            .map(|i| Bank::from_words(0xFF60, Endian::Little, &[i]))
            .collect();
        let tmp = temp_file(&encode_v4_blocks(&banks, 2, Endian::Little));
        let mut file = EvioFile::open(tmp.path()).unwrap();
        assert_eq!(file.record_count(), 3);
        assert_eq!(file.total_event_count(), 5);
        let events = read_all(&mut file);
        let records: Vec<u32> = events.iter().map(|e| e.record_index).collect();
        assert_eq!(records, vec![0, 0, 1, 1, 2]);
        for (idx, (event, bank)) in events.iter().zip(banks.iter()).enumerate() {
            assert_eq!(event.event_index, idx as u64);
            assert_eq!(&event.root_bank().unwrap(), bank);
        }
    }

    #[test]
    fn test_v4_dictionary_is_skipped() {
        let endian = Endian::Big;
        let mut banks = vec![Bank::from_words(0, endian, &[0x3c78_6d6c])]; // "<xml"
        banks.extend(sample_events(endian));
        let mut buf = encode_v4_file(&banks, endian);
        let bit_info = read_word(&buf, endian, 5);
        patch_word(&mut buf, endian, 5, bit_info | EVIO_V4_DICTIONARY_BIT);
        let tmp = temp_file(&buf);

        let mut file = EvioFile::open(tmp.path()).unwrap();
        assert_eq!(file.total_event_count(), 3);
        let events = read_all(&mut file);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_index, 0);
        assert_eq!(events[0].root_bank().unwrap(), banks[1]);
    }

    #[test]
    fn test_compressed_record_unsupported() {
        let endian = Endian::Little;
        let mut buf = encode_v6_file(&sample_events(endian), endian);
        patch_word(&mut buf, endian, V6_RECORD + 9, 1 << EVIO_V6_COMPRESSION_SHIFT);
        let tmp = temp_file(&buf);
        let mut file = EvioFile::open(tmp.path()).unwrap();
        assert!(matches!(
            file.next_event(),
            Err(EvioFileError::UnsupportedCompression(0, 1))
        ));
    }

    #[test]
    fn test_event_runs_past_record() {
        let endian = Endian::Big;
        let mut buf = encode_v6_file(&sample_events(endian), endian);
        // First entry of the index array
        patch_word(&mut buf, endian, 2 * EVIO_V6_HEADER_WORDS, 4096);
        let tmp = temp_file(&buf);
        let mut file = EvioFile::open(tmp.path()).unwrap();
        match file.next_event() {
            Err(EvioFileError::CorruptRecord { record, reason }) => {
                assert_eq!(record, 0);
                assert_eq!(reason, "event runs past the record");
            }
            other => panic!("expected a corrupt record, got {other:?}"),
        }
    }

    #[test]
    fn test_index_array_runs_past_record() {
        let endian = Endian::Little;
        let mut buf = encode_v6_file(&sample_events(endian), endian);
        patch_word(&mut buf, endian, V6_RECORD + 4, 4096);
        let tmp = temp_file(&buf);
        let mut file = EvioFile::open(tmp.path()).unwrap();
        match file.next_event() {
            Err(EvioFileError::CorruptRecord { reason, .. }) => {
                assert_eq!(reason, "index array runs past the record")
            }
            other => panic!("expected a corrupt record, got {other:?}"),
        }
    }

    #[test]
    fn test_record_runs_past_end_of_file() {
        let endian = Endian::Little;
        let mut buf = encode_v6_file(&sample_events(endian), endian);
        patch_word(&mut buf, endian, V6_RECORD, u32::MAX);
        let tmp = temp_file(&buf);
        let mut file = EvioFile::open(tmp.path()).unwrap();
        match file.next_event() {
            Err(EvioFileError::CorruptRecord { reason, .. }) => {
                assert_eq!(reason, "record runs past the end of the file")
            }
            other => panic!("expected a corrupt record, got {other:?}"),
        }
    }
}

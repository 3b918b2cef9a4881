use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::constants::*;
use super::error::BankError;

/// Byte order of a bank's payload, as declared by the container it was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Read a single u32 from the first four bytes of buf
    pub fn read_u32(&self, buf: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(buf),
            Self::Big => BigEndian::read_u32(buf),
        }
    }

    /// Write a single u32 into the first four bytes of buf
    pub fn write_u32(&self, buf: &mut [u8], value: u32) {
        match self {
            Self::Little => LittleEndian::write_u32(buf, value),
            Self::Big => BigEndian::write_u32(buf, value),
        }
    }

    /// Convert a byte buffer into 32-bit words. The buffer must be a whole number of words.
    pub fn to_words(&self, buf: &[u8]) -> Result<Vec<u32>, BankError> {
        if buf.len() % WORD_SIZE_BYTES != 0 {
            return Err(BankError::MisalignedPayload(buf.len()));
        }
        let mut words = vec![0; buf.len() / WORD_SIZE_BYTES];
        match self {
            Self::Little => LittleEndian::read_u32_into(buf, &mut words),
            Self::Big => BigEndian::read_u32_into(buf, &mut words),
        }
        Ok(words)
    }
}

/// A node in the EVIO event tree.
///
/// Every bank keeps its raw payload, even when it is a container whose payload was also
/// parsed into children. Container-ness is decided by the data type from the bank header:
/// only bank-of-banks types are expanded; segment containers stay opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    pub tag: u16,
    pub data_type: u8,
    pub num: u8,
    pub endian: Endian,
    payload: Vec<u8>,
    children: Vec<Bank>,
}

impl Bank {
    /// Build a leaf bank directly. Mostly useful for tests and synthetic data.
    pub fn new(tag: u16, endian: Endian, payload: Vec<u8>) -> Self {
        Self {
            tag,
            data_type: 0x01,
            num: 0,
            endian,
            payload,
            children: Vec::new(),
        }
    }

    /// Build a leaf bank from 32-bit words, encoded in the given byte order
    pub fn from_words(tag: u16, endian: Endian, words: &[u32]) -> Self {
        let mut payload = vec![0; words.len() * WORD_SIZE_BYTES];
        for (chunk, word) in payload.chunks_exact_mut(WORD_SIZE_BYTES).zip(words) {
            endian.write_u32(chunk, *word);
        }
        Self::new(tag, endian, payload)
    }

    /// Build a bank of banks. The payload is the serialized children.
    pub fn with_children(tag: u16, endian: Endian, children: Vec<Bank>) -> Self {
        let mut payload = Vec::new();
        for child in children.iter() {
            payload.extend(child.to_bytes());
        }
        Self {
            tag,
            data_type: BANK_OF_BANKS_TYPE,
            num: 0,
            endian,
            payload,
            children,
        }
    }

    /// Parse one bank (and its child banks) from the start of buf.
    ///
    /// Trailing bytes beyond the declared bank length are ignored.
    pub fn parse(buf: &[u8], endian: Endian) -> Result<Self, BankError> {
        let (bank, _) = Self::parse_one(buf, endian, 0)?;
        Ok(bank)
    }

    /// Parse a bank from the start of buf, returning it and the number of bytes consumed.
    /// depth is the number of enclosing banks.
    fn parse_one(buf: &[u8], endian: Endian, depth: usize) -> Result<(Self, usize), BankError> {
        if depth >= MAX_BANK_DEPTH {
            return Err(BankError::TooDeep);
        }
        if buf.len() < BANK_HEADER_SIZE_BYTES {
            return Err(BankError::BufferTooSmall(buf.len()));
        }
        // Length excludes the length word itself
        let length = endian.read_u32(&buf[0..4]) as usize;
        if length == 0 {
            return Err(BankError::ZeroLength);
        }
        let available = buf.len() / WORD_SIZE_BYTES - 1;
        if length > available {
            return Err(BankError::LengthOverrun {
                declared: length,
                available,
            });
        }
        let header = endian.read_u32(&buf[4..8]);
        let tag = (header >> 16) as u16;
        let data_type = ((header >> 8) & 0x3F) as u8;
        let num = (header & 0xFF) as u8;

        let total_bytes = (length + 1) * WORD_SIZE_BYTES;
        let payload = buf[BANK_HEADER_SIZE_BYTES..total_bytes].to_vec();

        let mut children = Vec::new();
        if data_type == BANK_OF_BANKS_TYPE || data_type == ALSO_BANK_OF_BANKS_TYPE {
            let mut offset = 0;
            while offset < payload.len() {
                let (child, consumed) = Self::parse_one(&payload[offset..], endian, depth + 1)?;
                children.push(child);
                offset += consumed;
            }
        }

        Ok((
            Self {
                tag,
                data_type,
                num,
                endian,
                payload,
                children,
            },
            total_bytes,
        ))
    }

    /// Serialize the bank back into the EVIO bank format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; BANK_HEADER_SIZE_BYTES];
        let length = (self.payload.len() / WORD_SIZE_BYTES + 1) as u32;
        let header =
            ((self.tag as u32) << 16) | (((self.data_type & 0x3F) as u32) << 8) | self.num as u32;
        self.endian.write_u32(&mut bytes[0..4], length);
        self.endian.write_u32(&mut bytes[4..8], header);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    pub fn get_data(&self) -> &[u8] {
        &self.payload
    }

    pub fn get_children(&self) -> &[Bank] {
        &self.children
    }

    /// The payload as 32-bit words in the bank's declared byte order
    pub fn words(&self) -> Result<Vec<u32>, BankError> {
        self.endian.to_words(&self.payload)
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_respect_endianness() {
        let bytes = vec![0x01, 0x00, 0x00, 0x00];
        let little = Bank::new(1, Endian::Little, bytes.clone());
        let big = Bank::new(1, Endian::Big, bytes);
        assert_eq!(little.words().unwrap(), vec![1]);
        assert_eq!(big.words().unwrap(), vec![0x0100_0000]);
    }

    #[test]
    fn test_misaligned_payload() {
        let bank = Bank::new(1, Endian::Little, vec![0; 6]);
        assert_eq!(bank.words(), Err(BankError::MisalignedPayload(6)));
    }

    #[test]
    fn test_parse_nested_tree() {
        for endian in [Endian::Little, Endian::Big] {
            let leaf_a = Bank::from_words(0xFF30, endian, &[0, 7, 100, 0]);
            let leaf_b = Bank::from_words(15, endian, &[0x0020_2001]);
            let slice = Bank::with_children(2, endian, vec![leaf_a, leaf_b]);
            let root = Bank::with_children(0xFF60, endian, vec![slice]);

            let parsed = Bank::parse(&root.to_bytes(), endian).unwrap();
            assert_eq!(parsed, root);
            let slice = &parsed.get_children()[0];
            assert_eq!(slice.get_children().len(), 2);
            assert_eq!(slice.get_children()[1].tag, 15);
            assert_eq!(slice.get_children()[1].words().unwrap(), vec![0x0020_2001]);
        }
    }

    #[test]
    fn test_segment_container_stays_opaque() {
        // A bank of segments (type 0x20) keeps its payload but is not expanded
        let mut bank = Bank::from_words(0xFF31, Endian::Little, &[0x3101_0003, 7, 100, 0]);
        bank.data_type = 0x20;
        let parsed = Bank::parse(&bank.to_bytes(), Endian::Little).unwrap();
        assert!(parsed.get_children().is_empty());
        assert_eq!(parsed.words().unwrap()[1], 7);
    }

    #[test]
    fn test_parse_length_overrun() {
        let mut bytes = Bank::from_words(1, Endian::Little, &[1, 2]).to_bytes();
        bytes.truncate(12);
        assert_eq!(
            Bank::parse(&bytes, Endian::Little),
            Err(BankError::LengthOverrun {
                declared: 3,
                available: 2
            })
        );
    }

    /// n banks, each the only child of the one before. The innermost is an empty leaf.
    fn nested_bytes(n: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; n * BANK_HEADER_SIZE_BYTES];
        for (level, header) in bytes.chunks_exact_mut(BANK_HEADER_SIZE_BYTES).enumerate() {
            let length = ((n - level) * BANK_HEADER_SIZE_WORDS - 1) as u32;
            let data_type = if level == n - 1 { 0x01 } else { BANK_OF_BANKS_TYPE };
            Endian::Little.write_u32(&mut header[0..4], length);
            Endian::Little.write_u32(&mut header[4..8], (data_type as u32) << 8);
        }
        bytes
    }

    #[test]
    fn test_parse_depth_limit() {
        let parsed = Bank::parse(&nested_bytes(MAX_BANK_DEPTH), Endian::Little).unwrap();
        assert_eq!(parsed.get_children().len(), 1);
        assert_eq!(
            Bank::parse(&nested_bytes(MAX_BANK_DEPTH + 1), Endian::Little),
            Err(BankError::TooDeep)
        );
        assert_eq!(
            Bank::parse(&nested_bytes(20_000), Endian::Little),
            Err(BankError::TooDeep)
        );
    }

    #[test]
    fn test_parse_too_small() {
        assert_eq!(
            Bank::parse(&[0, 0, 0], Endian::Little),
            Err(BankError::BufferTooSmall(3))
        );
    }
}

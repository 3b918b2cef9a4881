// Designated tags of the streaming readout format. These are the defaults for TagConfig;
// firmware revisions may move them, so the decoder never reads them directly.
pub const DEFAULT_STREAMING_EVENT_TAG: u16 = 0xFF60;
pub const DEFAULT_STREAM_INFO_TAG: u16 = 0xFF31;
pub const DEFAULT_NESTED_STREAM_INFO_TAG: u16 = 0xFF30;

// Stream info bank layout, in 32-bit words
pub const STREAM_INFO_WORDS: usize = 4;
pub const STREAM_INFO_FRAME_WORD: usize = 1;
pub const STREAM_INFO_TS_LOW_WORD: usize = 2;
pub const STREAM_INFO_TS_HIGH_WORD: usize = 3;

// FADC250 hit word layout
pub const HIT_ERROR_FLAG_MASK: u32 = 0x8000_0000;
pub const HIT_TIME_SHIFT: u32 = 17;
pub const HIT_TIME_MASK: u32 = 0x3FFF;
pub const HIT_CHANNEL_SHIFT: u32 = 13;
pub const HIT_CHANNEL_MASK: u32 = 0xF;
pub const HIT_CHARGE_MASK: u32 = 0x1FFF;

// EVIO bank format
pub const WORD_SIZE_BYTES: usize = 4;
pub const BANK_HEADER_SIZE_WORDS: usize = 2;
pub const BANK_HEADER_SIZE_BYTES: usize = BANK_HEADER_SIZE_WORDS * WORD_SIZE_BYTES;
pub const BANK_OF_BANKS_TYPE: u8 = 0x0E;
pub const ALSO_BANK_OF_BANKS_TYPE: u8 = 0x10;
// Real events nest three levels deep; anything far past that is corrupt
pub const MAX_BANK_DEPTH: usize = 64;

// EVIO block/record headers
pub const EVIO_MAGIC: u32 = 0xC0DA_0100;
pub const EVIO_FILE_ID: u32 = 0x4556_494F; // "EVIO"
pub const EVIO_VERSION_4: u32 = 4;
pub const EVIO_VERSION_6: u32 = 6;
pub const EVIO_V4_HEADER_WORDS: usize = 8;
pub const EVIO_V6_HEADER_WORDS: usize = 14;
pub const EVIO_MAGIC_WORD: usize = 7;
pub const EVIO_VERSION_MASK: u32 = 0xFF;
pub const EVIO_LAST_BLOCK_BIT: u32 = 0x200;
// v4 only: the first event of the first block is the XML dictionary
pub const EVIO_V4_DICTIONARY_BIT: u32 = 0x100;
pub const EVIO_V6_COMPRESSION_SHIFT: u32 = 28;
pub const EVIO_V6_HEADER_TYPE_SHIFT: u32 = 28;
pub const EVIO_V6_TRAILER_TYPE: u32 = 3;
pub const EVIO_V6_USER_PAD_SHIFT: u32 = 20;
pub const EVIO_V6_PAD_MASK: u32 = 0x3;

// Name of the JSON output, suffixed onto the input file stem
pub const OUTPUT_SUFFIX: &str = "_sro_data.json";

// Reverse-engineered BluCon constants. None of these come from a
// published device spec; they match the deployed patch readers, and
// offsets are in hex characters unless noted otherwise.

/// A complete patch memory image is 1952 bytes (3904 hex chars).
pub const PATCH_MEMORY_HEX_LEN: usize = 3904;

/// Trend write-pointer lives in byte 26 of the memory image.
pub const TREND_POINTER_HEX_INDEX: usize = 26 * 2;

/// History write-pointer lives in byte 27.
pub const HISTORY_POINTER_HEX_INDEX: usize = 27 * 2;

/// Trend records occupy hex chars 56..248 of the image.
pub const TREND_RANGE: (usize, usize) = (56, 248);

/// History records occupy hex chars 248..632.
pub const HISTORY_RANGE: (usize, usize) = (248, 632);

/// One trend/history record is 6 bytes; the glucose pair sits in the
/// first two of them.
pub const RECORD_STRIDE_HEX: usize = 12;

/// The trend pointer advances by 16 slots once it passes the write head.
pub const TREND_POINTER_WRAP: i32 = 16;

/// The history pointer advances by 32 slots.
pub const HISTORY_POINTER_WRAP: i32 = 32;

/// History records are 15 minutes apart; trend records 1 minute.
pub const HISTORY_RECORD_MINUTES: i32 = 15;

/// Sensor elapsed-minutes bytes inside the memory image (high, low).
pub const SENSOR_TIME_BYTES: [usize; 2] = [317, 316];

/// Patch info is 11 bytes starting at hex char 4 of the response.
pub const PATCH_INFO_HEX_START: usize = 4;
pub const PATCH_INFO_HEX_LEN: usize = 22;

/// Single-block responses carry a 3-byte header (1-byte prefix plus a
/// 2-byte sub-code)...
pub const SINGLE_BLOCK_HEADER_HEX: usize = 6;

/// ...and one trailing nibble of framing garbage.
pub const SINGLE_BLOCK_TRAILER_HEX: usize = 1;

/// The device's rolling buffer wraps after 96 units.
pub const ROLLING_BUFFER_UNITS: i64 = 96;

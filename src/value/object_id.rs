use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::DbError;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

static PROCESS_UNIQUE: LazyLock<[u8; 5]> = LazyLock::new(rand::random);
static COUNTER: LazyLock<AtomicU32> = LazyLock::new(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK));

/// 12-byte identifier: big-endian creation seconds, a per-process random value, and a
/// big-endian counter. Byte order equals creation order within one process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    bytes: [u8; 12],
}

impl ObjectId {
    #[must_use]
    pub fn new() -> Self {
        let seconds = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst) & COUNTER_MASK;
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self { bytes }
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn bytes(&self) -> [u8; 12] {
        self.bytes
    }

    /// Parses the 24-character hex form.
    ///
    /// # Errors
    /// `TypeMismatch` when the text is not 24 hex digits.
    pub fn parse_str(s: &str) -> Result<Self, DbError> {
        let invalid = || DbError::TypeMismatch(format!("'{s}' is not a valid 24 digit hex ObjectId"));
        if s.len() != 24 {
            return Err(invalid());
        }
        let raw = hex::decode(s).map_err(|_| invalid())?;
        let bytes: [u8; 12] = raw.try_into().map_err(|_| invalid())?;
        Ok(Self { bytes })
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Creation time, second precision.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        let mut secs = [0u8; 4];
        secs.copy_from_slice(&self.bytes[..4]);
        Utc.timestamp_opt(i64::from(u32::from_be_bytes(secs)), 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = DbError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

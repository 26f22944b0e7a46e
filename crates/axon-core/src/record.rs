//! Portable memory records and their byte layout.
//!
//! These are the records that cross process and machine boundaries: the
//! sharing network ships encoded [`StateRecord`]s between agents, and
//! storage backends persist them. The layout is little-endian with fixed
//! field widths, so a dump written on one platform loads on any other:
//!
//! ```text
//! MemoryInfo   = discount_rate f32 | threshold f32 | state_count u32
//!              | link_count u32    | last_state i64 | last_action i64
//! StateRecord  = state i64 | original_payoff f32 | payoff f32
//!              | count u32 | action_count u32 | total_size u16
//!   ActionBlock  = action i64 | env_action_count u32
//!     LinkRecord = env_action i64 | count u32 | next_state i64
//! ```
//!
//! `total_size` covers the whole record, header included, so a reader can
//! skip a record it cannot parse without walking its variable-length tail.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::{Action, EnvAction, State};

/// Encoded size of [`MemoryInfo`].
pub const MEMORY_INFO_SIZE: usize = 32;
/// Encoded size of a [`StateRecord`] header.
pub const STATE_HEADER_SIZE: usize = 26;
/// Encoded size of an [`ActionBlock`] header.
pub const ACTION_BLOCK_SIZE: usize = 12;
/// Encoded size of a [`LinkRecord`].
pub const LINK_RECORD_SIZE: usize = 20;
/// Largest encodable record: `total_size` is a `u16`.
pub const MAX_RECORD_SIZE: usize = u16::MAX as usize;

/// Aggregate metadata describing a dumped memory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub discount_rate: f32,
    pub threshold: f32,
    pub state_count: u32,
    pub link_count: u32,
    pub last_state: State,
    pub last_action: Action,
}

impl MemoryInfo {
    /// Encodes into the fixed 32-byte layout.
    pub fn encode(&self) -> [u8; MEMORY_INFO_SIZE] {
        let mut buf = [0u8; MEMORY_INFO_SIZE];
        buf[0..4].copy_from_slice(&self.discount_rate.to_le_bytes());
        buf[4..8].copy_from_slice(&self.threshold.to_le_bytes());
        buf[8..12].copy_from_slice(&self.state_count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.link_count.to_le_bytes());
        buf[16..24].copy_from_slice(&self.last_state.to_le_bytes());
        buf[24..32].copy_from_slice(&self.last_action.to_le_bytes());
        buf
    }

    /// Decodes from the fixed layout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Truncated`] if the buffer is too short.
    pub fn decode(buf: &[u8]) -> Result<Self, CoreError> {
        let mut cursor = Cursor::new(buf);
        Ok(Self {
            discount_rate: cursor.f32()?,
            threshold: cursor.f32()?,
            state_count: cursor.u32()?,
            link_count: cursor.u32()?,
            last_state: cursor.i64()?,
            last_action: cursor.i64()?,
        })
    }
}

/// One observed environment response within an action block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub env_action: EnvAction,
    pub count: u32,
    pub next_state: State,
}

/// One action performed under a state, with its observed responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBlock {
    pub action: Action,
    pub links: Vec<LinkRecord>,
}

/// The portable form of one state and everything hanging off it.
///
/// # Example
///
/// ```
/// use axon_core::{ActionBlock, LinkRecord, StateRecord};
///
/// let record = StateRecord {
///     state: 1,
///     original_payoff: 1.0,
///     payoff: 2.8,
///     count: 3,
///     actions: vec![ActionBlock {
///         action: 5,
///         links: vec![LinkRecord { env_action: -4, count: 3, next_state: 2 }],
///     }],
/// };
///
/// let bytes = record.encode().unwrap();
/// assert_eq!(bytes.len(), record.total_size());
/// assert_eq!(StateRecord::decode(&bytes).unwrap(), record);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: State,
    pub original_payoff: f32,
    pub payoff: f32,
    pub count: u32,
    pub actions: Vec<ActionBlock>,
}

impl StateRecord {
    /// Total encoded size in bytes, header included.
    pub fn total_size(&self) -> usize {
        STATE_HEADER_SIZE
            + self
                .actions
                .iter()
                .map(|a| ACTION_BLOCK_SIZE + a.links.len() * LINK_RECORD_SIZE)
                .sum::<usize>()
    }

    /// Number of links across all action blocks.
    pub fn link_count(&self) -> u32 {
        self.actions.iter().map(|a| a.links.len() as u32).sum()
    }

    /// Encodes into the packed layout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RecordTooLarge`] when the record exceeds the
    /// 16-bit `total_size` limit.
    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        let total = self.total_size();
        if total > MAX_RECORD_SIZE {
            return Err(CoreError::RecordTooLarge {
                required: total,
                max: MAX_RECORD_SIZE,
            });
        }

        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(&self.state.to_le_bytes());
        buf.extend_from_slice(&self.original_payoff.to_le_bytes());
        buf.extend_from_slice(&self.payoff.to_le_bytes());
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf.extend_from_slice(&(self.actions.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(total as u16).to_le_bytes());
        for block in &self.actions {
            buf.extend_from_slice(&block.action.to_le_bytes());
            buf.extend_from_slice(&(block.links.len() as u32).to_le_bytes());
            for link in &block.links {
                buf.extend_from_slice(&link.env_action.to_le_bytes());
                buf.extend_from_slice(&link.count.to_le_bytes());
                buf.extend_from_slice(&link.next_state.to_le_bytes());
            }
        }
        debug_assert_eq!(buf.len(), total);
        Ok(buf)
    }

    /// Reads the declared `total_size` of the record starting at `buf`,
    /// without parsing its tail. Lets readers skip records they cannot
    /// decode.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Truncated`] if even the header is incomplete.
    pub fn declared_size(buf: &[u8]) -> Result<usize, CoreError> {
        if buf.len() < STATE_HEADER_SIZE {
            return Err(CoreError::Truncated {
                needed: STATE_HEADER_SIZE,
                available: buf.len(),
            });
        }
        let raw = [buf[STATE_HEADER_SIZE - 2], buf[STATE_HEADER_SIZE - 1]];
        Ok(u16::from_le_bytes(raw) as usize)
    }

    /// Decodes one record from the start of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Truncated`] on a short buffer and
    /// [`CoreError::SizeMismatch`] when the declared `total_size` does not
    /// match the declared action and link counts.
    pub fn decode(buf: &[u8]) -> Result<Self, CoreError> {
        let mut cursor = Cursor::new(buf);
        let state = cursor.i64()?;
        let original_payoff = cursor.f32()?;
        let payoff = cursor.f32()?;
        let count = cursor.u32()?;
        let action_count = cursor.u32()?;
        let declared = cursor.u16()? as usize;

        // Bound the declared counts against the buffer before allocating.
        let minimum = STATE_HEADER_SIZE + action_count as usize * ACTION_BLOCK_SIZE;
        if minimum > buf.len() {
            return Err(CoreError::Truncated {
                needed: minimum,
                available: buf.len(),
            });
        }

        let mut actions = Vec::with_capacity(action_count as usize);
        for _ in 0..action_count {
            let action = cursor.i64()?;
            let link_count = cursor.u32()?;
            let needed = link_count as usize * LINK_RECORD_SIZE;
            if cursor.remaining() < needed {
                return Err(CoreError::Truncated {
                    needed: cursor.pos + needed,
                    available: buf.len(),
                });
            }
            let mut links = Vec::with_capacity(link_count as usize);
            for _ in 0..link_count {
                links.push(LinkRecord {
                    env_action: cursor.i64()?,
                    count: cursor.u32()?,
                    next_state: cursor.i64()?,
                });
            }
            actions.push(ActionBlock { action, links });
        }

        let record = Self {
            state,
            original_payoff,
            payoff,
            count,
            actions,
        };
        if record.total_size() != declared {
            return Err(CoreError::SizeMismatch {
                declared,
                required: record.total_size(),
            });
        }
        Ok(record)
    }
}

/// Little-endian read cursor over a byte slice.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        if self.pos + n > self.buf.len() {
            return Err(CoreError::Truncated {
                needed: self.pos + n,
                available: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, CoreError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, CoreError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f32(&mut self) -> Result<f32, CoreError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, CoreError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> StateRecord {
        StateRecord {
            state: 2,
            original_payoff: 1.0,
            payoff: 2.8,
            count: 4,
            actions: vec![
                ActionBlock {
                    action: 3,
                    links: vec![LinkRecord {
                        env_action: -2,
                        count: 4,
                        next_state: 3,
                    }],
                },
                ActionBlock {
                    action: 7,
                    links: vec![
                        LinkRecord {
                            env_action: 0,
                            count: 1,
                            next_state: 9,
                        },
                        LinkRecord {
                            env_action: 1,
                            count: 2,
                            next_state: 10,
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn memory_info_round_trip() {
        let info = MemoryInfo {
            discount_rate: 0.9,
            threshold: 0.01,
            state_count: 12,
            link_count: 34,
            last_state: -5,
            last_action: 7,
        };
        let bytes = info.encode();
        assert_eq!(bytes.len(), MEMORY_INFO_SIZE);
        assert_eq!(MemoryInfo::decode(&bytes).unwrap(), info);
    }

    #[test]
    fn memory_info_truncated() {
        let info = MemoryInfo {
            discount_rate: 0.5,
            threshold: 0.0,
            state_count: 0,
            link_count: 0,
            last_state: 0,
            last_action: 0,
        };
        let bytes = info.encode();
        assert!(matches!(
            MemoryInfo::decode(&bytes[..MEMORY_INFO_SIZE - 1]),
            Err(CoreError::Truncated { .. })
        ));
    }

    #[test]
    fn state_record_round_trip() {
        let record = sample_record();
        let bytes = record.encode().unwrap();
        assert_eq!(bytes.len(), record.total_size());
        assert_eq!(StateRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn total_size_formula() {
        let record = sample_record();
        // header + 2 action blocks + 3 links
        let expected = STATE_HEADER_SIZE + 2 * ACTION_BLOCK_SIZE + 3 * LINK_RECORD_SIZE;
        assert_eq!(record.total_size(), expected);
        assert_eq!(record.link_count(), 3);
    }

    #[test]
    fn empty_record_is_just_the_header() {
        let record = StateRecord {
            state: 1,
            original_payoff: 0.0,
            payoff: 0.0,
            count: 0,
            actions: Vec::new(),
        };
        let bytes = record.encode().unwrap();
        assert_eq!(bytes.len(), STATE_HEADER_SIZE);
        assert_eq!(StateRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn declared_size_reads_without_parsing_tail() {
        let record = sample_record();
        let bytes = record.encode().unwrap();
        assert_eq!(
            StateRecord::declared_size(&bytes).unwrap(),
            record.total_size()
        );
        // Works even when the tail is mangled.
        let mut broken = bytes.clone();
        for byte in broken.iter_mut().skip(STATE_HEADER_SIZE) {
            *byte = 0xFF;
        }
        assert_eq!(
            StateRecord::declared_size(&broken).unwrap(),
            record.total_size()
        );
    }

    #[test]
    fn decode_rejects_truncation() {
        let bytes = sample_record().encode().unwrap();
        for cut in [0, 5, STATE_HEADER_SIZE, bytes.len() - 1] {
            assert!(matches!(
                StateRecord::decode(&bytes[..cut]),
                Err(CoreError::Truncated { .. })
            ));
        }
    }

    #[test]
    fn decode_rejects_size_mismatch() {
        let mut bytes = sample_record().encode().unwrap();
        let bogus = (sample_record().total_size() as u16 + 8).to_le_bytes();
        bytes[STATE_HEADER_SIZE - 2..STATE_HEADER_SIZE].copy_from_slice(&bogus);
        assert!(matches!(
            StateRecord::decode(&bytes),
            Err(CoreError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn records_concatenate_and_skip() {
        let a = sample_record();
        let b = StateRecord {
            state: 99,
            original_payoff: 0.5,
            payoff: 0.5,
            count: 1,
            actions: Vec::new(),
        };
        let mut stream = a.encode().unwrap();
        stream.extend(b.encode().unwrap());

        let first_len = StateRecord::declared_size(&stream).unwrap();
        let first = StateRecord::decode(&stream[..first_len]).unwrap();
        let second = StateRecord::decode(&stream[first_len..]).unwrap();
        assert_eq!(first, a);
        assert_eq!(second, b);
    }
}

//! Append-only, hash-chained status history for tasks.
//!
//! Every accepted transition produces exactly one [`HistoryEntry`]. Each entry
//! stores the SHA-256 digest of its own contents combined with the digest of
//! its predecessor, so rewriting or dropping an entry breaks the chain and is
//! detected by [`verify_chain`].

use super::{HistoryChainError, HistoryEntryId, TaskId, TaskStatus, ValidationError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Longest actor identifier, in characters, that storage accepts. Smaller
/// configured limits apply as given; larger ones are capped here.
pub const MAX_ACTOR_CHARS: usize = 255;

/// Identifier of the operator or system component that requested a change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    /// Creates a validated actor identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyActor`] for blank input and
    /// [`ValidationError::ActorTooLong`] when the trimmed value exceeds
    /// `max_chars` or [`MAX_ACTOR_CHARS`], whichever is smaller.
    pub fn new(value: impl Into<String>, max_chars: usize) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyActor);
        }
        let max = max_chars.min(MAX_ACTOR_CHARS);
        let actual = trimmed.chars().count();
        if actual > max {
            return Err(ValidationError::ActorTooLong { max, actual });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Rebuilds an actor from storage without re-validating it.
    #[must_use]
    pub const fn from_persisted(value: String) -> Self {
        Self(value)
    }

    /// Returns the actor identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text explanation attached to a transition. May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Remark(String);

impl Remark {
    /// Creates a bounded remark.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RemarkTooLong`] when the trimmed value
    /// exceeds `max_chars`.
    pub fn new(value: impl Into<String>, max_chars: usize) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        let actual = trimmed.chars().count();
        if actual > max_chars {
            return Err(ValidationError::RemarkTooLong {
                max: max_chars,
                actual,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Rebuilds a remark from storage without re-validating it.
    #[must_use]
    pub const fn from_persisted(value: String) -> Self {
        Self(value)
    }

    /// Returns the remark text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// SHA-256 digest linking a history entry to its predecessor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HistoryDigest([u8; 32]);

/// Error returned when a stored digest is not 64 hexadecimal characters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid history digest: {0}")]
pub struct ParseHistoryDigestError(pub String);

impl HistoryDigest {
    /// Returns the lowercase hexadecimal representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a lowercase or uppercase hexadecimal digest.
    ///
    /// # Errors
    ///
    /// Returns [`ParseHistoryDigestError`] unless the input is exactly 64
    /// hexadecimal digits.
    pub fn from_hex(value: &str) -> Result<Self, ParseHistoryDigestError> {
        let mut bytes = [0_u8; 32];
        hex::decode_to_slice(value, &mut bytes)
            .map_err(|_| ParseHistoryDigestError(value.to_owned()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for HistoryDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HistoryDigest({})", self.to_hex())
    }
}

impl fmt::Display for HistoryDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<HistoryDigest> for String {
    fn from(value: HistoryDigest) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for HistoryDigest {
    type Error = ParseHistoryDigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// Content of a history entry before its digest is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    /// Task the transition applies to.
    pub task_id: TaskId,
    /// Position in the task's history, starting at one.
    pub sequence: u64,
    /// Status before the transition.
    pub from: TaskStatus,
    /// Status after the transition.
    pub to: TaskStatus,
    /// Actor that requested the transition.
    pub changed_by: Actor,
    /// Caller-supplied remark.
    pub remark: Remark,
    /// Commit timestamp of the transition.
    pub recorded_at: DateTime<Utc>,
    /// Digest of the preceding entry, `None` for the first entry.
    pub previous_digest: Option<HistoryDigest>,
}

/// Immutable audit record of one accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    id: HistoryEntryId,
    task_id: TaskId,
    sequence: u64,
    from: TaskStatus,
    to: TaskStatus,
    changed_by: Actor,
    remark: Remark,
    recorded_at: DateTime<Utc>,
    previous_digest: Option<HistoryDigest>,
    digest: HistoryDigest,
}

/// Parameter object for reconstructing a persisted history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedHistoryEntry {
    /// Persisted entry identifier.
    pub id: HistoryEntryId,
    /// Entry content as originally recorded.
    pub content: NewHistoryEntry,
    /// Persisted digest.
    pub digest: HistoryDigest,
}

impl HistoryEntry {
    /// Seals new entry content by computing its digest.
    #[must_use]
    pub fn seal(content: NewHistoryEntry) -> Self {
        let digest = compute_digest(&content);
        Self::from_parts(HistoryEntryId::new(), content, digest)
    }

    /// Reconstructs an entry from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedHistoryEntry) -> Self {
        Self::from_parts(data.id, data.content, data.digest)
    }

    fn from_parts(id: HistoryEntryId, content: NewHistoryEntry, digest: HistoryDigest) -> Self {
        let NewHistoryEntry {
            task_id,
            sequence,
            from,
            to,
            changed_by,
            remark,
            recorded_at,
            previous_digest,
        } = content;
        Self {
            id,
            task_id,
            sequence,
            from,
            to,
            changed_by,
            remark,
            recorded_at,
            previous_digest,
            digest,
        }
    }

    /// Returns the entry identifier.
    #[must_use]
    pub const fn id(&self) -> HistoryEntryId {
        self.id
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the one-based position in the task's history.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the status before the transition.
    #[must_use]
    pub const fn from(&self) -> TaskStatus {
        self.from
    }

    /// Returns the status after the transition.
    #[must_use]
    pub const fn to(&self) -> TaskStatus {
        self.to
    }

    /// Returns the actor that requested the transition.
    #[must_use]
    pub const fn changed_by(&self) -> &Actor {
        &self.changed_by
    }

    /// Returns the remark.
    #[must_use]
    pub const fn remark(&self) -> &Remark {
        &self.remark
    }

    /// Returns the transition timestamp.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Returns the predecessor's digest.
    #[must_use]
    pub const fn previous_digest(&self) -> Option<HistoryDigest> {
        self.previous_digest
    }

    /// Returns this entry's digest.
    #[must_use]
    pub const fn digest(&self) -> HistoryDigest {
        self.digest
    }

    /// Returns the pagination cursor positioned at this entry.
    #[must_use]
    pub const fn cursor(&self) -> HistoryCursor {
        HistoryCursor {
            recorded_at: self.recorded_at,
            sequence: self.sequence,
        }
    }

    /// Returns `true` when the stored digest matches the entry's contents.
    #[must_use]
    pub fn has_valid_digest(&self) -> bool {
        let content = NewHistoryEntry {
            task_id: self.task_id,
            sequence: self.sequence,
            from: self.from,
            to: self.to,
            changed_by: self.changed_by.clone(),
            remark: self.remark.clone(),
            recorded_at: self.recorded_at,
            previous_digest: self.previous_digest,
        };
        compute_digest(&content) == self.digest
    }
}

fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update(bytes.len().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(bytes);
}

fn compute_digest(content: &NewHistoryEntry) -> HistoryDigest {
    let mut hasher = Sha256::new();
    let previous = content
        .previous_digest
        .map(|digest| digest.to_hex())
        .unwrap_or_default();
    hash_field(&mut hasher, previous.as_bytes());
    hash_field(&mut hasher, content.task_id.as_ref().as_bytes());
    hash_field(&mut hasher, content.sequence.to_string().as_bytes());
    hash_field(&mut hasher, content.from.as_str().as_bytes());
    hash_field(&mut hasher, content.to.as_str().as_bytes());
    hash_field(&mut hasher, content.changed_by.as_str().as_bytes());
    hash_field(&mut hasher, content.remark.as_str().as_bytes());
    let timestamp = content
        .recorded_at
        .to_rfc3339_opts(SecondsFormat::Micros, true);
    hash_field(&mut hasher, timestamp.as_bytes());
    HistoryDigest(hasher.finalize().into())
}

/// Verifies a task's complete history, oldest entry first.
///
/// Checks that sequences are contiguous from one, that each entry starts from
/// the status the previous entry ended in (or [`TaskStatus::INITIAL`]), and
/// that the digest chain is intact.
///
/// # Errors
///
/// Returns the first [`HistoryChainError`] encountered.
pub fn verify_chain(entries: &[HistoryEntry]) -> Result<(), HistoryChainError> {
    let mut expected_status = TaskStatus::INITIAL;
    let mut previous_sequence = 0_u64;
    let mut previous_digest: Option<HistoryDigest> = None;

    for entry in entries {
        if entry.sequence != previous_sequence.saturating_add(1) {
            return Err(HistoryChainError::SequenceGap {
                expected_previous: previous_sequence,
                found: entry.sequence,
            });
        }
        if entry.from != expected_status {
            return Err(HistoryChainError::BrokenStatusChain {
                sequence: entry.sequence,
                expected: expected_status,
                found: entry.from,
            });
        }
        if entry.previous_digest != previous_digest {
            return Err(HistoryChainError::BrokenLink {
                sequence: entry.sequence,
            });
        }
        if !entry.has_valid_digest() {
            return Err(HistoryChainError::DigestMismatch {
                sequence: entry.sequence,
            });
        }
        expected_status = entry.to;
        previous_sequence = entry.sequence;
        previous_digest = Some(entry.digest);
    }
    Ok(())
}

/// Position after which a history page starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HistoryCursor {
    /// Timestamp of the last entry already seen.
    pub recorded_at: DateTime<Utc>,
    /// Sequence of the last entry already seen; breaks timestamp ties.
    pub sequence: u64,
}

impl HistoryCursor {
    /// Returns `true` when `entry` lies strictly after this cursor.
    #[must_use]
    pub fn precedes(&self, entry: &HistoryEntry) -> bool {
        (entry.recorded_at, entry.sequence) > (self.recorded_at, self.sequence)
    }
}

/// Pagination request for a task's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Only entries after this cursor are returned.
    pub after: Option<HistoryCursor>,
    /// Maximum number of entries to return.
    pub limit: usize,
}

impl HistoryQuery {
    /// Default page size.
    pub const DEFAULT_LIMIT: usize = 50;

    /// Requests the first page with the default limit.
    #[must_use]
    pub const fn first_page() -> Self {
        Self {
            after: None,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    /// Requests the page following `cursor`.
    #[must_use]
    pub const fn after(cursor: HistoryCursor) -> Self {
        Self {
            after: Some(cursor),
            limit: Self::DEFAULT_LIMIT,
        }
    }

    /// Overrides the page size. Zero is treated as one.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { 1 } else { limit };
        self
    }
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self::first_page()
    }
}

/// One page of history, oldest entry first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    /// Entries in commit order.
    pub entries: Vec<HistoryEntry>,
    /// Cursor for the next page, `None` when this page is the last.
    pub next_cursor: Option<HistoryCursor>,
}

impl HistoryPage {
    /// Builds a page from up to `limit + 1` ordered entries.
    ///
    /// The extra entry, when present, only signals that another page exists.
    #[must_use]
    pub fn from_overfetched(mut entries: Vec<HistoryEntry>, limit: usize) -> Self {
        let has_more = entries.len() > limit;
        entries.truncate(limit);
        let next_cursor = if has_more {
            entries.last().map(HistoryEntry::cursor)
        } else {
            None
        };
        Self {
            entries,
            next_cursor,
        }
    }
}

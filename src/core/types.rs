use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type LearnerId = Uuid;
pub type EnrollmentId = Uuid;
pub type ContentObjectId = Uuid;
pub type PackageId = Uuid;

/// Dot-path keyed data model exchanged between content and runtime.
///
/// BTreeMap keeps snapshots in a stable element order, which makes
/// persisted records and test assertions deterministic.
pub type DataModel = BTreeMap<String, String>;

/// Composite identity of a runtime session.
///
/// One enrollment may launch many content objects; each pair owns at most
/// one live session at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub enrollment_id: EnrollmentId,
    pub content_object_id: ContentObjectId,
}

impl SessionKey {
    pub fn new(enrollment_id: EnrollmentId, content_object_id: ContentObjectId) -> Self {
        Self {
            enrollment_id,
            content_object_id,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.enrollment_id, self.content_object_id)
    }
}

/// Data-model dialect of the interoperability standard.
///
/// Fixed per content object and per session; selected once at initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialectKind {
    /// SCORM 1.2 vocabulary (`cmi.core.*`)
    #[serde(rename = "scorm_1.2")]
    Scorm12,
    /// SCORM 2004 vocabulary (`cmi.*`)
    #[serde(rename = "scorm_2004")]
    Scorm2004,
}

impl DialectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scorm12 => "scorm_1.2",
            Self::Scorm2004 => "scorm_2004",
        }
    }
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a session starts fresh or resumes from a prior commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryMode {
    #[serde(rename = "ab-initio")]
    AbInitio,
    #[serde(rename = "resume")]
    Resume,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AbInitio => "ab-initio",
            Self::Resume => "resume",
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the attempt counts toward credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreditMode {
    Credit,
    NoCredit,
}

impl CreditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::NoCredit => "no-credit",
        }
    }
}

/// Presentation mode the content was launched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    Normal,
    Browse,
    Review,
}

impl LaunchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Browse => "browse",
            Self::Review => "review",
        }
    }
}

/// Caller-side facts synthesized into read-only data-model elements.
///
/// Captured from the enrollment at initialize and fixed for the session's
/// lifetime; never stored in the writable data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchContext {
    pub learner_id: LearnerId,
    pub learner_name: String,
    pub credit: CreditMode,
    pub mode: LaunchMode,
}

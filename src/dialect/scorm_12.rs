//! SCORM 1.2 data model (`cmi.core.*` vocabulary).

use lazy_static::lazy_static;
use regex::Regex;

use super::{DialectStrategy, ensure_range, ensure_vocabulary};
use crate::core::{DialectKind, LaunchContext, Result, RuntimeError};

/// Elements content may write directly.
const WRITABLE_SCALARS: &[&str] = &[
    "cmi.core.lesson_status",
    "cmi.core.lesson_location",
    "cmi.core.score.raw",
    "cmi.core.score.min",
    "cmi.core.score.max",
    "cmi.core.exit",
    "cmi.core.session_time",
    "cmi.suspend_data",
    "cmi.comments",
];

/// Stored elements the runtime owns; writes are rejected.
const READ_ONLY_SCALARS: &[&str] = &["cmi.core.entry", "cmi.core.total_time", "cmi.launch_data"];

/// Elements synthesized from the launch context, never stored.
const SYNTHESIZED: &[&str] = &[
    "cmi.core.student_id",
    "cmi.core.student_name",
    "cmi.core.credit",
    "cmi.core.lesson_mode",
];

const LESSON_STATUS_VOCAB: &[&str] = &[
    "passed",
    "completed",
    "failed",
    "incomplete",
    "browsed",
    "not attempted",
];

const EXIT_VOCAB: &[&str] = &["time-out", "suspend", "logout", ""];

lazy_static! {
    static ref COLLECTION_ELEMENT: Regex =
        Regex::new(r"^cmi\.(objectives|interactions)\.\d+\..+$").unwrap();
}

pub struct Scorm12;

impl DialectStrategy for Scorm12 {
    fn kind(&self) -> DialectKind {
        DialectKind::Scorm12
    }

    fn entry_element(&self) -> &'static str {
        "cmi.core.entry"
    }

    fn recognizes(&self, element: &str) -> bool {
        WRITABLE_SCALARS.contains(&element)
            || READ_ONLY_SCALARS.contains(&element)
            || SYNTHESIZED.contains(&element)
            || COLLECTION_ELEMENT.is_match(element)
    }

    fn is_writable(&self, element: &str) -> bool {
        WRITABLE_SCALARS.contains(&element) || COLLECTION_ELEMENT.is_match(element)
    }

    fn synthetic_read(&self, element: &str, ctx: &LaunchContext) -> Option<String> {
        match element {
            "cmi.core.student_id" => Some(ctx.learner_id.to_string()),
            "cmi.core.student_name" => Some(ctx.learner_name.clone()),
            "cmi.core.credit" => Some(ctx.credit.as_str().to_string()),
            "cmi.core.lesson_mode" => Some(ctx.mode.as_str().to_string()),
            _ => None,
        }
    }

    fn validate(&self, element: &str, value: &str) -> Result<()> {
        if !self.recognizes(element) {
            return Err(RuntimeError::validation(element, "unknown element"));
        }
        if !self.is_writable(element) {
            return Err(RuntimeError::validation(element, "element is read-only"));
        }
        match element {
            "cmi.core.lesson_status" => ensure_vocabulary(element, value, LESSON_STATUS_VOCAB),
            "cmi.core.exit" => ensure_vocabulary(element, value, EXIT_VOCAB),
            "cmi.core.score.raw" | "cmi.core.score.min" | "cmi.core.score.max" => {
                ensure_range(element, value, 0.0, 100.0)
            }
            // Collection sub-paths and free-text scalars carry no value rule.
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CreditMode, LaunchMode};
    use uuid::Uuid;

    fn ctx() -> LaunchContext {
        LaunchContext {
            learner_id: Uuid::nil(),
            learner_name: "Ada Lovelace".to_string(),
            credit: CreditMode::Credit,
            mode: LaunchMode::Normal,
        }
    }

    #[test]
    fn test_lesson_status_vocabulary() {
        let dialect = Scorm12;
        assert!(dialect.validate("cmi.core.lesson_status", "completed").is_ok());
        assert!(dialect.validate("cmi.core.lesson_status", "not attempted").is_ok());
        assert!(dialect.validate("cmi.core.lesson_status", "done").is_err());
        assert!(dialect.validate("cmi.core.lesson_status", "COMPLETED").is_err());
    }

    #[test]
    fn test_raw_score_range() {
        let dialect = Scorm12;
        assert!(dialect.validate("cmi.core.score.raw", "0").is_ok());
        assert!(dialect.validate("cmi.core.score.raw", "100").is_ok());
        assert!(dialect.validate("cmi.core.score.raw", "87.5").is_ok());
        assert!(dialect.validate("cmi.core.score.raw", "101").is_err());
        assert!(dialect.validate("cmi.core.score.raw", "-1").is_err());
        assert!(dialect.validate("cmi.core.score.raw", "ninety").is_err());
    }

    #[test]
    fn test_unknown_element_rejected() {
        let dialect = Scorm12;
        assert!(dialect.validate("cmi.core.bogus", "x").is_err());
        // 2004-only vocabulary does not leak into 1.2
        assert!(dialect.validate("cmi.completion_status", "completed").is_err());
    }

    #[test]
    fn test_read_only_elements_rejected_on_write() {
        let dialect = Scorm12;
        assert!(dialect.validate("cmi.core.entry", "resume").is_err());
        assert!(dialect.validate("cmi.core.student_id", "hacker").is_err());
        assert!(dialect.validate("cmi.core.total_time", "0000:10:00").is_err());
    }

    #[test]
    fn test_collection_elements_accepted() {
        let dialect = Scorm12;
        assert!(dialect.validate("cmi.objectives.0.id", "obj-intro").is_ok());
        assert!(dialect.validate("cmi.interactions.12.result", "correct").is_ok());
        // Collection index must be present
        assert!(dialect.validate("cmi.objectives.id", "obj-intro").is_err());
    }

    #[test]
    fn test_synthesized_reads() {
        let dialect = Scorm12;
        let ctx = ctx();
        assert_eq!(
            dialect.synthetic_read("cmi.core.student_name", &ctx).as_deref(),
            Some("Ada Lovelace")
        );
        assert_eq!(
            dialect.synthetic_read("cmi.core.credit", &ctx).as_deref(),
            Some("credit")
        );
        assert_eq!(
            dialect.synthetic_read("cmi.core.lesson_mode", &ctx).as_deref(),
            Some("normal")
        );
        assert_eq!(dialect.synthetic_read("cmi.suspend_data", &ctx), None);
    }

    #[test]
    fn test_free_text_elements_unrestricted() {
        let dialect = Scorm12;
        assert!(dialect.validate("cmi.suspend_data", "chapter=3;answers=abba").is_ok());
        assert!(dialect.validate("cmi.core.lesson_location", "page-12").is_ok());
    }
}

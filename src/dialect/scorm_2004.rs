//! SCORM 2004 data model (4th edition `cmi.*` vocabulary).

use lazy_static::lazy_static;
use regex::Regex;

use super::{DialectStrategy, ensure_numeric, ensure_range, ensure_vocabulary};
use crate::core::{DialectKind, LaunchContext, Result, RuntimeError};

const WRITABLE_SCALARS: &[&str] = &[
    "cmi.completion_status",
    "cmi.success_status",
    "cmi.score.scaled",
    "cmi.score.raw",
    "cmi.score.min",
    "cmi.score.max",
    "cmi.progress_measure",
    "cmi.location",
    "cmi.suspend_data",
    "cmi.exit",
    "cmi.session_time",
];

const READ_ONLY_SCALARS: &[&str] = &["cmi.entry", "cmi.total_time", "cmi.launch_data"];

const SYNTHESIZED: &[&str] = &[
    "cmi.learner_id",
    "cmi.learner_name",
    "cmi.credit",
    "cmi.mode",
];

const COMPLETION_VOCAB: &[&str] = &["completed", "incomplete", "not attempted", "unknown"];

const SUCCESS_VOCAB: &[&str] = &["passed", "failed", "unknown"];

const EXIT_VOCAB: &[&str] = &["time-out", "suspend", "logout", "normal", ""];

lazy_static! {
    static ref COLLECTION_ELEMENT: Regex =
        Regex::new(r"^cmi\.(objectives|interactions)\.\d+\..+$").unwrap();
}

pub struct Scorm2004;

impl DialectStrategy for Scorm2004 {
    fn kind(&self) -> DialectKind {
        DialectKind::Scorm2004
    }

    fn entry_element(&self) -> &'static str {
        "cmi.entry"
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
            "cmi.learner_id" => Some(ctx.learner_id.to_string()),
            "cmi.learner_name" => Some(ctx.learner_name.clone()),
            "cmi.credit" => Some(ctx.credit.as_str().to_string()),
            "cmi.mode" => Some(ctx.mode.as_str().to_string()),
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
            "cmi.completion_status" => ensure_vocabulary(element, value, COMPLETION_VOCAB),
            "cmi.success_status" => ensure_vocabulary(element, value, SUCCESS_VOCAB),
            "cmi.exit" => ensure_vocabulary(element, value, EXIT_VOCAB),
            // Normalized score: -1.0..1.0
            "cmi.score.scaled" => ensure_range(element, value, -1.0, 1.0),
            "cmi.progress_measure" => ensure_range(element, value, 0.0, 1.0),
            // Raw score is unbounded in this dialect but must be numeric.
            "cmi.score.raw" | "cmi.score.min" | "cmi.score.max" => {
                ensure_numeric(element, value).map(|_| ())
            }
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
            learner_name: "Grace Hopper".to_string(),
            credit: CreditMode::NoCredit,
            mode: LaunchMode::Browse,
        }
    }

    #[test]
    fn test_completion_vocabulary() {
        let dialect = Scorm2004;
        assert!(dialect.validate("cmi.completion_status", "completed").is_ok());
        assert!(dialect.validate("cmi.completion_status", "unknown").is_ok());
        assert!(dialect.validate("cmi.completion_status", "done").is_err());
        // 1.2-only wording is not part of this vocabulary
        assert!(dialect.validate("cmi.completion_status", "browsed").is_err());
    }

    #[test]
    fn test_success_vocabulary() {
        let dialect = Scorm2004;
        assert!(dialect.validate("cmi.success_status", "passed").is_ok());
        assert!(dialect.validate("cmi.success_status", "completed").is_err());
    }

    #[test]
    fn test_scaled_score_range() {
        let dialect = Scorm2004;
        assert!(dialect.validate("cmi.score.scaled", "0.87").is_ok());
        assert!(dialect.validate("cmi.score.scaled", "-1.0").is_ok());
        assert!(dialect.validate("cmi.score.scaled", "1.0").is_ok());
        assert!(dialect.validate("cmi.score.scaled", "1.5").is_err());
        assert!(dialect.validate("cmi.score.scaled", "-1.01").is_err());
        assert!(dialect.validate("cmi.score.scaled", "high").is_err());
    }

    #[test]
    fn test_progress_measure_range() {
        let dialect = Scorm2004;
        assert!(dialect.validate("cmi.progress_measure", "0.0").is_ok());
        assert!(dialect.validate("cmi.progress_measure", "1").is_ok());
        assert!(dialect.validate("cmi.progress_measure", "1.1").is_err());
        assert!(dialect.validate("cmi.progress_measure", "-0.1").is_err());
    }

    #[test]
    fn test_raw_score_numeric_only() {
        let dialect = Scorm2004;
        assert!(dialect.validate("cmi.score.raw", "250").is_ok());
        assert!(dialect.validate("cmi.score.raw", "-10").is_ok());
        assert!(dialect.validate("cmi.score.raw", "many").is_err());
    }

    #[test]
    fn test_unknown_and_cross_dialect_elements_rejected() {
        let dialect = Scorm2004;
        assert!(dialect.validate("cmi.bogus", "x").is_err());
        assert!(dialect.validate("cmi.core.lesson_status", "completed").is_err());
    }

    #[test]
    fn test_read_only_rejected_on_write() {
        let dialect = Scorm2004;
        assert!(dialect.validate("cmi.entry", "resume").is_err());
        assert!(dialect.validate("cmi.learner_id", "someone-else").is_err());
    }

    #[test]
    fn test_collection_elements_accepted() {
        let dialect = Scorm2004;
        assert!(dialect.validate("cmi.objectives.0.success_status", "passed").is_ok());
        assert!(dialect.validate("cmi.interactions.3.learner_response", "b").is_ok());
    }

    #[test]
    fn test_synthesized_reads() {
        let dialect = Scorm2004;
        let ctx = ctx();
        assert_eq!(
            dialect.synthetic_read("cmi.learner_name", &ctx).as_deref(),
            Some("Grace Hopper")
        );
        assert_eq!(
            dialect.synthetic_read("cmi.credit", &ctx).as_deref(),
            Some("no-credit")
        );
        assert_eq!(
            dialect.synthetic_read("cmi.mode", &ctx).as_deref(),
            Some("browse")
        );
    }
}

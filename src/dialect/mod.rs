// ============================================================================
// CMI Dialects
// ============================================================================
//
// Each supported data-model dialect is a strategy object implementing a
// uniform contract: recognize/validate element writes and synthesize the
// read-only launch elements. The strategy is selected once at initialize
// and reused for the session's lifetime.
// ============================================================================

pub mod sanitize;
pub mod scorm_12;
pub mod scorm_2004;

pub use sanitize::sanitize_value;
pub use scorm_12::Scorm12;
pub use scorm_2004::Scorm2004;

use crate::core::{DialectKind, LaunchContext, Result, RuntimeError};

/// Uniform per-dialect contract for element validation and synthesized reads.
pub trait DialectStrategy: Send + Sync {
    fn kind(&self) -> DialectKind;

    /// Data-model element under which the entry indicator is stored.
    fn entry_element(&self) -> &'static str;

    /// Whether the element belongs to this dialect's vocabulary at all
    /// (scalar whitelist or indexed collection pattern).
    fn recognizes(&self, element: &str) -> bool;

    /// Whether content is allowed to write the element.
    fn is_writable(&self, element: &str) -> bool;

    /// Computed value of a synthesized read-only element, if `element` is one.
    fn synthetic_read(&self, element: &str, ctx: &LaunchContext) -> Option<String>;

    /// Validate a sanitized value against the element's constraints.
    fn validate(&self, element: &str, value: &str) -> Result<()>;
}

static SCORM_12: Scorm12 = Scorm12;
static SCORM_2004: Scorm2004 = Scorm2004;

pub fn strategy_for(kind: DialectKind) -> &'static dyn DialectStrategy {
    match kind {
        DialectKind::Scorm12 => &SCORM_12,
        DialectKind::Scorm2004 => &SCORM_2004,
    }
}

pub(crate) fn ensure_vocabulary(element: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(RuntimeError::validation(
            element,
            format!("value '{}' not in vocabulary [{}]", value, allowed.join(", ")),
        ))
    }
}

pub(crate) fn ensure_numeric(element: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        RuntimeError::validation(element, format!("value '{}' is not numeric", value))
    })
}

pub(crate) fn ensure_range(element: &str, value: &str, min: f64, max: f64) -> Result<()> {
    let number = ensure_numeric(element, value)?;
    if number < min || number > max {
        return Err(RuntimeError::validation(
            element,
            format!("value {} outside range {}..{}", number, min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection_matches_kind() {
        assert_eq!(
            strategy_for(DialectKind::Scorm12).kind(),
            DialectKind::Scorm12
        );
        assert_eq!(
            strategy_for(DialectKind::Scorm2004).kind(),
            DialectKind::Scorm2004
        );
    }

    #[test]
    fn test_range_helper_rejects_non_numeric() {
        assert!(ensure_range("cmi.score.scaled", "abc", -1.0, 1.0).is_err());
        assert!(ensure_range("cmi.score.scaled", "", -1.0, 1.0).is_err());
    }

    #[test]
    fn test_range_helper_bounds_inclusive() {
        assert!(ensure_range("e", "1.0", -1.0, 1.0).is_ok());
        assert!(ensure_range("e", "-1.0", -1.0, 1.0).is_ok());
        assert!(ensure_range("e", "1.001", -1.0, 1.0).is_err());
    }
}

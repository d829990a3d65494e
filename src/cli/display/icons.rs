//! Status icons for CLI output

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// Success icon (scenario passed)
    pub const SUCCESS: &'static str = "✓";

    /// Warning icon
    pub const WARNING: &'static str = "⚠";

    /// Error icon (scenario failed)
    pub const ERROR: &'static str = "✗";

    /// Pending icon (scenario running)
    pub const PENDING: &'static str = "⏳";

    /// Get status icon based on a scenario outcome
    pub fn get_outcome_icon(passed: bool) -> &'static str {
        if passed {
            Self::SUCCESS
        } else {
            Self::ERROR
        }
    }

    /// Get status text based on a scenario outcome
    pub fn get_outcome_text(passed: bool) -> &'static str {
        if passed {
            "PASS"
        } else {
            "FAIL"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_outcome_icon() {
        assert_eq!(StatusIcon::get_outcome_icon(true), StatusIcon::SUCCESS);
        assert_eq!(StatusIcon::get_outcome_icon(false), StatusIcon::ERROR);
    }

    #[test]
    fn test_get_outcome_text() {
        assert_eq!(StatusIcon::get_outcome_text(true), "PASS");
        assert_eq!(StatusIcon::get_outcome_text(false), "FAIL");
    }
}

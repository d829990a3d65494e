//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use std::time::Duration;

/// Outcome of one executed scenario, for the summary display
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub name: String,
    pub kind: &'static str,
    pub passed: bool,
    pub duration: Duration,
    pub message: String,
}

impl ScenarioOutcome {
    pub fn pass(name: impl Into<String>, kind: &'static str, duration: Duration) -> Self {
        Self {
            name: name.into(),
            kind,
            passed: true,
            duration,
            message: String::new(),
        }
    }

    pub fn fail(
        name: impl Into<String>,
        kind: &'static str,
        duration: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            passed: false,
            duration,
            message: message.into(),
        }
    }
}

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    /// Render the catalog listing as a formatted table
    pub fn render_catalog(&self, scenarios: &[(String, &'static str)]) -> String {
        if scenarios.is_empty() {
            return "No scenarios in the catalog".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("SCENARIO").set_alignment(CellAlignment::Left),
                Cell::new("KIND").set_alignment(CellAlignment::Left),
            ]);

        for (name, kind) in scenarios {
            table.add_row(vec![Cell::new(name), Cell::new(kind)]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ Scenario Catalog {} ─╮\n",
            format!("[{} scenarios]", scenarios.len())
                .bright_black()
                .to_string()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Render executed-suite outcomes as a formatted table
    pub fn render_outcomes(&self, outcomes: &[ScenarioOutcome]) -> String {
        if outcomes.is_empty() {
            return "No scenarios were run".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("SCENARIO").set_alignment(CellAlignment::Left),
                Cell::new("KIND").set_alignment(CellAlignment::Left),
                Cell::new("RESULT").set_alignment(CellAlignment::Center),
                Cell::new("DURATION").set_alignment(CellAlignment::Right),
                Cell::new("DETAIL").set_alignment(CellAlignment::Left),
            ]);

        for outcome in outcomes {
            let icon = StatusIcon::get_outcome_icon(outcome.passed);
            let text = StatusIcon::get_outcome_text(outcome.passed);
            let color = self.theme.get_outcome_color(outcome.passed);

            table.add_row(vec![
                Cell::new(&outcome.name),
                Cell::new(outcome.kind),
                Cell::new(format!("{} {}", icon, text)).fg(color),
                Cell::new(format_duration(outcome.duration)),
                Cell::new(truncate(&outcome.message, 72)),
            ]);
        }

        let passed = outcomes.iter().filter(|o| o.passed).count();
        let mut output = String::new();
        output.push_str(&format!(
            "╭─ Suite Results {} ─╮\n",
            format!("[{}/{} passed]", passed, outcomes.len())
                .bright_black()
                .to_string()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "Legend: {} Passed  {} Failed\n",
            StatusIcon::SUCCESS.green(),
            StatusIcon::ERROR.red()
        ));

        output
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

fn truncate(message: &str, limit: usize) -> String {
    let line = message.lines().next().unwrap_or_default();
    if line.chars().count() <= limit {
        line.to_string()
    } else {
        let prefix: String = line.chars().take(limit).collect();
        format!("{}…", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_outcomes() {
        let renderer = TableRenderer::new();
        let output = renderer.render_outcomes(&[]);
        assert!(output.contains("No scenarios were run"));
    }

    #[test]
    fn test_render_outcomes() {
        let renderer = TableRenderer::new();
        let outcomes = vec![
            ScenarioOutcome::pass("5iops SC POD Test", "pod", Duration::from_secs(95)),
            ScenarioOutcome::fail(
                "Cordon and Drain Node",
                "statefulset",
                Duration::from_secs(30),
                "node 'worker-2' still hosts evictable pods after 600s",
            ),
        ];

        let output = renderer.render_outcomes(&outcomes);
        assert!(output.contains("5iops SC POD Test"));
        assert!(output.contains("1m35s"));
        assert!(output.contains("PASS"));
        assert!(output.contains("FAIL"));
        assert!(output.contains("1/2 passed"));
    }

    #[test]
    fn test_render_catalog() {
        let renderer = TableRenderer::new();
        let output = renderer.render_catalog(&[("GP SC POD Test".to_string(), "pod")]);
        assert!(output.contains("GP SC POD Test"));
        assert!(output.contains("[1 scenarios]"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
    }
}

//! Three-line digest of a situation report for compact panels.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportDigest {
    pub alert: Option<String>,
    pub analysis: Option<String>,
    pub recommendation: Option<String>,
}

impl ReportDigest {
    /// Split a report into its first three sentences.
    ///
    /// Sentences are separated by `". "`; each kept line ends with a period.
    /// Missing sentences are `None`.
    pub fn from_report(report: &str) -> Self {
        let mut lines = report
            .split(". ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.ends_with('.') {
                    s.to_string()
                } else {
                    format!("{s}.")
                }
            });
        Self {
            alert: lines.next(),
            analysis: lines.next(),
            recommendation: lines.next(),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        [&self.alert, &self.analysis, &self.recommendation]
            .into_iter()
            .filter_map(|line| line.as_deref())
    }
}

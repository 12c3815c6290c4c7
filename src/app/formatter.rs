use crate::app::models::{ConversionOutcome, LanguageSource, OutcomeStatus, RunReport};

pub struct OutputGenerator;

impl OutputGenerator {
    /// One line per file, in processing order.
    pub fn generate_outcomes(outcomes: &[ConversionOutcome]) -> String {
        let width = outcomes
            .iter()
            .map(|o| o.relative_path.chars().count())
            .max()
            .unwrap_or(0);

        let mut output = String::new();
        for outcome in outcomes {
            let detail = match &outcome.status {
                OutcomeStatus::Success => Self::success_detail(outcome),
                OutcomeStatus::Skipped(reason) => format!("skipped  {}", reason),
                OutcomeStatus::Failed(reason) => format!("FAILED   {}", reason),
            };
            output.push_str(&format!(
                "    {:<width$}  {}\n",
                outcome.relative_path,
                detail,
                width = width
            ));
        }

        output.trim_end().to_string()
    }

    fn success_detail(outcome: &ConversionOutcome) -> String {
        let Some(language) = &outcome.language else {
            return "copied".to_string();
        };
        let source = match language.source {
            LanguageSource::Detected => "detected",
            LanguageSource::Defaulted => "default",
        };
        format!(
            "html     {} {} ({}), {} link(s) rewritten",
            language.tag, language.direction, source, outcome.links_rewritten
        )
    }

    pub fn generate_totals(report: &RunReport) -> String {
        let mut totals = format!(
            "{} succeeded, {} skipped, {} failed",
            report.succeeded(),
            report.skipped(),
            report.failed()
        );
        if report.aborted {
            totals.push_str(" (stopped early)");
        }
        totals
    }

    pub fn format_full_output(outcomes: &str, totals: &str) -> String {
        if outcomes.is_empty() {
            return format!("No files to convert.\n{}", totals);
        }
        format!("{}\n\n{}", outcomes, totals)
    }
}

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Text flow direction written into the `dir` variable of every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }

    /// Case-insensitive parse of `"ltr"` / `"rtl"`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ltr" => Some(Direction::Ltr),
            "rtl" => Some(Direction::Rtl),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the final configuration after merging the config file and CLI args.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub default_language_tag: String,
    pub default_direction: Direction,
    pub stylesheet_path: Option<PathBuf>,
    pub extra_engine_args: Vec<String>,
    pub engine_path: Option<PathBuf>,
    pub engine_timeout: Duration,
    pub fail_fast: bool,
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_language_tag: "en".to_string(),
            default_direction: Direction::Ltr,
            stylesheet_path: None,
            extra_engine_args: Vec::new(),
            engine_path: None,
            engine_timeout: Duration::from_secs(120),
            fail_fast: false,
            exclude: Vec::new(),
            respect_gitignore: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Markdown,
    Other,
}

/// Represents a single file discovered during the scan.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub relative_path: String,
    pub kind: FileKind,
}

/// Whether a language came from the detector or from the configured fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSource {
    Detected,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLanguage {
    pub tag: String,
    pub direction: Direction,
    pub source: LanguageSource,
}

/// Everything the engine needs to render one Markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDirectives {
    pub language_tag: String,
    pub direction: Direction,
    pub page_title: String,
    pub stylesheet_absolute_path: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub relative_path: String,
    pub status: OutcomeStatus,
    /// Only set for rendered Markdown files.
    pub language: Option<ResolvedLanguage>,
    pub links_rewritten: usize,
}

impl ConversionOutcome {
    pub fn success(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            status: OutcomeStatus::Success,
            language: None,
            links_rewritten: 0,
        }
    }

    pub fn skipped(relative_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Skipped(reason.into()),
            ..Self::success(relative_path)
        }
    }

    pub fn failed(relative_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed(reason.into()),
            ..Self::success(relative_path)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }
}

/// Per-file outcomes of one run, in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<ConversionOutcome>,
    /// Set when `fail_fast` stopped the run before every file was visited.
    pub aborted: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Success))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed(_)))
    }

    pub fn is_complete_success(&self) -> bool {
        !self.aborted && self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

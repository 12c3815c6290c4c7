use crate::app::engine::ConversionEngine;
use crate::app::error::{FileError, RunError};
use crate::app::language::{self, LanguageDetector, WhatlangDetector};
use crate::app::links::rewrite_links;
use crate::app::models::{
    ConversionOutcome, FileEntry, FileKind, RenderDirectives, ResolvedLanguage, RunReport,
    RuntimeConfig,
};
use crate::app::paths::{display_relative, ensure_parent_dir, map_output_path};
use crate::app::scanner::Scanner;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Convert `input_root` into `output_root` with the default language detector.
pub fn run<E: ConversionEngine + ?Sized>(
    input_root: &Path,
    output_root: &Path,
    config: &RuntimeConfig,
    engine: &E,
) -> Result<RunReport> {
    Orchestrator::new(config, engine, &WhatlangDetector).run(input_root, output_root)
}

pub struct Orchestrator<'a, E: ?Sized, D: ?Sized> {
    config: &'a RuntimeConfig,
    engine: &'a E,
    detector: &'a D,
}

impl<'a, E, D> Orchestrator<'a, E, D>
where
    E: ConversionEngine + ?Sized,
    D: LanguageDetector + ?Sized,
{
    pub fn new(config: &'a RuntimeConfig, engine: &'a E, detector: &'a D) -> Self {
        Self {
            config,
            engine,
            detector,
        }
    }

    /// A failed file is recorded and the run moves on, unless `fail_fast` is set.
    pub fn run(&self, input_root: &Path, output_root: &Path) -> Result<RunReport> {
        if !input_root.is_dir() {
            return Err(RunError::InputNotFound(input_root.to_path_buf()).into());
        }
        fs::create_dir_all(output_root)
            .map_err(|e| RunError::OutputRoot(output_root.to_path_buf(), e))?;

        let input_root = input_root
            .canonicalize()
            .map_err(|_| RunError::InputNotFound(input_root.to_path_buf()))?;
        let output_root = output_root
            .canonicalize()
            .map_err(|e| RunError::OutputRoot(output_root.to_path_buf(), e))?;
        if output_root == input_root {
            return Err(RunError::SameRoot(output_root).into());
        }

        let mut scanner = Scanner::new(input_root.clone(), self.config)?;
        if output_root.starts_with(&input_root) {
            scanner = scanner.skip_dir(&output_root);
        }
        let entries = scanner.scan();
        log::info!(
            "Found {} file(s) under {}",
            entries.len(),
            input_root.display()
        );

        let mut report = RunReport::default();
        // Output path -> relative path of the input that produced it.
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();
        // Only reachable when the input folder sits inside the output folder.
        let inputs: HashSet<&Path> = entries.iter().map(|e| e.path.as_path()).collect();

        for entry in &entries {
            let output = map_output_path(&input_root, &output_root, &entry.path);

            if inputs.contains(output.as_path()) {
                let target = display_relative(&input_root, &output);
                log::warn!(
                    "Skipping {}: output would overwrite input {}",
                    entry.relative_path,
                    target
                );
                report.outcomes.push(ConversionOutcome::skipped(
                    &entry.relative_path,
                    format!("output path would overwrite input {target}"),
                ));
                continue;
            }

            if let Some(first) = claimed.get(&output) {
                log::warn!(
                    "Skipping {}: {} already writes {}",
                    entry.relative_path,
                    first,
                    display_relative(&output_root, &output)
                );
                report.outcomes.push(ConversionOutcome::skipped(
                    &entry.relative_path,
                    format!("output path collides with {first}"),
                ));
                continue;
            }
            claimed.insert(output.clone(), entry.relative_path.clone());

            let outcome = match self.process(entry, &output) {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::error!("{}", err);
                    ConversionOutcome::failed(&entry.relative_path, err.to_string())
                }
            };

            let failed = outcome.is_failed();
            report.outcomes.push(outcome);
            if failed && self.config.fail_fast {
                log::error!("Stopping after first failure (fail-fast)");
                report.aborted = true;
                break;
            }
        }

        Ok(report)
    }

    fn process(&self, entry: &FileEntry, output: &Path) -> Result<ConversionOutcome, FileError> {
        ensure_parent_dir(output).map_err(|source| FileError::Write {
            path: entry.relative_path.clone(),
            source,
        })?;

        match entry.kind {
            FileKind::Markdown => self.convert_markdown(entry, output),
            FileKind::Other => {
                fs::copy(&entry.path, output).map_err(|source| FileError::Write {
                    path: entry.relative_path.clone(),
                    source,
                })?;
                log::debug!("Copied {}", entry.relative_path);
                Ok(ConversionOutcome::success(&entry.relative_path))
            }
        }
    }

    fn convert_markdown(
        &self,
        entry: &FileEntry,
        output: &Path,
    ) -> Result<ConversionOutcome, FileError> {
        let read_err = |source: std::io::Error| FileError::Read {
            path: entry.relative_path.clone(),
            source,
        };

        let content = fs::read_to_string(&entry.path).map_err(read_err)?;
        let resolved = language::resolve(&content, self.config, self.detector);
        let directives = self.directives(entry, &resolved);

        self.engine
            .convert(&entry.path, output, &directives)
            .map_err(|source| FileError::Engine {
                path: entry.relative_path.clone(),
                source,
            })?;

        let html = fs::read_to_string(output).map_err(read_err)?;
        let (rewritten, links_rewritten) = rewrite_links(&html);
        if links_rewritten > 0 {
            fs::write(output, rewritten.as_bytes()).map_err(|source| FileError::Write {
                path: entry.relative_path.clone(),
                source,
            })?;
        }

        log::info!(
            "Converted {} [{} {:?}, {} link(s) rewritten]",
            entry.relative_path,
            resolved.tag,
            resolved.source,
            links_rewritten
        );

        Ok(ConversionOutcome {
            language: Some(resolved),
            links_rewritten,
            ..ConversionOutcome::success(&entry.relative_path)
        })
    }

    fn directives(&self, entry: &FileEntry, resolved: &ResolvedLanguage) -> RenderDirectives {
        let stylesheet_absolute_path = self
            .config
            .stylesheet_path
            .as_ref()
            .filter(|p| p.is_file())
            .and_then(|p| p.canonicalize().ok());

        RenderDirectives {
            language_tag: resolved.tag.clone(),
            direction: resolved.direction,
            page_title: entry
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            stylesheet_absolute_path,
            extra_args: self.config.extra_engine_args.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::EngineError;
    use crate::app::models::{Direction, LanguageSource, OutcomeStatus};
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Writes canned HTML and records what it was asked to do.
    struct FakeEngine {
        html: String,
        fail_on: Vec<&'static str>,
        calls: RefCell<Vec<(PathBuf, RenderDirectives)>>,
    }

    impl FakeEngine {
        fn new(html: &str) -> Self {
            Self {
                html: html.to_string(),
                fail_on: Vec::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing_on(mut self, name: &'static str) -> Self {
            self.fail_on.push(name);
            self
        }
    }

    impl ConversionEngine for FakeEngine {
        fn convert(
            &self,
            input: &Path,
            output: &Path,
            directives: &RenderDirectives,
        ) -> Result<(), EngineError> {
            self.calls
                .borrow_mut()
                .push((input.to_path_buf(), directives.clone()));
            let name = input.file_name().unwrap().to_string_lossy();
            if self.fail_on.iter().any(|f| *f == name) {
                return Err(EngineError::Failed {
                    exit_code: Some(1),
                    stderr: "syntax error".into(),
                    stdout: String::new(),
                });
            }
            fs::write(output, &self.html).map_err(EngineError::Io)
        }
    }

    struct Fixed(&'static str);

    impl LanguageDetector for Fixed {
        fn detect(&self, _text: &str) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    const LONG_TEXT: &str = "This paragraph is long enough for detection.";

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        (dir, input, output)
    }

    fn statuses(report: &RunReport) -> Vec<(&str, &OutcomeStatus)> {
        report
            .outcomes
            .iter()
            .map(|o| (o.relative_path.as_str(), &o.status))
            .collect()
    }

    #[test]
    fn empty_input_gives_empty_report() {
        let (_dir, input, output) = setup();
        let engine = FakeEngine::new("");
        let report = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();
        assert!(report.outcomes.is_empty());
        assert!(report.is_complete_success());
        assert!(output.is_dir());
    }

    #[test]
    fn missing_input_is_fatal() {
        let (_dir, input, output) = setup();
        let engine = FakeEngine::new("");
        let err = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("eng"))
            .run(&input.join("nope"), &output)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::InputNotFound(_))
        ));
    }

    #[test]
    fn markdown_is_rendered_and_links_rewritten() {
        let (_dir, input, output) = setup();
        fs::create_dir_all(input.join("guide")).unwrap();
        fs::write(input.join("guide/Intro.MD"), LONG_TEXT).unwrap();

        let engine = FakeEngine::new(r#"<a href="setup.md#install">setup</a>"#);
        let report = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("heb"))
            .run(&input, &output)
            .unwrap();

        assert_eq!(statuses(&report), [("guide/Intro.MD", &OutcomeStatus::Success)]);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.links_rewritten, 1);
        let language = outcome.language.as_ref().unwrap();
        assert_eq!(language.tag, "he");
        assert_eq!(language.source, LanguageSource::Detected);

        let html = fs::read_to_string(output.join("guide/Intro.html")).unwrap();
        assert_eq!(html, r#"<a href="setup.html#install">setup</a>"#);

        let calls = engine.calls.borrow();
        let (_, directives) = &calls[0];
        assert_eq!(directives.direction, Direction::Rtl);
        assert_eq!(directives.language_tag, "he");
        assert_eq!(directives.page_title, "Intro");
    }

    #[test]
    fn short_markdown_uses_configured_defaults() {
        let (_dir, input, output) = setup();
        fs::write(input.join("tiny.md"), "# Hi").unwrap();

        let config = RuntimeConfig {
            default_language_tag: "fa".into(),
            default_direction: Direction::Rtl,
            ..RuntimeConfig::default()
        };
        let engine = FakeEngine::new("<p>hi</p>");
        Orchestrator::new(&config, &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();

        let calls = engine.calls.borrow();
        assert_eq!(calls[0].1.language_tag, "fa");
        assert_eq!(calls[0].1.direction, Direction::Rtl);
    }

    #[test]
    fn other_files_are_copied_verbatim() {
        let (_dir, input, output) = setup();
        let bytes: Vec<u8> = (0..=255).collect();
        fs::create_dir_all(input.join("img")).unwrap();
        fs::write(input.join("img/photo.png"), &bytes).unwrap();

        let engine = FakeEngine::new("");
        let report = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();

        assert_eq!(statuses(&report), [("img/photo.png", &OutcomeStatus::Success)]);
        assert_eq!(fs::read(output.join("img/photo.png")).unwrap(), bytes);
        assert!(engine.calls.borrow().is_empty());
    }

    #[test]
    fn one_failure_does_not_stop_the_others() {
        let (_dir, input, output) = setup();
        for name in ["a.md", "b.md", "c.md"] {
            fs::write(input.join(name), LONG_TEXT).unwrap();
        }

        let engine = FakeEngine::new("<p>ok</p>").failing_on("b.md");
        let report = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.aborted);
        assert!(!report.is_complete_success());

        match &report.outcomes[1].status {
            OutcomeStatus::Failed(reason) => {
                assert!(reason.starts_with("b.md:"), "{reason}");
                assert!(reason.contains("syntax error"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(output.join("a.html").is_file());
        assert!(output.join("c.html").is_file());
    }

    #[test]
    fn fail_fast_stops_after_first_failure() {
        let (_dir, input, output) = setup();
        for name in ["a.md", "b.md", "c.md"] {
            fs::write(input.join(name), LONG_TEXT).unwrap();
        }

        let config = RuntimeConfig {
            fail_fast: true,
            ..RuntimeConfig::default()
        };
        let engine = FakeEngine::new("<p>ok</p>").failing_on("b.md");
        let report = Orchestrator::new(&config, &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.aborted);
        assert!(!output.join("c.html").exists());
    }

    #[test]
    fn unrewritten_output_is_left_as_rendered() {
        let (_dir, input, output) = setup();
        fs::write(input.join("page.md"), LONG_TEXT).unwrap();

        let engine = FakeEngine::new("<a href=\"https://example.com/x.md\">x</a>");
        let report = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();

        assert_eq!(report.outcomes[0].links_rewritten, 0);
        assert_eq!(
            fs::read_to_string(output.join("page.html")).unwrap(),
            "<a href=\"https://example.com/x.md\">x</a>"
        );
    }

    #[test]
    fn colliding_output_is_skipped() {
        let (_dir, input, output) = setup();
        fs::write(input.join("a.html"), "hand written").unwrap();
        fs::write(input.join("a.md"), LONG_TEXT).unwrap();

        let engine = FakeEngine::new("<p>rendered</p>");
        let report = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();

        assert_eq!(report.outcomes[0].relative_path, "a.html");
        assert_eq!(report.outcomes[0].status, OutcomeStatus::Success);
        assert!(matches!(
            &report.outcomes[1].status,
            OutcomeStatus::Skipped(reason) if reason.contains("a.html")
        ));
        assert_eq!(fs::read_to_string(output.join("a.html")).unwrap(), "hand written");
        assert!(report.is_complete_success());
    }

    #[test]
    fn stylesheet_only_when_present_and_extra_args_forwarded() {
        let (dir, input, output) = setup();
        fs::write(input.join("page.md"), LONG_TEXT).unwrap();
        let css = dir.path().join("site.css");

        let config = RuntimeConfig {
            stylesheet_path: Some(css.clone()),
            extra_engine_args: vec!["--toc".into()],
            ..RuntimeConfig::default()
        };
        let engine = FakeEngine::new("<p/>");
        Orchestrator::new(&config, &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();
        assert_eq!(engine.calls.borrow()[0].1.stylesheet_absolute_path, None);
        assert_eq!(engine.calls.borrow()[0].1.extra_args, ["--toc"]);

        fs::write(&css, "body {}").unwrap();
        let engine = FakeEngine::new("<p/>");
        Orchestrator::new(&config, &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();
        assert_eq!(
            engine.calls.borrow()[0].1.stylesheet_absolute_path,
            Some(css.canonicalize().unwrap())
        );
    }

    #[test]
    fn nested_output_folder_is_not_reprocessed() {
        let (_dir, input, _) = setup();
        fs::write(input.join("index.md"), LONG_TEXT).unwrap();
        let output = input.join("site");

        let config = RuntimeConfig::default();
        let detector = Fixed("eng");
        let engine = FakeEngine::new("<p/>");
        let orchestrator = Orchestrator::new(&config, &engine, &detector);
        orchestrator.run(&input, &output).unwrap();
        let second = orchestrator.run(&input, &output).unwrap();

        assert_eq!(statuses(&second), [("index.md", &OutcomeStatus::Success)]);
    }

    #[test]
    fn same_input_and_output_folder_is_refused() {
        let (_dir, input, _) = setup();
        fs::write(input.join("logo.png"), [1u8, 2, 3, 4]).unwrap();

        let engine = FakeEngine::new("<p/>");
        let err = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("eng"))
            .run(&input, &input)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::SameRoot(_))
        ));
        assert_eq!(fs::read(input.join("logo.png")).unwrap(), [1u8, 2, 3, 4]);
    }

    #[test]
    fn input_nested_in_output_never_overwrites_sources() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("site");
        let input = output.join("docs");
        fs::create_dir_all(input.join("docs")).unwrap();
        fs::write(input.join("logo.png"), "original").unwrap();
        fs::write(input.join("docs/logo.png"), "nested").unwrap();

        let engine = FakeEngine::new("<p/>");
        let report = Orchestrator::new(&RuntimeConfig::default(), &engine, &Fixed("eng"))
            .run(&input, &output)
            .unwrap();

        assert!(matches!(
            &report.outcomes[0].status,
            OutcomeStatus::Skipped(reason) if reason.contains("logo.png")
        ));
        assert_eq!(report.outcomes[0].relative_path, "docs/logo.png");
        assert_eq!(fs::read_to_string(input.join("logo.png")).unwrap(), "original");
        assert_eq!(fs::read_to_string(output.join("logo.png")).unwrap(), "original");
    }
}

use crate::app::error::{EngineError, RunError};
use crate::app::models::RenderDirectives;
use pathdiff::diff_paths;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const DEFAULT_ENGINE: &str = "pandoc";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Renders one Markdown file into a standalone HTML page at `output`.
pub trait ConversionEngine {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        directives: &RenderDirectives,
    ) -> Result<(), EngineError>;
}

/// Runs `pandoc` (or a compatible binary) as a subprocess.
#[derive(Debug, Clone)]
pub struct PandocEngine {
    program: PathBuf,
    timeout: Duration,
}

impl PandocEngine {
    /// Resolve the engine binary on `PATH`, or at the configured location.
    pub fn locate(engine_path: Option<&Path>, timeout: Duration) -> Result<Self, RunError> {
        let requested = engine_path.unwrap_or(Path::new(DEFAULT_ENGINE));
        let program = which::which(requested)
            .map_err(|_| RunError::EngineUnavailable(requested.display().to_string()))?;
        Ok(Self::with_program(program, timeout))
    }

    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// First line of `--version`, if the binary answers.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
    }

    /// Built-in directives first, then user arguments so they can override them.
    pub fn build_args(input: &Path, output: &Path, directives: &RenderDirectives) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input.into(),
            "-f".into(),
            "markdown".into(),
            "-t".into(),
            "html5".into(),
            "-s".into(),
            "-o".into(),
            output.into(),
            "--metadata".into(),
            format!("lang={}", directives.language_tag).into(),
            "--metadata".into(),
            format!("pagetitle={}", directives.page_title).into(),
            "-V".into(),
            format!("dir={}", directives.direction).into(),
        ];

        if let Some(stylesheet) = &directives.stylesheet_absolute_path {
            args.push("-c".into());
            args.push(stylesheet_href(stylesheet, output).into());
        }

        args.extend(directives.extra_args.iter().map(OsString::from));
        args
    }
}

impl ConversionEngine for PandocEngine {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        directives: &RenderDirectives,
    ) -> Result<(), EngineError> {
        let args = Self::build_args(input, output, directives);
        log::debug!("{} {:?}", self.program.display(), args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(EngineError::Io)?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let Some(status) = wait_with_timeout(&mut child, self.timeout).map_err(EngineError::Io)?
        else {
            // A grandchild can keep the pipes open after the kill; the readers are detached.
            return Err(EngineError::TimedOut(self.timeout));
        };
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            return Err(EngineError::Failed {
                exit_code: status.code(),
                stderr,
                stdout,
            });
        }
        if !stderr.trim().is_empty() {
            log::warn!("{}: {}", input.display(), stderr.trim());
        }
        Ok(())
    }
}

/// Link to the stylesheet relative to the page, so the output tree can move.
fn stylesheet_href(stylesheet: &Path, output: &Path) -> String {
    let href = output
        .parent()
        .and_then(|dir| diff_paths(stylesheet, dir))
        .unwrap_or_else(|| stylesheet.to_path_buf());
    href.to_string_lossy().replace('\\', "/")
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// `Ok(None)` when the child had to be killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

//! External-process export through the `vsql` CLI.
//!
//! Equivalent to
//!
//! ```text
//! vsql -h HOST -d DB -U USER -w PASSWORD -F '|' -A[t] -c "QUERY" | gzip -c > data/raw/OUT
//! ```
//!
//! but built as argument lists with no shell in between, so the query and
//! password are never re-parsed. Both processes' exit statuses are checked.

use crate::config::ConnectionConfig;
use crate::error::{ExtractError, Result};
use crate::sql::QueryText;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use tracing::{debug, info, warn};

/// Default location of the Vertica CLI.
pub const DEFAULT_VSQL: &str = "/usr/local/bin/vsql";

/// Default compression program.
pub const DEFAULT_GZIP: &str = "gzip";

/// Field separator passed to `vsql -F`.
pub const FIELD_SEPARATOR: &str = "|";

/// Whether the unaligned output keeps its header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// `-A`: unaligned output with column header and row-count footer.
    WithHeader,
    /// `-At`: unaligned output, tuples only.
    TuplesOnly,
}

impl HeaderMode {
    pub fn from_header(header: bool) -> Self {
        if header {
            Self::WithHeader
        } else {
            Self::TuplesOnly
        }
    }

    /// The `vsql` output-format flag for this mode.
    pub fn format_flag(&self) -> &'static str {
        match self {
            Self::WithHeader => "-A",
            Self::TuplesOnly => "-At",
        }
    }
}

/// A fully built `vsql` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VsqlCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl VsqlCommand {
    /// Index of the password value within `args`.
    const PASSWORD_ARG: usize = 7;

    /// Builds the invocation. The query is sanitized to a single line.
    pub fn new(
        program: impl Into<PathBuf>,
        config: &ConnectionConfig,
        query: &QueryText,
        header: HeaderMode,
    ) -> Result<Self> {
        let sql = query.sanitized();
        if sql.is_empty() {
            return Err(ExtractError::query("query file contains no SQL"));
        }

        let args = vec![
            "-h".to_string(),
            config.require_host()?.to_string(),
            "-d".to_string(),
            config.require_database()?.to_string(),
            "-U".to_string(),
            config.require_user()?.to_string(),
            "-w".to_string(),
            config.require_password()?.to_string(),
            "-F".to_string(),
            FIELD_SEPARATOR.to_string(),
            header.format_flag().to_string(),
            "-c".to_string(),
            sql,
        ];

        Ok(Self {
            program: program.into(),
            args,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The embedded single-line query.
    pub fn query(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or_default()
    }

    /// Renders the command for logging, with the password masked.
    pub fn redacted(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        for (index, arg) in self.args.iter().enumerate() {
            if index == Self::PASSWORD_ARG {
                parts.push("'********'".to_string());
            } else if arg.contains(char::is_whitespace) || arg == FIELD_SEPARATOR {
                parts.push(format!("'{}'", arg.replace('\'', r"'\''")));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// Runs `vsql` piped into `gzip`.
#[derive(Debug, Clone)]
pub struct VsqlExporter {
    vsql: PathBuf,
    gzip: PathBuf,
}

impl Default for VsqlExporter {
    fn default() -> Self {
        Self {
            vsql: PathBuf::from(DEFAULT_VSQL),
            gzip: PathBuf::from(DEFAULT_GZIP),
        }
    }
}

impl VsqlExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vsql(mut self, path: impl Into<PathBuf>) -> Self {
        self.vsql = path.into();
        self
    }

    pub fn with_gzip(mut self, path: impl Into<PathBuf>) -> Self {
        self.gzip = path.into();
        self
    }

    /// Builds the `vsql` invocation this exporter would run.
    pub fn command(
        &self,
        config: &ConnectionConfig,
        query: &QueryText,
        header: HeaderMode,
    ) -> Result<VsqlCommand> {
        VsqlCommand::new(&self.vsql, config, query, header)
    }

    /// Runs the query and writes gzip-compressed output to `output`.
    ///
    /// On failure the partially written output is removed.
    pub fn run(&self, command: &VsqlCommand, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        info!("Running: {} | gzip -c > {}", command.redacted(), output.display());

        let result = self.run_pipeline(command, output);
        if result.is_err() {
            if let Err(e) = std::fs::remove_file(output) {
                debug!("Could not remove {}: {e}", output.display());
            }
        }
        result
    }

    fn run_pipeline(&self, command: &VsqlCommand, output: &Path) -> Result<()> {
        let file = File::create(output)?;

        let mut vsql = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(command.program(), e))?;

        let vsql_stdout = vsql
            .stdout
            .take()
            .ok_or_else(|| ExtractError::process("vsql stdout was not captured"))?;

        let gzip = Command::new(&self.gzip)
            .arg("-c")
            .stdin(Stdio::from(vsql_stdout))
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .spawn();

        let gzip = match gzip {
            Ok(child) => child,
            Err(e) => {
                reap(vsql);
                return Err(spawn_error(&self.gzip, e));
            }
        };

        let vsql_output = vsql.wait_with_output()?;
        let gzip_output = gzip.wait_with_output()?;

        let vsql_stderr = String::from_utf8_lossy(&vsql_output.stderr);
        check_status("vsql", vsql_output.status, &vsql_stderr)?;
        if !vsql_stderr.trim().is_empty() {
            warn!("vsql: {}", vsql_stderr.trim());
        }
        check_status(
            "gzip",
            gzip_output.status,
            &String::from_utf8_lossy(&gzip_output.stderr),
        )?;

        info!("Wrote {}", output.display());
        Ok(())
    }
}

fn spawn_error(program: &Path, error: std::io::Error) -> ExtractError {
    ExtractError::process(format!("failed to start {}: {error}", program.display()))
}

fn check_status(name: &str, status: ExitStatus, stderr: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    let stderr = stderr.trim();
    Err(ExtractError::process(if stderr.is_empty() {
        format!("{name} exited with {status}")
    } else {
        format!("{name} exited with {status}: {stderr}")
    }))
}

fn reap(mut child: Child) {
    if let Err(e) = child.kill() {
        debug!("Could not kill child process: {e}");
    }
    let _ = child.wait();
}

/// Where a `vsql` export lands: bare file names go under `raw_dir`.
pub fn output_path(raw_dir: &Path, requested: &Path) -> PathBuf {
    let is_bare = requested
        .parent()
        .map_or(true, |parent| parent.as_os_str().is_empty());
    if is_bare && !requested.is_absolute() {
        raw_dir.join(requested)
    } else {
        requested.to_path_buf()
    }
}

//! LaTeX → PDF compilation by shelling out to a TeX engine.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Lines of compiler log returned with a failed compile.
pub const LOG_TAIL_LINES: usize = 40;

const JOB_NAME: &str = "resume";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to prepare compile workspace: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("Could not start LaTeX program '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("LaTeX compilation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("LaTeX compilation produced no PDF (exit code {exit_code:?})")]
    Failed {
        exit_code: Option<i32>,
        log_tail: String,
    },
}

#[async_trait]
pub trait PdfCompiler: Send + Sync {
    async fn compile(&self, source: &str) -> Result<Bytes, CompileError>;
}

/// Runs `pdflatex` (or a compatible engine) in a throwaway directory.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
    timeout: Duration,
}

impl LatexCompiler {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PdfCompiler for LatexCompiler {
    async fn compile(&self, source: &str) -> Result<Bytes, CompileError> {
        let dir = tempfile::tempdir()?;
        let tex_path = dir.path().join(format!("{JOB_NAME}.tex"));
        tokio::fs::write(&tex_path, source).await?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-interaction=nonstopmode")
            .arg(format!("-jobname={JOB_NAME}"))
            .arg(&tex_path)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Running {} in {}", self.program, dir.path().display());
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(CompileError::Spawn {
                    program: self.program.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(CompileError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        let log = match tokio::fs::read_to_string(dir.path().join(format!("{JOB_NAME}.log"))).await
        {
            Ok(log) => log,
            Err(_) => String::from_utf8_lossy(&output.stdout).into_owned(),
        };

        let pdf_path = dir.path().join(format!("{JOB_NAME}.pdf"));
        match tokio::fs::read(&pdf_path).await {
            Ok(pdf) if !pdf.is_empty() => {
                if !output.status.success() {
                    warn!(
                        "{} reported errors but produced a PDF:\n{}",
                        self.program,
                        log_tail(&log, LOG_TAIL_LINES)
                    );
                }
                info!("Compiled PDF ({} bytes)", pdf.len());
                Ok(Bytes::from(pdf))
            }
            _ => Err(CompileError::Failed {
                exit_code: output.status.code(),
                log_tail: log_tail(&log, LOG_TAIL_LINES),
            }),
        }
    }
}

/// Last `n` lines of a compiler log.
pub fn log_tail(log: &str, n: usize) -> String {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

use super::{OcrEngine, OcrError, OcrResult, parse_payload};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs a local OCR program once per attempt: `<program> <args...> <file path>`.
///
/// The program must print a single JSON result on stdout and exit with code zero. Stderr is
/// captured for diagnostics only.
#[derive(Debug, Clone)]
pub struct CommandOcrEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandOcrEngine {
    /// Create an engine that launches `program` with `args` followed by the file path.
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl OcrEngine for CommandOcrEngine {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn run(&self, path: &Path) -> Result<OcrResult, OcrError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OcrError::Launch {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| OcrError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(OcrError::ProcessFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_payload(&output.stdout)
    }
}

//! The external recognition engine process.
//!
//! Loading OCR models is expensive, so the engine runs as one long-lived child
//! process started at service startup. The service talks to it over a
//! line-delimited JSON protocol on stdin/stdout:
//!
//! ```text
//! service → engine   {"image": "/tmp/pdf-ocr-XXXX/page-0.png"}
//! engine  → service  [[ [[x,y],…], ["text", 0.97] ], …]]     (per-image result list)
//!                 or {"error": "message"}
//! ```
//!
//! Process-wide settings (language, GPU, drop score, angle classification)
//! are passed once as command-line flags; see [`EngineConfig::command_args`].
//!
//! A failed exchange leaves the pipe in an unknown state, so the process is
//! killed and a fresh one is started lazily on the next call. The failed page
//! itself is not retried.

use crate::config::EngineConfig;
use crate::pipeline::recognize::{EngineOutput, RawLine, RecognitionError, TextRecognizer};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct EngineRequest<'a> {
    image: &'a Path,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EngineReply {
    Output(EngineOutput),
    Failure { error: String },
}

struct EngineProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl EngineProcess {
    fn spawn(config: &EngineConfig) -> Result<Self, RecognitionError> {
        let program = config.program.display().to_string();
        let spawn_err = |source| RecognitionError::Spawn {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(&config.program)
            .args(config.command_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_err)?;

        let missing_pipe =
            || spawn_err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "missing stdio pipe"));
        let stdin = child.stdin.take().ok_or_else(missing_pipe)?;
        let stdout = child.stdout.take().ok_or_else(missing_pipe)?;

        info!("Started recognition engine '{}' (pid {})", program, child.id());
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn round_trip(&mut self, image: &Path) -> Result<Vec<RawLine>, RecognitionError> {
        let request = serde_json::to_string(&EngineRequest { image })
            .map_err(|e| RecognitionError::Protocol(e.to_string()))?;
        writeln!(self.stdin, "{request}")?;
        self.stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(RecognitionError::EngineExited);
        }

        match serde_json::from_str::<EngineReply>(line.trim_end())
            .map_err(|e| RecognitionError::Protocol(e.to_string()))?
        {
            EngineReply::Output(output) => Ok(output.into_lines()),
            EngineReply::Failure { error } => Err(RecognitionError::Engine(error)),
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// [`TextRecognizer`] backed by an external engine process.
pub struct CommandEngine {
    config: EngineConfig,
    process: Option<EngineProcess>,
}

impl CommandEngine {
    /// Start the engine process now, so a misconfigured engine fails at
    /// startup rather than on the first request.
    pub fn spawn(config: EngineConfig) -> Result<Self, RecognitionError> {
        let process = EngineProcess::spawn(&config)?;
        Ok(Self {
            config,
            process: Some(process),
        })
    }
}

impl TextRecognizer for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    fn recognize(&mut self, image: &Path) -> Result<Vec<RawLine>, RecognitionError> {
        if self.process.is_none() {
            debug!("Restarting recognition engine");
            self.process = Some(EngineProcess::spawn(&self.config)?);
        }
        let Some(process) = self.process.as_mut() else {
            return Err(RecognitionError::EngineExited);
        };

        match process.round_trip(image) {
            Ok(lines) => Ok(lines),
            Err(e) => {
                if !matches!(e, RecognitionError::Engine(_)) {
                    warn!("Recognition engine exchange failed, discarding process: {}", e);
                    self.process = None;
                }
                Err(e)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::pipeline::recognize::normalize_lines;

    /// An engine that runs `script` under `sh -c`. The generated flags land in
    /// `$0`, `$1`, … and are ignored.
    fn sh_engine(script: &str) -> EngineConfig {
        EngineConfig {
            program: "sh".into(),
            extra_args: vec!["-c".into(), script.into()],
            ..EngineConfig::default()
        }
    }

    #[test]
    fn answers_one_reply_per_request() {
        let mut engine = CommandEngine::spawn(sh_engine(
            r#"while read req; do echo '[[[[[0,0],[1,0],[1,1],[0,1]],["HELLO",0.99]]]]'; done"#,
        ))
        .unwrap();

        for _ in 0..2 {
            let lines = engine.recognize(Path::new("/tmp/page-0.png")).unwrap();
            assert_eq!(normalize_lines(&lines), "HELLO");
        }
    }

    #[test]
    fn null_result_means_no_detections() {
        let mut engine =
            CommandEngine::spawn(sh_engine("while read req; do echo '[null]'; done")).unwrap();
        let lines = engine.recognize(Path::new("/tmp/blank.png")).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn error_reply_keeps_the_process() {
        let mut engine = CommandEngine::spawn(sh_engine(
            r#"while read req; do echo '{"error":"corrupt bitmap"}'; done"#,
        ))
        .unwrap();
        let err = engine.recognize(Path::new("/tmp/page-0.png")).unwrap_err();
        assert!(matches!(err, RecognitionError::Engine(ref m) if m == "corrupt bitmap"));
        assert!(engine.process.is_some());
    }

    #[test]
    fn garbage_reply_is_a_protocol_error() {
        let mut engine =
            CommandEngine::spawn(sh_engine("while read req; do echo 'not json'; done")).unwrap();
        let err = engine.recognize(Path::new("/tmp/page-0.png")).unwrap_err();
        assert!(matches!(err, RecognitionError::Protocol(_)), "got {err:?}");
        assert!(engine.process.is_none());
    }

    #[test]
    fn exited_engine_is_restarted_on_next_call() {
        let mut engine = CommandEngine::spawn(sh_engine("exit 0")).unwrap();
        assert!(engine.recognize(Path::new("/tmp/page-0.png")).is_err());
        assert!(engine.process.is_none());

        // The next call spawns a fresh process, which also exits immediately.
        assert!(engine.recognize(Path::new("/tmp/page-0.png")).is_err());
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let config = EngineConfig {
            program: "/definitely/not/an/ocr-engine".into(),
            ..EngineConfig::default()
        };
        let err = CommandEngine::spawn(config).err().unwrap();
        assert!(matches!(err, RecognitionError::Spawn { .. }));
    }

    #[test]
    fn request_line_carries_the_image_path() {
        let request = serde_json::to_string(&EngineRequest {
            image: Path::new("/tmp/pdf-ocr-1/page-3.png"),
        })
        .unwrap();
        assert_eq!(request, r#"{"image":"/tmp/pdf-ocr-1/page-3.png"}"#);
    }
}

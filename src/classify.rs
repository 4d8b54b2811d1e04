//! Question classification through an external process.
//!
//! The classifier program receives the question as its last argument and
//! writes one JSON object to stdout:
//!
//! - `{"template_nome": "Template_1A", "mapeamentos": {"#DATA#": "2024-01-02"}}`
//! - `{"erro": "..."}`
//!
//! The payload is decoded once, here, into [`ClassificationOutcome`]. A
//! non-zero exit, an empty stdout or a timeout are [`ClassifierError`]s, which
//! are I/O failures of the call and distinct from a reported `erro`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tempfile::TempDir;

use crate::error::ClassifierError;

/// Result type for classification.
pub type ClassifierResult<T> = std::result::Result<T, ClassifierError>;

/// Default time a classification may take before the process is killed.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// What the classifier made of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    /// A template was selected and its placeholders filled.
    Resolved {
        template_id: String,
        placeholders: BTreeMap<String, String>,
    },
    /// The classifier ran but could not handle the question.
    Failed { message: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOutcome {
    Failed {
        erro: String,
    },
    Resolved {
        template_nome: String,
        #[serde(default)]
        mapeamentos: BTreeMap<String, String>,
    },
}

impl ClassificationOutcome {
    /// Decode the classifier's stdout.
    pub fn from_json(text: &str) -> ClassifierResult<Self> {
        let raw: RawOutcome =
            serde_json::from_str(text.trim()).map_err(|e| ClassifierError::Decode {
                message: e.to_string(),
            })?;
        Ok(match raw {
            RawOutcome::Failed { erro } => ClassificationOutcome::Failed { message: erro },
            RawOutcome::Resolved {
                template_nome,
                mapeamentos,
            } => ClassificationOutcome::Resolved {
                template_id: template_nome,
                placeholders: mapeamentos,
            },
        })
    }
}

/// Turns a question into a [`ClassificationOutcome`].
pub trait Classifier: Send + Sync {
    fn classify(&self, question: &str) -> ClassifierResult<ClassificationOutcome>;
}

/// Runs an external program per question.
#[derive(Debug)]
pub struct ProcessClassifier {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    /// Keeps the staged assets alive as long as the classifier.
    _staged: Option<TempDir>,
}

impl ProcessClassifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            _staged: None,
        }
    }

    /// Arguments placed before the question.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run from a private copy of `assets`, removed when the classifier is dropped.
    pub fn with_staged_assets(mut self, assets: &Path) -> ClassifierResult<Self> {
        let staged = stage_assets(assets)?;
        self.working_dir = Some(staged.path().to_path_buf());
        self._staged = Some(staged);
        Ok(self)
    }

    fn run(&self, question: &str) -> ClassifierResult<String> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(question)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        tracing::info!(program = %self.program, args = ?self.args, "running classifier");
        let mut child = command.spawn().map_err(|source| ClassifierError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.timed_out());
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(ClassifierError::Io { source }),
            }
        };

        // A process the classifier left behind may still hold the pipes open.
        let stdout = self.collect(stdout, deadline)?;
        let stderr = self.collect(stderr, deadline)?;
        if !stderr.trim().is_empty() {
            tracing::warn!(stderr = %stderr.trim_end(), "classifier wrote to stderr");
        }

        if !status.success() {
            return Err(ClassifierError::ExitStatus {
                code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }
        if stdout.trim().is_empty() {
            return Err(ClassifierError::EmptyOutput);
        }
        tracing::debug!(stdout = %stdout.trim_end(), "classifier output");
        Ok(stdout)
    }

    fn timed_out(&self) -> ClassifierError {
        tracing::warn!(timeout_secs = self.timeout.as_secs(), "classifier timed out");
        ClassifierError::Timeout {
            timeout_secs: self.timeout.as_secs(),
        }
    }

    /// Wait for a drained pipe until `deadline`.
    fn collect(
        &self,
        pipe: Option<Receiver<std::io::Result<String>>>,
        deadline: Instant,
    ) -> ClassifierResult<String> {
        let Some(pipe) = pipe else {
            return Ok(String::new());
        };
        match pipe.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(read) => read.map_err(|source| ClassifierError::Io { source }),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out()),
            Err(RecvTimeoutError::Disconnected) => Err(ClassifierError::Io {
                source: std::io::Error::other("pipe reader thread panicked"),
            }),
        }
    }
}

impl Classifier for ProcessClassifier {
    fn classify(&self, question: &str) -> ClassifierResult<ClassificationOutcome> {
        let stdout = self.run(question)?;
        ClassificationOutcome::from_json(&stdout)
    }
}

/// Read `pipe` to EOF on a detached thread; the result arrives on the channel.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let read = pipe
            .read_to_end(&mut buf)
            .map(|_| String::from_utf8_lossy(&buf).into_owned());
        let _ = tx.send(read);
    });
    rx
}

/// Copy the files of `assets` into a fresh temporary directory.
pub fn stage_assets(assets: &Path) -> ClassifierResult<TempDir> {
    let unavailable = |reason: String| ClassifierError::Unavailable { reason };
    let dir = tempfile::Builder::new()
        .prefix("n2s-classifier-")
        .tempdir()
        .map_err(|e| unavailable(format!("cannot create staging directory: {e}")))?;

    let entries = std::fs::read_dir(assets)
        .map_err(|e| unavailable(format!("cannot read {}: {e}", assets.display())))?;
    let mut copied = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| unavailable(e.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let target = dir.path().join(entry.file_name());
        std::fs::copy(&path, &target)
            .map_err(|e| unavailable(format!("cannot copy {}: {e}", path.display())))?;
        copied += 1;
    }
    tracing::info!(from = %assets.display(), to = %dir.path().display(), files = copied, "classifier assets staged");
    Ok(dir)
}

/// Stand-in used when the real classifier could not be set up.
#[derive(Debug, Clone)]
pub struct UnavailableClassifier {
    reason: String,
}

impl UnavailableClassifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Classifier for UnavailableClassifier {
    fn classify(&self, _question: &str) -> ClassifierResult<ClassificationOutcome> {
        Err(ClassifierError::Unavailable {
            reason: self.reason.clone(),
        })
    }
}

/// Answers every question with the same outcome.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    outcome: ClassificationOutcome,
}

impl FixedClassifier {
    pub fn new(outcome: ClassificationOutcome) -> Self {
        Self { outcome }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, _question: &str) -> ClassifierResult<ClassificationOutcome> {
        Ok(self.outcome.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_resolved_outcome() {
        let outcome = ClassificationOutcome::from_json(
            r##"{"template_nome": "Template_1A", "mapeamentos": {"#DATA#": "2024-01-02"}}"##,
        )
        .unwrap();
        let ClassificationOutcome::Resolved {
            template_id,
            placeholders,
        } = outcome
        else {
            panic!("expected resolved outcome");
        };
        assert_eq!(template_id, "Template_1A");
        assert_eq!(placeholders["#DATA#"], "2024-01-02");
    }

    #[test]
    fn decodes_reported_failure() {
        let outcome =
            ClassificationOutcome::from_json(r#"{"erro": "pergunta não reconhecida"}"#).unwrap();
        assert_eq!(
            outcome,
            ClassificationOutcome::Failed {
                message: "pergunta não reconhecida".into()
            }
        );
    }

    #[test]
    fn rejects_unrecognized_payload() {
        let err = ClassificationOutcome::from_json(r#"{"foo": 1}"#).unwrap_err();
        assert!(matches!(err, ClassifierError::Decode { .. }));
        assert!(ClassificationOutcome::from_json("not json").is_err());
    }

    #[test]
    fn unavailable_classifier_always_fails() {
        let c = UnavailableClassifier::new("assets missing");
        assert!(matches!(
            c.classify("?"),
            Err(ClassifierError::Unavailable { .. })
        ));
    }

    #[test]
    fn staging_missing_dir_is_unavailable() {
        let err = stage_assets(Path::new("/nonexistent/classifier")).unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable { .. }));
    }

    #[test]
    fn staging_copies_files() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("pln_processor.py"), "print('{}')").unwrap();
        std::fs::write(src.path().join("setor_map.json"), "{}").unwrap();
        let staged = stage_assets(src.path()).unwrap();
        assert!(staged.path().join("pln_processor.py").is_file());
        assert!(staged.path().join("setor_map.json").is_file());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let c = ProcessClassifier::new("/nonexistent/classifier-binary");
        assert!(matches!(c.classify("?"), Err(ClassifierError::Spawn { .. })));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn script(body: &str) -> (TempDir, ProcessClassifier) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("classify.sh");
            std::fs::write(&path, body).unwrap();
            let classifier = ProcessClassifier::new("/bin/sh").with_args([path.display().to_string()]);
            (dir, classifier)
        }

        #[test]
        fn question_is_passed_as_last_argument() {
            let (_dir, c) = script(
                "printf '{\"template_nome\": \"Template_1A\", \"mapeamentos\": {\"#Q#\": \"%s\"}}' \"$1\"\n",
            );
            let outcome = c.classify("preço da PETR4").unwrap();
            let ClassificationOutcome::Resolved { placeholders, .. } = outcome else {
                panic!("expected resolved outcome");
            };
            assert_eq!(placeholders["#Q#"], "preço da PETR4");
        }

        #[test]
        fn non_zero_exit_carries_stderr() {
            let (_dir, c) = script("echo 'modelo ausente' >&2\nexit 3\n");
            match c.classify("?") {
                Err(ClassifierError::ExitStatus { code, stderr }) => {
                    assert_eq!(code, 3);
                    assert_eq!(stderr, "modelo ausente");
                }
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[test]
        fn empty_stdout_is_an_error() {
            let (_dir, c) = script("exit 0\n");
            assert!(matches!(c.classify("?"), Err(ClassifierError::EmptyOutput)));
        }

        #[test]
        fn slow_classifier_is_killed() {
            let (_dir, c) = script("sleep 5\n");
            let c = c.with_timeout(Duration::from_millis(200));
            let start = Instant::now();
            assert!(matches!(c.classify("?"), Err(ClassifierError::Timeout { .. })));
            assert!(start.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn background_child_holding_stdout_cannot_outlast_timeout() {
            let (_dir, c) = script("sleep 5 &\necho '{\"erro\": \"x\"}'\n");
            let c = c.with_timeout(Duration::from_millis(500));
            let start = Instant::now();
            assert!(matches!(c.classify("?"), Err(ClassifierError::Timeout { .. })));
            assert!(start.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn runs_in_working_dir() {
            let (dir, c) = script("cat answer.json\n");
            std::fs::write(dir.path().join("answer.json"), r#"{"erro": "sem dados"}"#).unwrap();
            let c = c.with_working_dir(dir.path());
            assert_eq!(
                c.classify("?").unwrap(),
                ClassificationOutcome::Failed {
                    message: "sem dados".into()
                }
            );
        }
    }
}

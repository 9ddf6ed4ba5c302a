use super::{NativeExecutor, SurfaceHandle};
use crate::models::STATUS_INVALID;
use regex::Regex;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

/// Errors that keep a command from producing an exit status
///
/// These never leave the executor: [`NativeExecutor::execute`] logs them and
/// reports [`STATUS_INVALID`].
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Invalid argument: empty command")]
    EmptyCommand,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for ffmpeg process: {0}")]
    Wait(#[from] std::io::Error),

    #[error("Process terminated by signal")]
    Signalled,
}

/// Execution boundary backed by an external `ffmpeg` binary
///
/// Commands are split into arguments shell-style: on whitespace, except
/// inside double quotes. Quoted and unquoted runs that touch form one argument
/// and the quotes are stripped, so `title="My Clip"` becomes `title=My Clip`.
/// An unterminated quote runs to the end of the line. No escapes, no single
/// quotes. A leading `ffmpeg` token is replaced with the configured binary,
/// other programs run as given.
///
/// Keys from [`NativeExecutor::send_key`] are written to the child's stdin,
/// which is where FFmpeg reads its interactive commands. Keys sent while no
/// command is running are discarded when the next one starts.
///
/// [`NativeExecutor::execute`] blocks on `runtime` and must be called from a
/// thread that is not driving that runtime. The runtime must be multi-threaded
/// so its I/O driver keeps running while the caller blocks.
pub struct ProcessExecutor {
    binary: String,
    runtime: tokio::runtime::Handle,
    key_tx: mpsc::UnboundedSender<u8>,
    key_rx: AsyncMutex<mpsc::UnboundedReceiver<u8>>,
    surface: Mutex<Option<SurfaceHandle>>,
    token_pattern: Regex,
}

impl ProcessExecutor {
    pub fn new(binary: impl Into<String>, runtime: tokio::runtime::Handle) -> Self {
        let (key_tx, key_rx) = mpsc::unbounded_channel();
        Self {
            binary: binary.into(),
            runtime,
            key_tx,
            key_rx: AsyncMutex::new(key_rx),
            surface: Mutex::new(None),
            // One argument: adjacent quoted ("...", or " to end) and bare runs
            token_pattern: Regex::new(r#"(?:"[^"]*(?:"|$)|[^\s"]+)+"#)
                .expect("Invalid token regex"),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Most recently bound decode surface
    ///
    /// A child process cannot render into it; it is kept so hosts can tell what
    /// the next command was meant to target.
    pub fn bound_surface(&self) -> Option<SurfaceHandle> {
        *self.surface.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check that the configured binary can be started
    ///
    /// Runs `<binary> -version` once. Only a spawn failure is an error; the
    /// exit status is just logged.
    pub fn probe(&self) -> Result<(), ExecutorError> {
        self.runtime.block_on(async {
            let status = Command::new(&self.binary)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map_err(|source| ExecutorError::Spawn {
                    program: self.binary.clone(),
                    source,
                })?;
            tracing::debug!("{} -version exited with {}", self.binary, status);
            Ok(())
        })
    }

    /// Split a command line into arguments
    pub fn tokenize(&self, command: &str) -> Vec<String> {
        self.token_pattern
            .find_iter(command)
            .map(|m| m.as_str().replace('"', ""))
            .collect()
    }

    async fn run(&self, command: &str) -> Result<i32, ExecutorError> {
        let args = self.tokenize(command);
        let (program, rest) = args.split_first().ok_or(ExecutorError::EmptyCommand)?;
        let program = if program == "ffmpeg" {
            self.binary.as_str()
        } else {
            program.as_str()
        };

        let mut keys = self.key_rx.lock().await;
        let mut stale = 0usize;
        while keys.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            tracing::debug!("Discarded {} key(s) sent while idle", stale);
        }

        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // FFmpeg logs everything to stderr
        if let Some(stderr) = child.stderr.take() {
            self.runtime.spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "ffmpeg", "{}", line);
                }
            });
        }

        let mut stdin = child.stdin.take();

        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                Some(key) = keys.recv() => {
                    let Some(pipe) = stdin.as_mut() else {
                        continue;
                    };
                    let written = match pipe.write_all(&[key]).await {
                        Ok(()) => pipe.flush().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = written {
                        tracing::debug!("Child stdin closed, dropping keys: {}", e);
                        stdin = None;
                    }
                }
            }
        };

        status.code().ok_or(ExecutorError::Signalled)
    }
}

impl NativeExecutor for ProcessExecutor {
    fn execute(&self, command: &str) -> i32 {
        let start = Instant::now();

        match self.runtime.block_on(self.run(command)) {
            Ok(code) => {
                tracing::info!(
                    "FFmpeg exit from return, {} ({:.2}s)",
                    code,
                    start.elapsed().as_secs_f32()
                );
                code
            }
            Err(e) => {
                tracing::warn!("FFmpeg command not completed: {}", e);
                STATUS_INVALID
            }
        }
    }

    fn bind_surface(&self, surface: SurfaceHandle) {
        let mut bound = self.surface.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = bound.replace(surface) {
            tracing::debug!("Replacing bound surface {}", previous.as_raw());
        }
        tracing::info!("set surface {}", surface.as_raw());
    }

    fn send_key(&self, key: u8) {
        if self.key_tx.send(key).is_err() {
            tracing::warn!("Key queue closed, dropping key {:?}", key as char);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> (tokio::runtime::Runtime, ProcessExecutor) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = ProcessExecutor::new("ffmpeg", rt.handle().clone());
        (rt, executor)
    }

    #[test]
    fn test_tokenize_whitespace() {
        let (_rt, executor) = executor();
        let tokens = executor.tokenize("ffmpeg  -i in.mp4\t-c:v copy out.mp4");
        assert_eq!(tokens, vec!["ffmpeg", "-i", "in.mp4", "-c:v", "copy", "out.mp4"]);
    }

    #[test]
    fn test_tokenize_quoted_paths() {
        let (_rt, executor) = executor();
        let tokens = executor.tokenize(r#"ffmpeg -i "/home/me/My Videos/a.mp4" -y "out dir/b.mp4""#);
        assert_eq!(
            tokens,
            vec!["ffmpeg", "-i", "/home/me/My Videos/a.mp4", "-y", "out dir/b.mp4"]
        );
    }

    #[test]
    fn test_tokenize_embedded_quotes() {
        let (_rt, executor) = executor();
        let tokens = executor.tokenize(r#"ffmpeg -metadata title="My Clip" -i "a b.mp4" x"#);
        assert_eq!(
            tokens,
            vec!["ffmpeg", "-metadata", "title=My Clip", "-i", "a b.mp4", "x"]
        );
    }

    #[test]
    fn test_tokenize_adjacent_and_unterminated_quotes() {
        let (_rt, executor) = executor();
        assert_eq!(executor.tokenize(r#"a"b c"d e"#), vec!["ab cd", "e"]);
        assert_eq!(executor.tokenize(r#"x "" y"#), vec!["x", "", "y"]);
        assert_eq!(executor.tokenize(r#"-i "open ended"#), vec!["-i", "open ended"]);
    }

    #[test]
    fn test_tokenize_empty() {
        let (_rt, executor) = executor();
        assert!(executor.tokenize("").is_empty());
        assert!(executor.tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_bind_surface_latest_wins() {
        let (_rt, executor) = executor();
        assert_eq!(executor.bound_surface(), None);

        executor.bind_surface(SurfaceHandle::from_raw(7));
        executor.bind_surface(SurfaceHandle::from_raw(9));

        assert_eq!(executor.bound_surface(), Some(SurfaceHandle::from_raw(9)));
    }

    #[test]
    fn test_empty_command_is_invalid() {
        let (_rt, executor) = executor();
        assert_eq!(executor.execute("   "), STATUS_INVALID);
    }
}

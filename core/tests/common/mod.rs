#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gpgdrive_core::api::{
    CommandExecutor, CommandOutput, CommandSpec, InteractiveSession, RunnerError, SessionLauncher,
    Signal,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Routes `tracing` output through the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One step of a simulated `gpg --edit-key` run.
#[derive(Debug, Clone)]
pub enum EngineStep {
    /// Emits `[GNUPG:] KEYWORD args` and reads one answer line.
    Prompt(&'static str, &'static str),
    /// Emits a raw stdout line without waiting for input.
    Stdout(&'static str),
    Stderr(&'static str),
    /// Stops talking until stdin is closed.
    Hang,
}

pub fn prompt(keyword: &'static str, args: &'static str) -> EngineStep {
    EngineStep::Prompt(keyword, args)
}

/// Launches in-process fake engines that follow a fixed script.
#[derive(Clone)]
pub struct ScriptedEngine {
    steps: Vec<EngineStep>,
    exit_code: i32,
    pub answers: Arc<Mutex<Vec<String>>>,
    pub specs: Arc<Mutex<Vec<CommandSpec>>>,
}

impl ScriptedEngine {
    pub fn new(steps: Vec<EngineStep>, exit_code: i32) -> Self {
        Self {
            steps,
            exit_code,
            answers: Arc::new(Mutex::new(Vec::new())),
            specs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn answers(&self) -> Vec<String> {
        self.answers.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLauncher for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn start_session(
        &self,
        spec: &CommandSpec,
    ) -> anyhow::Result<Box<dyn InteractiveSession>> {
        self.specs.lock().unwrap().push(spec.clone());

        let (stdin_ours, stdin_engine) = tokio::io::duplex(PIPE_CAPACITY);
        let (stdout_engine, stdout_ours) = tokio::io::duplex(PIPE_CAPACITY);
        let (stderr_engine, stderr_ours) = tokio::io::duplex(PIPE_CAPACITY);

        let steps = self.steps.clone();
        let exit_code = self.exit_code;
        let answers = self.answers.clone();
        let engine = tokio::spawn(run_engine(
            steps,
            exit_code,
            answers,
            stdin_engine,
            stdout_engine,
            stderr_engine,
        ));

        Ok(Box::new(ScriptedSession {
            stdin: Some(stdin_ours),
            stdout: Some(stdout_ours),
            stderr: Some(stderr_ours),
            engine,
            exit: None,
        }))
    }
}

async fn run_engine(
    steps: Vec<EngineStep>,
    exit_code: i32,
    answers: Arc<Mutex<Vec<String>>>,
    stdin: DuplexStream,
    mut stdout: DuplexStream,
    mut stderr: DuplexStream,
) -> i32 {
    let mut lines = BufReader::new(stdin).lines();
    for step in steps {
        match step {
            EngineStep::Prompt(keyword, args) => {
                let line = format!("[GNUPG:] {keyword} {args}\n");
                if stdout.write_all(line.as_bytes()).await.is_err() {
                    return 2;
                }
                match lines.next_line().await {
                    Ok(Some(answer)) => answers.lock().unwrap().push(answer),
                    _ => return 2,
                }
            }
            EngineStep::Stdout(line) => {
                let _ = stdout.write_all(format!("{line}\n").as_bytes()).await;
            }
            EngineStep::Stderr(line) => {
                let _ = stderr.write_all(format!("{line}\n").as_bytes()).await;
            }
            EngineStep::Hang => {
                while let Ok(Some(_)) = lines.next_line().await {}
                return 2;
            }
        }
    }
    exit_code
}

struct ScriptedSession {
    stdin: Option<DuplexStream>,
    stdout: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
    engine: JoinHandle<i32>,
    exit: Option<i32>,
}

#[async_trait]
impl InteractiveSession for ScriptedSession {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>> {
        self.stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncWrite + Unpin + Send>)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn signal(&mut self, _signal: Signal) -> anyhow::Result<()> {
        self.engine.abort();
        Ok(())
    }

    async fn wait(&mut self) -> anyhow::Result<i32> {
        if let Some(code) = self.exit {
            return Ok(code);
        }
        let code = (&mut self.engine).await.unwrap_or(-1);
        self.exit = Some(code);
        Ok(code)
    }
}

/// How a fake command behaves for one `--homedir`.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Exit { code: i32, delay_ms: u64 },
    SpawnFails,
    Hang,
}

/// Records every command and answers according to the `--homedir` argument.
#[derive(Default)]
pub struct FakeExecutor {
    behaviors: HashMap<String, Behavior>,
    stdout: HashMap<String, String>,
    pub calls: Mutex<Vec<CommandSpec>>,
    /// `start <args>` / `end <args>` in the order they happened.
    pub log: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, home: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(home.to_string(), behavior);
        self
    }

    pub fn with_stdout(mut self, home: &str, stdout: &str) -> Self {
        self.stdout.insert(home.to_string(), stdout.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

fn homedir_of(spec: &CommandSpec) -> String {
    spec.args
        .iter()
        .position(|a| a == "--homedir")
        .and_then(|i| spec.args.get(i + 1))
        .cloned()
        .unwrap_or_default()
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    fn name(&self) -> &str {
        "fake"
    }

    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        self.calls.lock().unwrap().push(spec.clone());
        let home = homedir_of(spec);
        let tail = spec.args.get(2..).map(|a| a.join(" ")).unwrap_or_default();
        self.log.lock().unwrap().push(format!("start {tail} {home}"));

        let behavior = self
            .behaviors
            .get(&home)
            .copied()
            .unwrap_or(Behavior::Exit {
                code: 0,
                delay_ms: 0,
            });

        let code = match behavior {
            Behavior::SpawnFails => {
                return Err(RunnerError::Spawn(format!("cannot run {}", spec.program)));
            }
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                0
            }
            Behavior::Exit { code, delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                code
            }
        };

        self.log.lock().unwrap().push(format!("end {tail} {home}"));
        Ok(CommandOutput {
            exit_code: code,
            duration_ms: Some(0),
            stdout: self.stdout.get(&home).cloned().unwrap_or_default(),
            stderr: String::new(),
        })
    }
}

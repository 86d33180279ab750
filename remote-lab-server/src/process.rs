use std::io::Read;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;

/// The directory where all submitted code will be executed in.
pub fn working_directory() -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push("remote-lab");
    path
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} failed with {status}\n{output}")]
    NonZeroExit {
        program: String,
        status: ExitStatus,
        output: String,
    },
    #[error("execution timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    #[error("failed to collect output: {0}")]
    Io(#[from] std::io::Error),
}

/// A successful run of submitted code.
#[derive(Debug)]
pub struct Execution {
    /// Stdout and stderr, interleaved as the process wrote them.
    pub output: String,
    pub time_taken: Duration,
}

/// How submitted code gets run.
#[derive(Debug, Clone)]
pub struct Interpreter {
    pub program: PathBuf,
    /// Wall clock limit, `None` lets the code run forever.
    pub timeout: Option<Duration>,
}

impl Interpreter {
    /// `<program> -c <code>` in the [`working_directory`].
    pub fn command(&self, code: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-c")
            .arg(code)
            .current_dir(working_directory())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

/// Kills the process group of a spawned command when dropped, unless disarmed.
///
/// Submitted code may start processes of its own, killing only the interpreter would leave them
/// running and holding the output pipe open.
#[cfg_attr(not(unix), allow(dead_code))]
struct ProcessGroup {
    id: u64,
    pgid: Option<u32>,
}

impl ProcessGroup {
    #[cfg_attr(not(unix), allow(unused_variables))]
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let Ok(raw) = i32::try_from(pgid) else {
                return;
            };
            let id = self.id;
            match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) => log::debug!(id, pgid; "killed process group"),
                // Everyone in the group already exited.
                Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => log::warn!(id, pgid, e:display; "failed to kill process group"),
            }
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Runs the command to completion and collects its combined output.
///
/// Stdout and stderr share one pipe, so the output reads like a terminal would show it.
/// Only a zero exit status counts as success.
///
/// The command runs in its own process group. That group is killed when the `timeout` expires
/// or when the returned future is dropped before completion.
pub async fn process(
    id: u64,
    mut command: Command,
    timeout: Option<Duration>,
) -> Result<Execution, ExecutionError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    let (mut reader, writer) = std::io::pipe()?;
    command.stdout(writer.try_clone()?).stderr(writer);
    #[cfg(unix)]
    command.process_group(0);

    let start = Instant::now();
    let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
        program: program.clone(),
        source,
    })?;
    let mut group = ProcessGroup {
        id,
        pgid: if cfg!(unix) { child.id() } else { None },
    };
    // The command still owns our copies of the write end, the reader would never see EOF.
    drop(command);

    let collect = tokio::task::spawn_blocking(move || {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).map(|_| buffer)
    });

    // Output is only complete once every process holding the pipe is gone,
    // so the limit covers the read as well as the wait.
    let run = async {
        let status = child.wait().await?;
        let output = collect.await.map_err(std::io::Error::other)??;
        Ok::<_, ExecutionError>((status, output))
    };
    let (status, output) = match timeout {
        Some(limit) => {
            if let Ok(result) = tokio::time::timeout(limit, run).await {
                result?
            } else {
                log::info!(id; "killing after {limit:?}");
                group.kill();
                if let Err(e) = child.kill().await {
                    log::debug!(id, e:display; "interpreter already gone");
                }
                return Err(ExecutionError::Timeout(limit));
            }
        }
        None => run.await?,
    };
    group.disarm();
    let end = Instant::now();
    let time_taken = end - start;

    let output = String::from_utf8_lossy(&output).trim().to_owned();
    log::debug!(id; "Status: {status}");
    log::debug!(id; "Output: {output}");

    if status.success() {
        Ok(Execution { output, time_taken })
    } else {
        Err(ExecutionError::NonZeroExit {
            program,
            status,
            output,
        })
    }
}

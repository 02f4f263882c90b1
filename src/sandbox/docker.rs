//! Docker-backed sandbox
//!
//! One fresh container per run: create, write the source and input in,
//! optionally compile, execute under the wall-clock deadline, then force
//! remove. Removal happens on every exit path so a runaway process never
//! outlives the call.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bollard::{
    Docker,
    container::LogOutput,
    exec::{CreateExecOptions, StartExecResults},
    models::ContainerCreateBody,
    query_parameters::{CreateContainerOptionsBuilder, RemoveContainerOptionsBuilder},
};
use futures::StreamExt;
use uuid::Uuid;

use crate::{
    config::Config,
    constants::{CONTAINER_PIDS_LIMIT, WORKSPACE_DIR},
    error::{JudgeError, JudgeResult},
};
use crate::models::Language;

use super::{
    Sandbox,
    languages::LanguageProfile,
    outcome::{self, RunOutcome},
};

/// Sandbox backend driving an external Docker daemon
pub struct DockerSandbox {
    docker: Docker,
    config: Config,
}

/// Output of one exec inside the container
struct ExecOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

impl DockerSandbox {
    /// Create a sandbox over an already-connected Docker client
    pub fn new(docker: Docker, config: Config) -> Self {
        Self { docker, config }
    }

    /// Connect to the Docker daemon configured in `config` and verify it
    /// is reachable
    pub async fn connect(config: &Config) -> JudgeResult<Self> {
        let docker = Docker::connect_with_unix(
            &config.docker.socket_path,
            120,
            bollard::API_DEFAULT_VERSION,
        )?;
        docker.ping().await?;
        tracing::info!(socket = %config.docker.socket_path, "connected to Docker daemon");
        Ok(Self::new(docker, config.clone()))
    }

    /// Create and start a capped container for one run
    async fn create_container(
        &self,
        run_id: &Uuid,
        language: Language,
        memory_limit_mb: u64,
    ) -> JudgeResult<String> {
        let image = self.config.docker.image_for(language);
        let container_name = format!("adaptivejudge-{run_id}");

        let options = CreateContainerOptionsBuilder::default()
            .name(&container_name)
            .build();

        let host_config = bollard::models::HostConfig {
            memory: Some((memory_limit_mb * 1024 * 1024) as i64),
            memory_swap: Some((memory_limit_mb * 1024 * 1024) as i64),
            cpu_period: Some(100_000),
            cpu_quota: Some(100_000), // 1 CPU
            network_mode: Some("none".to_string()),
            pids_limit: Some(CONTAINER_PIDS_LIMIT),
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(image.to_string()),
            // Keep the container alive for execs; no tty so stdout and
            // stderr arrive demultiplexed
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            working_dir: Some(WORKSPACE_DIR.to_string()),
            env: Some(vec!["LANG=C.UTF-8".to_string()]),
            host_config: Some(host_config),
            labels: Some(HashMap::from([(
                "adaptivejudge.run".to_string(),
                run_id.to_string(),
            )])),
            ..Default::default()
        };

        let container = self.docker.create_container(Some(options), body).await?;

        self.docker
            .start_container(
                &container.id,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await?;

        Ok(container.id)
    }

    /// Execute a shell command in the container
    async fn exec_command(&self, container_id: &str, cmd: &str) -> JudgeResult<ExecOutput> {
        let exec = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(vec!["/bin/sh", "-c", cmd]),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let started = self.docker.start_exec(&exec.id, None).await?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } = started {
            while let Some(msg) = output.next().await {
                match msg? {
                    LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    _ => {}
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        let exit_code = inspect.exit_code.unwrap_or(-1) as i32;

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    /// Write a file into the container workspace
    async fn write_file(&self, container_id: &str, path: &str, content: &str) -> JudgeResult<()> {
        // base64 round trip to survive quoting and special characters
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, content);
        let cmd = format!("echo '{encoded}' | base64 -d > {path}");

        let output = self.exec_command(container_id, &cmd).await?;
        if output.exit_code != 0 {
            return Err(JudgeError::Sandbox(format!(
                "failed to write {path}: {}",
                output.stderr
            )));
        }

        Ok(())
    }

    /// Run the full compile-and-execute cycle inside one container
    async fn run_in_container(
        &self,
        container_id: &str,
        language: Language,
        source_code: &str,
        input: &str,
        time_limit: Duration,
    ) -> JudgeResult<RunOutcome> {
        let profile = LanguageProfile::for_language(language);

        self.write_file(
            container_id,
            &format!("{WORKSPACE_DIR}/{}", profile.source_file),
            source_code,
        )
        .await?;
        self.write_file(container_id, &format!("{WORKSPACE_DIR}/input.txt"), input)
            .await?;

        // Compilation gets its own generous bound, independent of the
        // judging time limit
        if let Some(compile_cmd) = profile.compile_command {
            let compile_timeout = Duration::from_secs(self.config.limits.compile_timeout_seconds);
            let compiled =
                match tokio::time::timeout(compile_timeout, self.exec_command(container_id, compile_cmd))
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        return Ok(RunOutcome::compile_error(
                            -1,
                            format!(
                                "compilation timed out after {}s",
                                self.config.limits.compile_timeout_seconds
                            ),
                        ));
                    }
                };
            if compiled.exit_code != 0 {
                tracing::debug!(%language, exit_code = compiled.exit_code, "compilation failed");
                return Ok(RunOutcome::compile_error(compiled.exit_code, compiled.stderr));
            }
        }

        // /usr/bin/time writes its metrics to a side file so the program's
        // stdout stays clean for answer comparison
        let run_cmd = format!(
            "/usr/bin/time -v -o {WORKSPACE_DIR}/.metrics sh -c '{} < {WORKSPACE_DIR}/input.txt'",
            profile.run_command
        );

        let started = Instant::now();
        let execed = tokio::time::timeout(time_limit, self.exec_command(container_id, &run_cmd)).await;
        let elapsed = started.elapsed().as_secs_f64();

        let exec = match execed {
            Err(_) => {
                // Hard deadline: a hung submission cannot be trusted to
                // respond to a polite signal
                self.kill_container(container_id).await;
                return Ok(RunOutcome::time_limit(elapsed));
            }
            Ok(result) => result?,
        };

        if elapsed > time_limit.as_secs_f64() {
            return Ok(RunOutcome::time_limit(elapsed));
        }

        let memory_kb = self.read_peak_memory(container_id).await;
        let oom_killed = self.container_oom_killed(container_id).await;
        let status = outcome::classify_exit(exec.exit_code, oom_killed, &exec.stderr);

        Ok(RunOutcome {
            status,
            exit_code: Some(exec.exit_code),
            signal: outcome::signal_of(exec.exit_code),
            oom_killed,
            execution_time: elapsed,
            stdout: exec.stdout,
            stderr: exec.stderr,
            memory_kb,
        })
    }

    /// Peak RSS in kilobytes from the /usr/bin/time metrics file
    async fn read_peak_memory(&self, container_id: &str) -> Option<i64> {
        let output = self
            .exec_command(container_id, &format!("cat {WORKSPACE_DIR}/.metrics"))
            .await
            .ok()?;
        parse_peak_rss(&output.stdout)
    }

    /// Whether the container reported an OOM kill
    async fn container_oom_killed(&self, container_id: &str) -> bool {
        match self
            .docker
            .inspect_container(
                container_id,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
        {
            Ok(details) => details
                .state
                .and_then(|state| state.oom_killed)
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn kill_container(&self, container_id: &str) {
        if let Err(e) = self
            .docker
            .kill_container(
                container_id,
                None::<bollard::query_parameters::KillContainerOptions>,
            )
            .await
        {
            tracing::warn!(container = container_id, "failed to kill container: {e}");
        }
    }

    async fn remove_container(&self, container_id: &str) {
        let options = RemoveContainerOptionsBuilder::default().force(true).build();

        if let Err(e) = self
            .docker
            .remove_container(container_id, Some(options))
            .await
        {
            tracing::warn!(container = container_id, "failed to remove container: {e}");
        }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn run(
        &self,
        source_code: &str,
        language: Language,
        input: &str,
        time_limit: Duration,
        memory_limit_mb: u64,
    ) -> JudgeResult<RunOutcome> {
        let run_id = Uuid::new_v4();
        let container_id = self
            .create_container(&run_id, language, memory_limit_mb)
            .await?;

        let result = self
            .run_in_container(&container_id, language, source_code, input, time_limit)
            .await;

        // Cleanup on every exit path, success or failure
        self.remove_container(&container_id).await;

        result
    }
}

/// Parse "Maximum resident set size (kbytes)" from /usr/bin/time -v output
fn parse_peak_rss(metrics: &str) -> Option<i64> {
    for line in metrics.lines() {
        if line.contains("Maximum resident set size") {
            if let Some(kb) = line
                .rsplit(':')
                .next()
                .and_then(|value| value.trim().parse::<i64>().ok())
            {
                return Some(kb);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peak_rss() {
        let metrics = "\tCommand being timed: \"./solution\"\n\
             \tUser time (seconds): 0.05\n\
             \tMaximum resident set size (kbytes): 3864\n\
             \tExit status: 0\n";
        assert_eq!(parse_peak_rss(metrics), Some(3864));
        assert_eq!(parse_peak_rss("no metrics here"), None);
    }
}

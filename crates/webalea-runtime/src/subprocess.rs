use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{error, info, instrument, warn};
use webalea_config::CompositeNode;

use crate::error::RuntimeError;
use crate::executor::NodeExecutor;
use crate::marker;
use crate::result::{ExecutionResult, NodeOutput};
use crate::worker::WorkerRequest;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const RESPONSE_SNIPPET_CHARS: usize = 200;

/// Runs each request in a fresh worker process.
///
/// The request is written to the worker's stdin as one line of JSON and the
/// worker must answer with one JSON [`ExecutionResult`] on stdout. Stderr is
/// diagnostics only. A worker still running when the timeout expires is
/// killed.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
  program: PathBuf,
  args: Vec<OsString>,
  envs: Vec<(OsString, OsString)>,
  timeout: Duration,
}

impl SubprocessRunner {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      envs: Vec::new(),
      timeout: DEFAULT_TIMEOUT,
    }
  }

  /// Re-invoke the running executable as `<exe> worker`.
  pub fn current_exe() -> Result<Self, RuntimeError> {
    let exe = std::env::current_exe().map_err(RuntimeError::Environment)?;
    Ok(Self::new(exe).with_arg("worker"))
  }

  pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
    self.envs.push((key.into(), value.into()));
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  /// Run a whole composite inside a single worker.
  pub async fn execute_composite(&self, composite: &CompositeNode) -> ExecutionResult {
    let request = WorkerRequest::Composite {
      composite: composite.clone(),
    };
    self.run(&request).await
  }

  /// Run a request, folding every failure into the result.
  pub async fn run(&self, request: &WorkerRequest) -> ExecutionResult {
    match self.exchange(request).await {
      Ok(result) => result,
      Err(e) => ExecutionResult::failure(e.to_string()),
    }
  }

  #[instrument(name = "subprocess_exchange", skip(self, request), fields(program = %self.program.display()))]
  pub async fn exchange(&self, request: &WorkerRequest) -> Result<ExecutionResult, RuntimeError> {
    let mut payload =
      serde_json::to_vec(request).map_err(|e| RuntimeError::InvalidRequest(e.to_string()))?;
    payload.push(b'\n');

    let mut child = Command::new(&self.program)
      .args(&self.args)
      .envs(self.envs.iter().map(|(k, v)| (k, v)))
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| {
        error!(error = %e, "failed to start worker");
        RuntimeError::Environment(e)
      })?;

    let stdin = child.stdin.take();
    let exchange = async move {
      if let Some(mut stdin) = stdin {
        match stdin.write_all(&payload).await {
          // The worker may exit without reading its request.
          Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
          Err(e) => return Err(e),
          Ok(()) => {}
        }
      }
      child.wait_with_output().await
    };

    let output = match tokio::time::timeout(self.timeout, exchange).await {
      Ok(output) => output?,
      Err(_) => {
        error!(timeout_secs = self.timeout.as_secs_f64(), "worker timed out");
        return Err(RuntimeError::Timeout {
          timeout: self.timeout,
        });
      }
    };

    if !output.stderr.is_empty() {
      warn!(stderr = %String::from_utf8_lossy(&output.stderr).trim_end(), "worker stderr");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    info!(stdout_len = stdout.len(), status = %output.status, "worker finished");
    parse_response(stdout)
  }
}

#[async_trait]
impl NodeExecutor for SubprocessRunner {
  async fn execute_node(
    &self,
    package_name: &str,
    node_name: &str,
    inputs: Map<String, JsonValue>,
  ) -> ExecutionResult {
    info!(package = %package_name, node = %node_name, "executing node in worker");
    let request = WorkerRequest::Node {
      package_name: package_name.to_string(),
      node_name: node_name.to_string(),
      inputs,
    };
    self.run(&request).await
  }
}

fn parse_response(stdout: &str) -> Result<ExecutionResult, RuntimeError> {
  if stdout.is_empty() {
    return Err(RuntimeError::NoOutput);
  }
  let result: ExecutionResult = serde_json::from_str(stdout).map_err(|e| {
    error!(error = %e, "failed to decode worker response");
    RuntimeError::InvalidResponse {
      snippet: stdout.chars().take(RESPONSE_SNIPPET_CHARS).collect(),
    }
  })?;

  info!(
    success = result.success,
    outputs = %serde_json::to_string(&summarize_outputs(&result.outputs)).unwrap_or_default(),
    error = ?result.error,
    "execution result"
  );
  Ok(result)
}

#[derive(Serialize)]
struct OutputSummary<'a> {
  index: usize,
  name: &'a str,
  #[serde(rename = "type")]
  value_type: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  scene_ref: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  scene_shape_count: Option<i64>,
}

fn summarize_outputs(outputs: &[NodeOutput]) -> Vec<OutputSummary<'_>> {
  outputs
    .iter()
    .map(|output| {
      let is_scene = marker::marker_type(&output.value).is_some_and(marker::is_scene_ref);
      OutputSummary {
        index: output.index,
        name: &output.name,
        value_type: &output.value_type,
        scene_ref: is_scene.then(|| marker::ref_id(&output.value)).flatten(),
        scene_shape_count: is_scene.then(|| marker::shape_count(&output.value)).flatten(),
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_response_errors() {
    assert!(matches!(parse_response(""), Err(RuntimeError::NoOutput)));

    let garbage = "x".repeat(500);
    let err = parse_response(&garbage).unwrap_err();
    assert_eq!(err.to_string(), format!("Invalid JSON response: {}", "x".repeat(200)));
  }

  #[test]
  fn test_parse_response_success() {
    let result = parse_response(r#"{"success": true, "outputs": [{"index": 0, "name": "result", "value": 8, "type": "int"}]}"#)
      .unwrap();
    assert!(result.success);
    assert_eq!(result.outputs[0].value, json!(8));
  }

  #[test]
  fn test_summarize_scene_outputs() {
    let outputs = vec![
      NodeOutput {
        index: 0,
        name: "scene".to_string(),
        value: json!({"__type__": "scene_json_ref", "__ref__": "r1", "__meta__": {"shape_count": 2}}),
        value_type: "Scene".to_string(),
      },
      NodeOutput {
        index: 1,
        name: "n".to_string(),
        value: json!({"__ref__": "r2"}),
        value_type: "MTG".to_string(),
      },
    ];
    let summary = serde_json::to_value(summarize_outputs(&outputs)).unwrap();
    assert_eq!(
      summary,
      json!([
        {"index": 0, "name": "scene", "type": "Scene", "scene_ref": "r1", "scene_shape_count": 2},
        {"index": 1, "name": "n", "type": "MTG"}
      ])
    );
  }
}

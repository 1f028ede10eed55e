//! Worker side of the subprocess boundary.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info};
use webalea_config::CompositeNode;
use webalea_registry::NodeRegistry;

use crate::composite::CompositeExecutor;
use crate::error::RuntimeError;
use crate::evaluator::NodeEvaluator;
use crate::result::ExecutionResult;

/// A request handed to a worker process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkerRequest {
  Composite {
    composite: CompositeNode,
  },
  Node {
    package_name: String,
    node_name: String,
    inputs: Map<String, JsonValue>,
  },
}

impl WorkerRequest {
  /// Parse a request. A non-empty `composite` object takes precedence over
  /// the single-node fields.
  pub fn from_json(raw: JsonValue) -> Result<Self, RuntimeError> {
    let JsonValue::Object(mut fields) = raw else {
      return Err(RuntimeError::InvalidRequest(
        "request must be a JSON object".to_string(),
      ));
    };

    if let Some(JsonValue::Object(composite)) = fields.remove("composite")
      && !composite.is_empty()
    {
      let composite = serde_json::from_value(JsonValue::Object(composite))
        .map_err(|e| RuntimeError::InvalidRequest(format!("invalid composite: {}", e)))?;
      return Ok(WorkerRequest::Composite { composite });
    }

    let text = |key: &str| {
      fields
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
    };
    let (Some(package_name), Some(node_name)) = (text("package_name"), text("node_name")) else {
      return Err(RuntimeError::InvalidRequest(
        "package_name and node_name are required for simple nodes".to_string(),
      ));
    };
    let inputs = match fields.remove("inputs") {
      Some(JsonValue::Object(inputs)) => inputs,
      None | Some(JsonValue::Null) => Map::new(),
      Some(_) => {
        return Err(RuntimeError::InvalidRequest(
          "inputs must be a JSON object".to_string(),
        ));
      }
    };

    Ok(WorkerRequest::Node {
      package_name,
      node_name,
      inputs,
    })
  }
}

/// Execute one request in-process.
pub async fn handle_request<R: NodeRegistry>(
  evaluator: &NodeEvaluator<R>,
  request: WorkerRequest,
) -> ExecutionResult {
  match request {
    WorkerRequest::Node {
      package_name,
      node_name,
      inputs,
    } => evaluator.run(&package_name, &node_name, &inputs),
    WorkerRequest::Composite { composite } => CompositeExecutor::new(evaluator).run(&composite).await,
  }
}

/// Read one request line from `reader`, execute it and write exactly one
/// result line to `writer`.
pub async fn serve<R, I, O>(
  evaluator: &NodeEvaluator<R>,
  reader: I,
  mut writer: O,
) -> std::io::Result<ExecutionResult>
where
  R: NodeRegistry,
  I: AsyncRead + Unpin,
  O: AsyncWrite + Unpin,
{
  let mut line = String::new();
  BufReader::new(reader).read_line(&mut line).await?;

  let result = match parse_line(&line) {
    Ok(request) => {
      info!("worker request received");
      handle_request(evaluator, request).await
    }
    Err(e) => {
      error!(error = %e, "invalid worker request");
      ExecutionResult::failure(e.to_string())
    }
  };

  let mut encoded = serde_json::to_vec(&result)?;
  encoded.push(b'\n');
  writer.write_all(&encoded).await?;
  writer.flush().await?;
  Ok(result)
}

fn parse_line(line: &str) -> Result<WorkerRequest, RuntimeError> {
  let raw: JsonValue = serde_json::from_str(line.trim())
    .map_err(|e| RuntimeError::InvalidRequest(format!("invalid request json: {}", e)))?;
  WorkerRequest::from_json(raw)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_node_request() {
    let request = WorkerRequest::from_json(json!({
      "package_name": "openalea.math",
      "node_name": "addition",
      "inputs": {"a": 1}
    }))
    .unwrap();
    let WorkerRequest::Node { inputs, .. } = &request else {
      panic!("expected node request");
    };
    assert_eq!(inputs["a"], json!(1));

    assert_eq!(
      serde_json::to_value(&request).unwrap(),
      json!({"package_name": "openalea.math", "node_name": "addition", "inputs": {"a": 1}})
    );
  }

  #[test]
  fn test_composite_takes_precedence() {
    let request = WorkerRequest::from_json(json!({
      "package_name": "openalea.math",
      "node_name": "addition",
      "composite": {"graph": {"nodes": [{"id": "n1"}]}}
    }))
    .unwrap();
    assert!(matches!(request, WorkerRequest::Composite { .. }));

    let request = WorkerRequest::from_json(json!({
      "package_name": "openalea.math",
      "node_name": "addition",
      "composite": {}
    }))
    .unwrap();
    assert!(matches!(request, WorkerRequest::Node { .. }));
  }

  #[test]
  fn test_invalid_requests() {
    let err = WorkerRequest::from_json(json!({"node_name": "addition"})).unwrap_err();
    assert_eq!(
      err.to_string(),
      "package_name and node_name are required for simple nodes"
    );
    assert!(WorkerRequest::from_json(json!([1])).is_err());
    assert!(
      WorkerRequest::from_json(json!({"package_name": "p", "node_name": "n", "inputs": [1]})).is_err()
    );
    assert!(parse_line("not json").is_err());
  }
}

use std::collections::BTreeMap;

use serde_json::json;
use webalea_value::{NdArray, Value};

use super::{arg, as_f64};
use crate::error::RegistryError;
use crate::memory::{MemoryPackage, SimpleFactory};

pub(super) fn package() -> MemoryPackage {
  MemoryPackage::new("openalea.data")
    .with_node(
      SimpleFactory::new("identity", |inputs| Ok(vec![arg(inputs, 0).clone()]))
        .with_description("Pass the input through unchanged")
        .with_inputs(json!(["x"]))
        .with_outputs(json!(["x"])),
    )
    .with_node(
      SimpleFactory::new("list", |inputs| {
        Ok(vec![Value::List(
          inputs.iter().filter(|v| !v.is_none()).cloned().collect(),
        )])
      })
      .with_description("Collect the connected inputs into a list")
      .with_inputs(json!(["a", "b", "c"]))
      .with_outputs(json!(["list"])),
    )
    .with_node(
      SimpleFactory::new("dict", |inputs| dict(arg(inputs, 0), arg(inputs, 1)).map(|v| vec![v]))
        .with_description("Build a dictionary from a list of keys and a list of values")
        .with_inputs(json!([
          {"name": "keys", "interface": "ISequence"},
          {"name": "values", "interface": "ISequence"},
        ]))
        .with_outputs(json!(["dict"])),
    )
    .with_node(
      SimpleFactory::new("array", |inputs| array(arg(inputs, 0)).map(|v| vec![v]))
        .with_description("Numeric array from a flat list of numbers")
        .with_inputs(json!([{"name": "values", "interface": "ISequence"}]))
        .with_outputs(json!(["array"])),
    )
}

fn items(value: &Value) -> Option<&[Value]> {
  match value {
    Value::List(items) | Value::Tuple(items) => Some(items.as_slice()),
    Value::None => Some(&[][..]),
    _ => None,
  }
}

fn dict(keys: &Value, values: &Value) -> Result<Value, RegistryError> {
  let (Some(keys), Some(values)) = (items(keys), items(values)) else {
    return Err(RegistryError::Evaluation(
      "dict expects a sequence of keys and a sequence of values".to_string(),
    ));
  };
  let map: BTreeMap<String, Value> = keys
    .iter()
    .zip(values)
    .map(|(k, v)| {
      let key = match k {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
      };
      (key, v.clone())
    })
    .collect();
  Ok(Value::Map(map))
}

fn array(values: &Value) -> Result<Value, RegistryError> {
  if let Value::Array(array) = values {
    return Ok(Value::Array(array.clone()));
  }
  let numbers = items(values)
    .and_then(|items| items.iter().map(as_f64).collect::<Option<Vec<_>>>())
    .ok_or_else(|| RegistryError::Evaluation("array expects a list of numbers".to_string()))?;
  Ok(Value::Array(NdArray::vector(numbers)))
}

use serde_json::json;
use webalea_value::Value;

use super::{arg, as_f64};
use crate::error::RegistryError;
use crate::memory::{MemoryPackage, SimpleFactory};

pub(super) fn package() -> MemoryPackage {
  MemoryPackage::new("openalea.math")
    .with_node(binary("addition", "a + b", '+'))
    .with_node(binary("subtraction", "a - b", '-'))
    .with_node(binary("multiplication", "a * b", '*'))
    .with_node(binary("division", "a / b", '/'))
    .with_node(
      SimpleFactory::new("negation", |inputs| negate(arg(inputs, 0)).map(|v| vec![v]))
        .with_description("-a")
        .with_inputs(json!([{"name": "a", "interface": "IFloat", "value": 0}]))
        .with_outputs(json!([{"name": "result", "interface": "IFloat"}])),
    )
}

fn binary(name: &str, description: &str, op: char) -> SimpleFactory {
  SimpleFactory::new(name, move |inputs| {
    apply(op, arg(inputs, 0), arg(inputs, 1)).map(|v| vec![v])
  })
  .with_description(description)
  .with_inputs(json!([
    {"name": "a", "interface": "IFloat", "value": 0},
    {"name": "b", "interface": "IFloat", "value": 0},
  ]))
  .with_outputs(json!([{"name": "result", "interface": "IFloat"}]))
}

fn apply(op: char, a: &Value, b: &Value) -> Result<Value, RegistryError> {
  match (op, a, b) {
    ('+', Value::Str(x), Value::Str(y)) => return Ok(Value::Str(format!("{}{}", x, y))),
    ('+', Value::List(x), Value::List(y)) => {
      return Ok(Value::List(x.iter().chain(y).cloned().collect()));
    }
    ('/', _, _) => {
      let (x, y) = operands(op, a, b)?;
      if y == 0.0 {
        return Err(RegistryError::Evaluation("division by zero".to_string()));
      }
      return Ok(Value::Float(x / y));
    }
    _ => {}
  }

  if let (Value::Int(x), Value::Int(y)) = (a, b) {
    let result = match op {
      '+' => x.checked_add(*y),
      '-' => x.checked_sub(*y),
      _ => x.checked_mul(*y),
    };
    if let Some(result) = result {
      return Ok(Value::Int(result));
    }
  }

  let (x, y) = operands(op, a, b)?;
  Ok(Value::Float(match op {
    '+' => x + y,
    '-' => x - y,
    _ => x * y,
  }))
}

fn operands(op: char, a: &Value, b: &Value) -> Result<(f64, f64), RegistryError> {
  match (as_f64(a), as_f64(b)) {
    (Some(x), Some(y)) => Ok((x, y)),
    _ => Err(RegistryError::Evaluation(format!(
      "unsupported operand type(s) for {}: '{}' and '{}'",
      op,
      a.type_name(),
      b.type_name()
    ))),
  }
}

fn negate(a: &Value) -> Result<Value, RegistryError> {
  match a {
    Value::Int(i) => Ok(i.checked_neg().map(Value::Int).unwrap_or(Value::Float(-(*i as f64)))),
    Value::Float(x) => Ok(Value::Float(-x)),
    other => Err(RegistryError::Evaluation(format!(
      "bad operand type for unary -: '{}'",
      other.type_name()
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_integer_arithmetic_stays_integer() {
    assert_eq!(apply('+', &Value::Int(5), &Value::Int(3)).unwrap(), Value::Int(8));
    assert_eq!(apply('-', &Value::Int(5), &Value::Int(3)).unwrap(), Value::Int(2));
    assert_eq!(apply('*', &Value::Int(5), &Value::Int(3)).unwrap(), Value::Int(15));
    assert_eq!(apply('/', &Value::Int(6), &Value::Int(3)).unwrap(), Value::Float(2.0));
  }

  #[test]
  fn test_mixed_and_overflow_widen() {
    assert_eq!(
      apply('+', &Value::Int(1), &Value::Float(0.5)).unwrap(),
      Value::Float(1.5)
    );
    assert_eq!(
      apply('+', &Value::Int(i64::MAX), &Value::Int(1)).unwrap(),
      Value::Float(i64::MAX as f64 + 1.0)
    );
  }

  #[test]
  fn test_concatenation() {
    assert_eq!(
      apply('+', &Value::from("ab"), &Value::from("cd")).unwrap(),
      Value::from("abcd")
    );
  }

  #[test]
  fn test_errors() {
    assert_eq!(
      apply('/', &Value::Int(1), &Value::Int(0)).unwrap_err(),
      RegistryError::Evaluation("division by zero".to_string())
    );
    assert!(apply('+', &Value::None, &Value::Int(1)).is_err());
    assert!(negate(&Value::from("x")).is_err());
    assert_eq!(negate(&Value::Int(2)).unwrap(), Value::Int(-2));
  }
}

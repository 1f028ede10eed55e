//! Output handle parsing.
//!
//! Editor handles encode an output position in a few ways, e.g.
//! `node-3_port_1_out`, `output_2` or `sum-0`.

/// Numeric output index encoded in a handle, if any.
///
/// Patterns are tried in order: `port_<i>_` anywhere, `output_<i>` anywhere,
/// then a trailing `-<i>`.
pub fn parse_output_index(handle: &str) -> Option<usize> {
  digits_between(handle, "port_", true)
    .or_else(|| digits_between(handle, "output_", false))
    .or_else(|| trailing_index(handle))
}

/// First occurrence of `prefix` followed by digits (and `_` when
/// `needs_underscore`).
fn digits_between(handle: &str, prefix: &str, needs_underscore: bool) -> Option<usize> {
  handle.match_indices(prefix).find_map(|(start, _)| {
    let rest = &handle[start + prefix.len()..];
    let len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
      return None;
    }
    if needs_underscore && rest.as_bytes().get(len) != Some(&b'_') {
      return None;
    }
    rest[..len].parse().ok()
  })
}

fn trailing_index(handle: &str) -> Option<usize> {
  let digits = handle.bytes().rev().take_while(u8::is_ascii_digit).count();
  if digits == 0 {
    return None;
  }
  let split = handle.len() - digits;
  if !handle[..split].ends_with('-') {
    return None;
  }
  handle[split..].parse().ok()
}

const NAMESPACE_PREFIX: &str = "openalea.";

/// Resolve a caller-supplied package name to a registry key.
///
/// Tries the name as given, then without the `openalea.` prefix, then with it.
pub fn normalize_package_name(name: &str, keys: &[String]) -> Option<String> {
  let known = |candidate: &str| keys.iter().any(|key| key == candidate);

  if known(name) {
    return Some(name.to_string());
  }

  if let Some(short) = name.strip_prefix(NAMESPACE_PREFIX) {
    if known(short) {
      return Some(short.to_string());
    }
  }

  let prefixed = format!("{}{}", NAMESPACE_PREFIX, name);
  if known(&prefixed) {
    return Some(prefixed);
  }

  None
}

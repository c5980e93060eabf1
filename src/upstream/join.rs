//! URL joining for relayed requests.
//!
//! The inbound path is appended to the proxy base rather than resolved against it:
//! `http://host/api` + `/users` gives `http://host/api/users`, not `http://host/users`.

/// Append `path` to `base` with exactly one `/` between them.
///
/// Trailing slashes on `base` and leading slashes on `path` collapse into a single
/// separator. A trailing `/` on `path` is dropped. Query strings pass through.
pub fn join(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let path = path.strip_suffix('/').unwrap_or(path);

    let mut joined = String::with_capacity(base.len() + path.len() + 1);
    joined.push_str(base);
    joined.push('/');
    joined.push_str(path);
    joined
}

//! Path helpers shared by the shell and storage

/// Resolves `path` against `cwd` into an absolute, normalized path
///
/// `.` and empty segments are dropped, `..` pops a segment (never above `/`).
pub fn normalize_path(cwd: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd, path)
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    format!("/{}", parts.join("/"))
}

/// Returns the parent of an absolute path (`/` for top-level entries)
pub fn parent_path(path: &str) -> String {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Returns the last segment of a path (empty for `/`)
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_relative() {
        assert_eq!(normalize_path("/home/user", "notes.txt"), "/home/user/notes.txt");
        assert_eq!(normalize_path("/home/user", "../other"), "/home/other");
        assert_eq!(normalize_path("/home/user", "./a/./b"), "/home/user/a/b");
    }

    #[test]
    fn test_normalize_absolute_and_root() {
        assert_eq!(normalize_path("/home", "/tmp//f"), "/tmp/f");
        assert_eq!(normalize_path("/", ".."), "/");
        assert_eq!(normalize_path("/", "/"), "/");
    }

    #[test]
    fn test_parent_and_file_name() {
        assert_eq!(parent_path("/tmp/f"), "/tmp");
        assert_eq!(parent_path("/tmp"), "/");
        assert_eq!(parent_path("/"), "/");
        assert_eq!(file_name("/tmp/f"), "f");
        assert_eq!(file_name("/"), "");
    }
}

/// PathNormalizer - canonicalizes scanner-reported paths
///
/// Normalization is purely lexical: the filesystem is never consulted, so a
/// symlink inside an extracted archive cannot redirect a path out of the scan
/// root. Output always uses `/` as the separator, whatever the host platform
/// or the separator style in the scanner report.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    base_dir: String,
}

impl PathNormalizer {
    /// Creates a normalizer that resolves relative inputs against `base_dir`
    pub fn new(base_dir: impl AsRef<str>) -> Self {
        let unified = base_dir.as_ref().replace('\\', "/");
        let anchored = if split_root(&unified).is_some() {
            unified
        } else {
            format!("/{}", unified)
        };
        let base_dir = match split_root(&anchored) {
            Some((root, rest)) => resolve(&root, rest),
            None => "/".to_string(),
        };
        Self { base_dir }
    }

    /// Creates a normalizer anchored at the process working directory,
    /// falling back to `/` when it cannot be determined
    pub fn from_current_dir() -> Self {
        let cwd = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "/".to_string());
        Self::new(cwd)
    }

    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// Resolves `path` to an absolute, `/`-separated form with `.` and `..`
    /// folded away. `..` never climbs above the filesystem root.
    pub fn normalize(&self, path: &str) -> String {
        let unified = path.replace('\\', "/");
        match split_root(&unified) {
            Some((root, rest)) => resolve(&root, rest),
            None => self.normalize(&format!("{}/{}", self.base_dir, unified)),
        }
    }

    /// Expresses `path` relative to `root` when it lies inside it
    ///
    /// Relative inputs are read as relative to `root`, which makes the
    /// operation idempotent. Paths outside `root` come back as their
    /// normalized absolute form. This never fails: an unresolvable path only
    /// loses precision.
    pub fn relativize(&self, path: &str, root: &str) -> String {
        let root_norm = self.normalize(root);
        let unified = path.replace('\\', "/");
        let absolute = if split_root(&unified).is_some() {
            self.normalize(&unified)
        } else {
            self.normalize(&format!("{}/{}", root_norm, unified))
        };

        match strip_root(&absolute, &root_norm) {
            Some(relative) if relative.is_empty() => ".".to_string(),
            Some(relative) => relative,
            None => absolute,
        }
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::from_current_dir()
    }
}

/// Splits a `/`-separated path into its root marker and the remainder.
/// Returns `None` for relative paths.
fn split_root(path: &str) -> Option<(String, &str)> {
    if let Some(rest) = path.strip_prefix('/') {
        return Some(("/".to_string(), rest));
    }

    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let drive = &path[..2];
        return Some((format!("{}/", drive), &path[2..]));
    }

    None
}

fn resolve(root: &str, rest: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for component in rest.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    format!("{}{}", root, stack.join("/"))
}

/// Component-wise containment: `/scan/root2` is not inside `/scan/root`.
fn strip_root(path: &str, root: &str) -> Option<String> {
    let (path_root, path_rest) = split_root(path)?;
    let (root_root, root_rest) = split_root(root)?;
    if path_root != root_root {
        return None;
    }

    let mut path_components = path_rest.split('/').filter(|c| !c.is_empty());
    for root_component in root_rest.split('/').filter(|c| !c.is_empty()) {
        if path_components.next() != Some(root_component) {
            return None;
        }
    }

    Some(path_components.collect::<Vec<_>>().join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalizer() -> PathNormalizer {
        PathNormalizer::new("/work")
    }

    #[test]
    fn test_normalize_absolute_path() {
        assert_eq!(normalizer().normalize("/scan/root/lib/foo.jar"), "/scan/root/lib/foo.jar");
    }

    #[test]
    fn test_normalize_folds_dot_segments() {
        let n = normalizer();
        assert_eq!(n.normalize("/scan/./root/../root/lib//foo.jar"), "/scan/root/lib/foo.jar");
        assert_eq!(n.normalize("/../../etc"), "/etc");
        assert_eq!(n.normalize("/"), "/");
    }

    #[test]
    fn test_normalize_relative_uses_base_dir() {
        assert_eq!(normalizer().normalize("uploads/x"), "/work/uploads/x");
        assert_eq!(normalizer().normalize("../x"), "/x");
        assert_eq!(normalizer().normalize(""), "/work");
    }

    #[test]
    fn test_normalize_windows_separators_and_drive() {
        let n = normalizer();
        assert_eq!(n.normalize("C:\\scan\\root\\lib\\foo.jar"), "C:/scan/root/lib/foo.jar");
        assert_eq!(n.normalize("D:"), "D:/");
    }

    #[test]
    fn test_relative_base_dir_is_anchored() {
        let n = PathNormalizer::new("relative/base");
        assert_eq!(n.base_dir(), "/relative/base");
    }

    #[test]
    fn test_relativize_inside_root() {
        assert_eq!(
            normalizer().relativize("/scan/root/lib/foo.jar", "/scan/root"),
            "lib/foo.jar"
        );
    }

    #[test]
    fn test_relativize_windows_report_path() {
        assert_eq!(
            normalizer().relativize("C:\\scan\\root\\lib\\foo.jar", "C:/scan/root"),
            "lib/foo.jar"
        );
    }

    #[test]
    fn test_relativize_outside_root_falls_back_to_absolute() {
        let n = normalizer();
        assert_eq!(n.relativize("/opt/other/foo.jar", "/scan/root"), "/opt/other/foo.jar");
        assert_eq!(n.relativize("/scan/root2/foo.jar", "/scan/root"), "/scan/root2/foo.jar");
        assert_eq!(n.relativize("/scan/root/../x.jar", "/scan/root"), "/scan/x.jar");
    }

    #[test]
    fn test_relativize_root_itself() {
        assert_eq!(normalizer().relativize("/scan/root/", "/scan/root"), ".");
        assert_eq!(normalizer().relativize("", "/scan/root"), ".");
    }

    #[test]
    fn test_relativize_is_idempotent_for_relative_input() {
        let n = normalizer();
        let once = n.relativize("/scan/root/lib/foo.jar", "/scan/root");
        assert_eq!(n.relativize(&once, "/scan/root"), once);
    }

    #[test]
    fn test_relativize_relative_escape_returns_absolute() {
        assert_eq!(normalizer().relativize("../../etc/passwd", "/scan/root"), "/etc/passwd");
    }

    #[test]
    fn test_relativize_different_drive() {
        assert_eq!(
            normalizer().relativize("D:/lib/foo.jar", "C:/scan/root"),
            "D:/lib/foo.jar"
        );
    }

    proptest! {
        #[test]
        fn relativize_is_idempotent(components in prop::collection::vec("[a-zA-Z0-9_.-]{1,8}", 1..6)) {
            prop_assume!(components.iter().all(|c| c != "." && c != ".."));
            let n = normalizer();
            let relative = components.join("/");
            let once = n.relativize(&relative, "/scan/root");
            prop_assert_eq!(&once, &relative);
            prop_assert_eq!(n.relativize(&once, "/scan/root"), once);
        }

        #[test]
        fn relativize_never_fails(path in ".{0,64}", root in ".{0,32}") {
            let n = normalizer();
            let result = n.relativize(&path, &root);
            prop_assert!(!result.is_empty());

            let root_norm = n.normalize(&root);
            let unified = path.replace('\\', "/");
            let absolute = if split_root(&unified).is_some() {
                n.normalize(&unified)
            } else {
                n.normalize(&format!("{}/{}", root_norm, unified))
            };
            let rejoined = n.normalize(&format!("{}/{}", root_norm, result));
            prop_assert!(result == absolute || rejoined == absolute);
        }
    }
}

use sdk::errors::EngineError;
use std::path::{Component, Path, PathBuf};

/// FileSystemGuard confines filesystem modules to the configured workspace.
///
/// It maintains a deny list of sensitive paths and performs double canonicalization checks
/// to prevent symlink-based bypass attacks.
///
/// # Security Model
///
/// The guard implements a four-gate validation process:
/// 1. Check deny list before canonicalization
/// 2. Canonicalize path to resolve symlinks and .. patterns
/// 3. Check deny list after canonicalization
/// 4. Verify path is within workspace
///
/// Paths that do not exist yet (archive folders, move destinations) are
/// validated through their nearest existing ancestor.
#[derive(Debug)]
pub struct FileSystemGuard {
    workspace: PathBuf,
    deny_list: Vec<PathBuf>,
}

impl FileSystemGuard {
    /// Creates a new FileSystemGuard for the specified workspace directory.
    ///
    /// The deny list includes common sensitive paths such as `.ssh`, `.env`,
    /// cloud credentials and private keys.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PathCanonicalization` if the workspace does not
    /// exist or is inaccessible.
    pub fn new(workspace: PathBuf) -> Result<Self, EngineError> {
        // Canonicalize workspace to handle symlinks (e.g., /var -> /private/var on macOS)
        let workspace = workspace
            .canonicalize()
            .map_err(|e| EngineError::PathCanonicalization(workspace.clone(), e.to_string()))?;

        let deny_list = vec![
            PathBuf::from(".ssh"),
            PathBuf::from(".env"),
            PathBuf::from(".aws/credentials"),
            PathBuf::from(".config/gcloud"),
            PathBuf::from("id_rsa"),
            PathBuf::from("id_ed25519"),
            PathBuf::from("id_dsa"),
            PathBuf::from(".gnupg"),
            PathBuf::from(".kube/config"),
            PathBuf::from("credentials"),
            PathBuf::from("private_key"),
        ];

        Ok(Self {
            workspace,
            deny_list,
        })
    }

    /// Turn a user-supplied path into an absolute one.
    ///
    /// `~` expands to the home directory; relative paths are taken relative
    /// to the workspace. No validation happens here.
    pub fn absolutize(&self, raw: &str) -> PathBuf {
        let expanded = match raw.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
            None if raw == "~" => dirs::home_dir(),
            None => None,
        }
        .unwrap_or_else(|| PathBuf::from(raw));

        if expanded.is_absolute() {
            expanded
        } else {
            self.workspace.join(expanded)
        }
    }

    /// Validates an existing path through four security gates.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PathDenied` if the path matches the deny list.
    /// Returns `EngineError::PathCanonicalization` if canonicalization fails.
    /// Returns `EngineError::PathOutsideWorkspace` if the path is outside workspace.
    pub fn validate_path(&self, path: &Path) -> Result<PathBuf, EngineError> {
        // Gate 1: Check deny list before canonicalization
        if self.is_denied(path) {
            return Err(EngineError::PathDenied(path.to_path_buf()));
        }

        // Gate 2: Canonicalize to resolve symlinks and .. patterns
        let canonical = path
            .canonicalize()
            .map_err(|e| EngineError::PathCanonicalization(path.to_path_buf(), e.to_string()))?;

        // Gate 3: Check deny list after canonicalization (catches symlink bypasses)
        if self.is_denied(&canonical) {
            return Err(EngineError::PathDenied(canonical));
        }

        // Gate 4: Verify within workspace
        if !canonical.starts_with(&self.workspace) {
            return Err(EngineError::PathOutsideWorkspace(canonical));
        }

        Ok(canonical)
    }

    /// Validates a path that may not exist yet.
    ///
    /// The nearest existing ancestor goes through [`validate_path`]; the
    /// missing tail may not contain `..`.
    ///
    /// [`validate_path`]: FileSystemGuard::validate_path
    pub fn validate_new_path(&self, path: &Path) -> Result<PathBuf, EngineError> {
        self.check_denied(path)?;
        if path.exists() {
            return self.validate_path(path);
        }
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(EngineError::PathOutsideWorkspace(path.to_path_buf()));
        }

        let mut ancestor = path;
        let mut missing = Vec::new();
        while !ancestor.exists() {
            let name = ancestor.file_name().ok_or_else(|| {
                EngineError::PathCanonicalization(
                    path.to_path_buf(),
                    "no existing ancestor".to_string(),
                )
            })?;
            missing.push(name.to_os_string());
            ancestor = ancestor.parent().ok_or_else(|| {
                EngineError::PathCanonicalization(
                    path.to_path_buf(),
                    "no existing ancestor".to_string(),
                )
            })?;
        }

        let base = self.validate_path(ancestor)?;
        Ok(missing.iter().rev().fold(base, |acc, name| acc.join(name)))
    }

    /// Checks if a path matches any entry in the deny list.
    ///
    /// Matches when the path ends with a denied path or any component equals
    /// a denied entry, so `/tmp/.env` and `workspace/../.ssh/id_rsa` are both
    /// caught.
    fn is_denied(&self, path: &Path) -> bool {
        self.deny_list.iter().any(|denied| {
            path.ends_with(denied)
                || path.components().any(|c| {
                    c.as_os_str()
                        .to_str()
                        .zip(denied.as_os_str().to_str())
                        .is_some_and(|(component, d)| component == d)
                })
        })
    }

    /// Returns a reference to the workspace path.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Check if a path is denied without requiring it to exist on disk.
    pub fn check_denied(&self, path: &Path) -> Result<(), EngineError> {
        if self.is_denied(path) {
            return Err(EngineError::PathDenied(path.to_path_buf()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn guard(temp: &TempDir) -> FileSystemGuard {
        FileSystemGuard::new(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_missing_workspace_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = FileSystemGuard::new(temp.path().join("missing"));
        assert!(matches!(
            result.unwrap_err(),
            EngineError::PathCanonicalization(_, _)
        ));
    }

    #[test]
    fn test_deny_list_before_canonicalization() {
        let temp = TempDir::new().unwrap();
        let guard = guard(&temp);

        let result = guard.validate_path(&temp.path().join(".ssh"));
        assert!(matches!(result.unwrap_err(), EngineError::PathDenied(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_deny_list_after_canonicalization() {
        let temp = TempDir::new().unwrap();
        let ssh_dir = temp.path().join(".ssh");
        fs::create_dir(&ssh_dir).unwrap();

        let guard = guard(&temp);
        let symlink_path = temp.path().join("safe_link");
        std::os::unix::fs::symlink(&ssh_dir, &symlink_path).unwrap();

        let result = guard.validate_path(&symlink_path);
        assert!(matches!(result.unwrap_err(), EngineError::PathDenied(_)));
    }

    #[test]
    fn test_path_traversal_attempt() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("workspace");
        fs::create_dir(&workspace).unwrap();
        let guard = FileSystemGuard::new(workspace.clone()).unwrap();

        fs::write(temp.path().join("secret.txt"), "secret").unwrap();

        let result = guard.validate_path(&workspace.join("..").join("secret.txt"));
        assert!(matches!(
            result.unwrap_err(),
            EngineError::PathOutsideWorkspace(_)
        ));
    }

    #[test]
    fn test_absolutize_relative_to_workspace() {
        let temp = TempDir::new().unwrap();
        let guard = guard(&temp);

        let abs = guard.absolutize("docs/a.txt");
        assert_eq!(abs, guard.workspace().join("docs/a.txt"));
        assert_eq!(guard.absolutize("/etc"), PathBuf::from("/etc"));
    }

    #[test]
    fn test_validate_new_path_inside_workspace() {
        let temp = TempDir::new().unwrap();
        let guard = guard(&temp);

        let target = guard.workspace().join("archive").join("2024");
        let validated = guard.validate_new_path(&target).unwrap();
        assert_eq!(validated, target);
    }

    #[test]
    fn test_validate_new_path_rejects_traversal_and_outside() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("workspace");
        fs::create_dir(&workspace).unwrap();
        let guard = FileSystemGuard::new(workspace.clone()).unwrap();

        let traversal = workspace.join("new").join("..").join("..").join("x");
        assert!(guard.validate_new_path(&traversal).is_err());

        let outside = temp.path().join("elsewhere").join("archive");
        assert!(matches!(
            guard.validate_new_path(&outside).unwrap_err(),
            EngineError::PathOutsideWorkspace(_)
        ));
    }
}

//! Working-tree file probe for import resolution.

use std::path::PathBuf;

use crate::core::dependencies::FileProbe;

/// Probes files relative to the repository root.
#[derive(Debug, Clone)]
pub struct RepoFiles {
    root: PathBuf,
}

impl RepoFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileProbe for RepoFiles {
    fn is_file(&self, rel_path: &str) -> bool {
        self.root.join(rel_path).is_file()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn probes_relative_to_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("pkg")).expect("mkdir");
        fs::write(temp.path().join("pkg/__init__.py"), "").expect("write");
        let probe = RepoFiles::new(temp.path());
        assert!(probe.is_file("pkg/__init__.py"));
        assert!(!probe.is_file("pkg"));
        assert!(!probe.is_file("pkg.py"));
    }
}

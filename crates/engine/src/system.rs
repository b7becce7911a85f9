//! System abstraction for filesystem operations
//!
//! Rules never touch the filesystem directly. They go through a
//! [`FileSystem`] handle rooted at the source and build directories, which
//! allows the dry-run mode to record writes instead of performing them.

use crate::error::{Error, Result};
use jssg_core::path::{AbsPath, RelPath};
use std::cell::RefCell;
use std::fs;
use walkdir::WalkDir;

/// Abstraction over the source and build trees
///
/// Reads resolve against the source root, writes against the build root.
///
/// This trait allows us to implement different backends:
/// - `RealFileSystem`: Actual filesystem operations
/// - `DryRunFileSystem`: Reads the real source tree, records writes
pub trait FileSystem {
    /// Root of the source tree
    fn source_root(&self) -> &AbsPath;

    /// Root of the build tree
    fn build_root(&self) -> &AbsPath;

    /// Absolute location of a source-relative path
    fn resolve_source(&self, path: &RelPath) -> AbsPath {
        self.source_root().join(path)
    }

    /// Absolute location of a build-relative path
    fn resolve_build(&self, path: &RelPath) -> AbsPath {
        self.build_root().join(path)
    }

    /// List every file under the source root (or under `subdir` of it)
    ///
    /// Paths are relative to the source root and sorted by file name
    /// within each directory.
    fn list_files(&self, subdir: Option<&RelPath>) -> Result<Vec<RelPath>>;

    /// Read a source file
    fn read(&self, path: &RelPath) -> Result<Vec<u8>>;

    /// Read a source file as UTF-8 text
    fn read_to_string(&self, path: &RelPath) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| Error::InvalidUtf8 {
            path: self.resolve_source(path),
            source: e,
        })
    }

    /// Write a build file, creating parent directories as needed
    fn write(&self, path: &RelPath, content: &[u8]) -> Result<()>;

    /// Copy a source file to a build file, creating parent directories as needed
    fn copy(&self, input: &RelPath, output: &RelPath) -> Result<()>;

    /// Check if a source file exists
    fn exists(&self, path: &RelPath) -> bool {
        self.resolve_source(path).as_path().exists()
    }
}

/// Real filesystem implementation
///
/// This implementation performs actual filesystem operations.
#[derive(Debug, Clone)]
pub struct RealFileSystem {
    source: AbsPath,
    build: AbsPath,
}

impl RealFileSystem {
    /// Create a filesystem rooted at the given source and build directories
    pub fn new(source: AbsPath, build: AbsPath) -> Self {
        Self { source, build }
    }

    fn create_parent(path: &AbsPath) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_path()).map_err(|e| Error::DirectoryCreate {
                path: parent.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

impl FileSystem for RealFileSystem {
    fn source_root(&self) -> &AbsPath {
        &self.source
    }

    fn build_root(&self) -> &AbsPath {
        &self.build
    }

    fn list_files(&self, subdir: Option<&RelPath>) -> Result<Vec<RelPath>> {
        let root = match subdir {
            Some(subdir) => self.source.join(subdir),
            None => self.source.clone(),
        };

        let mut files = Vec::new();
        for entry in WalkDir::new(root.as_path())
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::Walk {
                path: root.clone(),
                source: e,
            })?;

            // Only files, including symlinks that point at files
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let abs = AbsPath::from_path(entry.path())?;
            files.push(abs.strip_prefix(&self.source)?);
        }

        Ok(files)
    }

    fn read(&self, path: &RelPath) -> Result<Vec<u8>> {
        let abs = self.resolve_source(path);
        fs::read(abs.as_path()).map_err(|e| Error::FileRead {
            path: abs,
            source: e,
        })
    }

    fn write(&self, path: &RelPath, content: &[u8]) -> Result<()> {
        let abs = self.resolve_build(path);
        Self::create_parent(&abs)?;

        fs::write(abs.as_path(), content).map_err(|e| Error::FileWrite {
            path: abs,
            source: e,
        })
    }

    fn copy(&self, input: &RelPath, output: &RelPath) -> Result<()> {
        let from = self.resolve_source(input);
        let to = self.resolve_build(output);
        Self::create_parent(&to)?;

        fs::copy(from.as_path(), to.as_path()).map_err(|e| Error::FileWrite {
            path: to,
            source: e,
        })?;
        Ok(())
    }
}

/// An operation that would be performed on the build tree
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Write a file
    Write {
        /// Build-relative output path
        path: RelPath,
        /// Bytes written
        size: usize,
    },
    /// Copy a source file
    Copy {
        /// Source-relative input path
        from: RelPath,
        /// Build-relative output path
        to: RelPath,
    },
}

impl Operation {
    /// Build-relative path the operation targets
    pub fn target(&self) -> &RelPath {
        match self {
            Operation::Write { path, .. } => path,
            Operation::Copy { to, .. } => to,
        }
    }
}

/// Dry-run filesystem that records operations without executing them
///
/// Reads still come from the real source tree, so rules behave exactly as
/// in a real build up to the point of writing.
#[derive(Debug)]
pub struct DryRunFileSystem {
    inner: RealFileSystem,
    operations: RefCell<Vec<Operation>>,
}

impl DryRunFileSystem {
    /// Create a new dry-run filesystem
    pub fn new(source: AbsPath, build: AbsPath) -> Self {
        Self {
            inner: RealFileSystem::new(source, build),
            operations: RefCell::new(Vec::new()),
        }
    }

    /// Get the list of operations that would be performed
    pub fn operations(&self) -> Vec<Operation> {
        self.operations.borrow().clone()
    }

    /// Record an operation
    fn record(&self, op: Operation) {
        self.operations.borrow_mut().push(op);
    }
}

impl FileSystem for DryRunFileSystem {
    fn source_root(&self) -> &AbsPath {
        self.inner.source_root()
    }

    fn build_root(&self) -> &AbsPath {
        self.inner.build_root()
    }

    fn list_files(&self, subdir: Option<&RelPath>) -> Result<Vec<RelPath>> {
        self.inner.list_files(subdir)
    }

    fn read(&self, path: &RelPath) -> Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn write(&self, path: &RelPath, content: &[u8]) -> Result<()> {
        self.record(Operation::Write {
            path: path.clone(),
            size: content.len(),
        });
        Ok(())
    }

    fn copy(&self, input: &RelPath, output: &RelPath) -> Result<()> {
        self.record(Operation::Copy {
            from: input.clone(),
            to: output.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::TempDir;

    fn roots(temp: &TempDir) -> (AbsPath, AbsPath) {
        let source = temp.path().join("src");
        let build = temp.path().join("build");
        fs::create_dir_all(&source).unwrap();
        (
            AbsPath::new(source).unwrap(),
            AbsPath::new(build).unwrap(),
        )
    }

    fn rel(s: &str) -> RelPath {
        RelPath::parse(s).unwrap()
    }

    #[test]
    fn test_list_files_sorted_and_relative() {
        let temp = TempDir::new().unwrap();
        let (source, build) = roots(&temp);
        fs::create_dir_all(source.as_path().join("posts")).unwrap();
        fs::write(source.as_path().join("index.html"), "").unwrap();
        fs::write(source.as_path().join("posts/b.md"), "").unwrap();
        fs::write(source.as_path().join("posts/a.md"), "").unwrap();

        let fs = RealFileSystem::new(source, build);
        let files: Vec<String> = fs
            .list_files(None)
            .unwrap()
            .iter()
            .map(RelPath::to_slash_string)
            .collect();

        assert_eq!(files, vec!["index.html", "posts/a.md", "posts/b.md"]);
    }

    #[test]
    fn test_list_files_in_subdir() {
        let temp = TempDir::new().unwrap();
        let (source, build) = roots(&temp);
        fs::create_dir_all(source.as_path().join("posts")).unwrap();
        fs::write(source.as_path().join("index.html"), "").unwrap();
        fs::write(source.as_path().join("posts/a.md"), "").unwrap();

        let fs = RealFileSystem::new(source, build);
        let files = fs.list_files(Some(&rel("posts"))).unwrap();

        assert_eq!(files, vec![rel("posts/a.md")]);
    }

    #[test]
    fn test_list_files_missing_subdir_is_walk_error() {
        let temp = TempDir::new().unwrap();
        let (source, build) = roots(&temp);

        let fs = RealFileSystem::new(source, build);
        let err = fs.list_files(Some(&rel("nope"))).unwrap_err();
        assert!(matches!(err, Error::Walk { .. }));
    }

    #[test]
    fn test_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let (source, build) = roots(&temp);

        let fs = RealFileSystem::new(source, build.clone());
        fs.write(&rel("a/b/c.txt"), b"hello").unwrap();

        let written = std::fs::read_to_string(build.as_path().join("a/b/c.txt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[test]
    fn test_copy() {
        let temp = TempDir::new().unwrap();
        let (source, build) = roots(&temp);
        fs::write(source.as_path().join("style.css"), "body {}").unwrap();

        let fs = RealFileSystem::new(source, build.clone());
        fs.copy(&rel("style.css"), &rel("css/style.css")).unwrap();

        let copied = std::fs::read_to_string(build.as_path().join("css/style.css")).unwrap();
        assert_eq!(copied, "body {}");
    }

    #[test]
    fn test_read_to_string_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        let (source, build) = roots(&temp);
        fs::write(source.as_path().join("bin.dat"), [0xff, 0xfe]).unwrap();

        let fs = RealFileSystem::new(source, build);
        assert!(matches!(
            fs.read_to_string(&rel("bin.dat")),
            Err(Error::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_dry_run_records_instead_of_writing() {
        let temp = TempDir::new().unwrap();
        let (source, build) = roots(&temp);
        fs::write(source.as_path().join("a.txt"), "abc").unwrap();

        let fs = DryRunFileSystem::new(source, build.clone());
        assert_eq!(fs.read_to_string(&rel("a.txt")).unwrap(), "abc");
        fs.write(&rel("out.txt"), b"12345").unwrap();
        fs.copy(&rel("a.txt"), &rel("b.txt")).unwrap();

        assert!(!build.as_path().exists());
        assert_eq!(
            fs.operations(),
            vec![
                Operation::Write {
                    path: rel("out.txt"),
                    size: 5
                },
                Operation::Copy {
                    from: rel("a.txt"),
                    to: rel("b.txt")
                },
            ]
        );
    }
}

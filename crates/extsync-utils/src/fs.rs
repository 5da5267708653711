use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{FileSystemError, FileSystemResult};

pub trait FileSystemProvider {
    /// Removes the specified file, symlink or directory safely.
    ///
    /// If nothing exists at the path, this function returns `Ok(())` without error. Dangling
    /// symlinks are removed as well. A directory is removed recursively, equivalent to
    /// [`std::fs::remove_dir_all`]. Symlinks are never followed.
    ///
    /// # Errors
    ///
    /// Returns a [`FileSystemError::File`] if the removal fails for any reason other than
    /// the path not existing (e.g., permission denied).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use extsync_utils::error::FileSystemResult;
    /// use extsync_utils::fs::{FileSystemProvider, StandardFileSystemProvider};
    ///
    /// fn main() -> FileSystemResult<()> {
    ///     let fs = StandardFileSystemProvider;
    ///     fs.safe_remove("/tmp/some_path")?;
    ///     Ok(())
    /// }
    /// ```
    fn safe_remove<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()>;

    /// Creates a directory structure if it doesn't exist.
    ///
    /// If the directory already exists, this function does nothing. If the path exists but is
    /// not a directory, this function returns an error.
    ///
    /// # Errors
    ///
    /// * [`FileSystemError::Directory`] if the directory could not be created.
    /// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
    fn ensure_dir_exists<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()>;

    /// Creates a symbolic link at `link` pointing to `target`.
    ///
    /// # Errors
    ///
    /// * [`FileSystemError::Symlink`] if the link could not be created.
    /// * [`FileSystemError::Unsupported`] on platforms without symlink support.
    fn create_symlink<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        target: P,
        link: Q,
    ) -> FileSystemResult<()>;
}

#[derive(Default, Clone)]
pub struct StandardFileSystemProvider;

impl FileSystemProvider for StandardFileSystemProvider {
    fn safe_remove<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()> {
        let path = path.as_ref();

        let Ok(metadata) = fs::symlink_metadata(path) else {
            return Ok(());
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        result.map_err(|err| {
            FileSystemError::File {
                path: path.to_path_buf(),
                action: "remove",
                source: err,
            }
        })
    }

    fn ensure_dir_exists<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).map_err(|err| {
                FileSystemError::Directory {
                    path: path.to_path_buf(),
                    action: "create",
                    source: err,
                }
            })?;
        } else if !path.is_dir() {
            return Err(FileSystemError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        Ok(())
    }

    #[cfg(unix)]
    fn create_symlink<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        target: P,
        link: Q,
    ) -> FileSystemResult<()> {
        let (target, link) = (target.as_ref(), link.as_ref());
        std::os::unix::fs::symlink(target, link).map_err(|err| {
            FileSystemError::Symlink {
                from: link.to_path_buf(),
                target: target.to_path_buf(),
                source: err,
            }
        })
    }

    #[cfg(not(unix))]
    fn create_symlink<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        _target: P,
        _link: Q,
    ) -> FileSystemResult<()> {
        Err(FileSystemError::Unsupported {
            operation: "Symbolic linking",
        })
    }
}

/// Creates a directory structure if it doesn't exist.
///
/// See [`FileSystemProvider::ensure_dir_exists`] for detailed documentation.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    StandardFileSystemProvider.ensure_dir_exists(path)
}

/// Removes the specified file, symlink or directory safely.
///
/// See [`FileSystemProvider::safe_remove`] for detailed documentation.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    StandardFileSystemProvider.safe_remove(path)
}

/// Creates a symbolic link at `link` pointing to `target`.
///
/// See [`FileSystemProvider::create_symlink`] for detailed documentation.
pub fn create_symlink<P: AsRef<Path>, Q: AsRef<Path>>(target: P, link: Q) -> FileSystemResult<()> {
    StandardFileSystemProvider.create_symlink(target, link)
}

/// Returns the target of the symlink at `path`, or `None` when the path is missing or is not a
/// symlink.
pub fn read_link_target<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    fs::read_link(path).ok()
}

/// Renames `from` over `to`, replacing any existing file.
pub fn replace_file<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> FileSystemResult<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    fs::rename(from, to).map_err(|err| {
        FileSystemError::File {
            path: to.to_path_buf(),
            action: "replace",
            source: err,
        }
    })
}

//! On-disk collection of containers.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::ArchiveHandle;
use crate::config::StoreConfig;
use crate::error::{ContainerError, ContainerResult};
use crate::naming::{
    check_container_name, container_file_name, is_meta_path, is_noise, parse_container_file_name,
};

/// Directory of `<name>.zip` containers plus the source tree new ones are built from.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    containers_dir: PathBuf,
    source_dir: PathBuf,
}

impl ArchiveStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            containers_dir: config.containers_dir.clone(),
            source_dir: config.source_dir.clone(),
        }
    }

    pub fn containers_dir(&self) -> &Path {
        &self.containers_dir
    }

    pub fn container_path(&self, name: &str) -> PathBuf {
        self.containers_dir.join(container_file_name(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        check_container_name(name).is_ok() && self.container_path(name).is_file()
    }

    /// Compress the current source tree into a new container named `name`.
    ///
    /// Returns the number of files written. Fails with `NameConflict` if the
    /// name is taken; nothing is written in that case.
    pub fn create(&self, name: &str) -> ContainerResult<usize> {
        check_container_name(name).map_err(ContainerError::validation)?;

        if self.exists(name) {
            return Err(ContainerError::NameConflict {
                name: name.to_string(),
            });
        }

        fs::create_dir_all(&self.containers_dir)
            .map_err(|e| ContainerError::io(&self.containers_dir, e))?;

        let files = collect_source_files(&self.source_dir)?;
        let mut handle = ArchiveHandle::new_container(name, &self.container_path(name));
        for (relative, absolute) in &files {
            let bytes = fs::read(absolute).map_err(|e| ContainerError::io(absolute, e))?;
            handle.put(relative.clone(), bytes);
        }
        handle.commit()?;

        info!(container = name, files = files.len(), "created container");
        Ok(files.len())
    }

    /// Names of all containers, sorted.
    pub fn list(&self) -> ContainerResult<Vec<String>> {
        let read_dir = match fs::read_dir(&self.containers_dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ContainerError::io(&self.containers_dir, e)),
        };

        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| ContainerError::io(&self.containers_dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| ContainerError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                debug!(path = %entry.path().display(), "skipping non-UTF-8 file name");
                continue;
            };
            if let Some(name) = parse_container_file_name(file_name) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Open an existing container for staged edits.
    pub fn open_for_mutation(&self, name: &str) -> ContainerResult<ArchiveHandle> {
        check_container_name(name).map_err(ContainerError::validation)?;
        ArchiveHandle::open(name, &self.container_path(name))
    }
}

/// Walk `root` recursively, returning `(relative path, absolute path)` pairs
/// sorted by relative path. Symbolic links are not followed; noise files and
/// anything under a top-level `META-INF` are left out.
fn collect_source_files(root: &Path) -> ContainerResult<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    let mut stack = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = stack.pop() {
        let read_dir = fs::read_dir(&dir).map_err(|e| ContainerError::io(&dir, e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| ContainerError::io(&dir, e))?;
            let path = entry.path();
            let file_name = entry.file_name();
            let file_name = file_name.to_str().ok_or_else(|| {
                ContainerError::validation(format!(
                    "source file name is not valid UTF-8: {}",
                    path.display()
                ))
            })?;
            let relative = if prefix.is_empty() {
                file_name.to_string()
            } else {
                format!("{prefix}/{file_name}")
            };

            let file_type = entry.file_type().map_err(|e| ContainerError::io(&path, e))?;
            if file_type.is_symlink() {
                warn!(path = %relative, "skipping symbolic link in source tree");
                continue;
            }
            if file_type.is_dir() {
                stack.push((path, relative));
            } else if file_type.is_file() {
                if is_noise(&relative) {
                    continue;
                }
                if is_meta_path(&relative) {
                    warn!(path = %relative, "skipping reserved META-INF entry in source tree");
                    continue;
                }
                out.push((relative, path));
            }
        }
    }

    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ArchiveStore) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("files");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("a.txt"), b"alpha").unwrap();
        fs::write(source.join("sub/b.txt"), b"beta").unwrap();
        fs::write(source.join(".DS_Store"), b"noise").unwrap();

        let config = StoreConfig::default()
            .with_containers_dir(dir.path().join("containers"))
            .with_source_dir(source);
        let store = ArchiveStore::new(&config);
        (dir, store)
    }

    #[test]
    fn test_create_then_list() {
        let (_dir, store) = setup();
        assert_eq!(store.create("box").unwrap(), 2);
        assert!(store.exists("box"));
        assert_eq!(store.list().unwrap(), vec!["box".to_string()]);

        let handle = store.open_for_mutation("box").unwrap();
        let names: Vec<_> = handle.entry_names().collect();
        assert_eq!(names, vec!["a.txt", "sub/b.txt"]);
    }

    #[test]
    fn test_create_twice_conflicts_and_keeps_first() {
        let (dir, store) = setup();
        store.create("box").unwrap();
        let before = fs::read(store.container_path("box")).unwrap();

        fs::write(dir.path().join("files/new.txt"), b"late").unwrap();
        let err = store.create("box").unwrap_err();
        assert!(err.is_name_conflict());
        assert_eq!(fs::read(store.container_path("box")).unwrap(), before);
    }

    #[test]
    fn test_create_rejects_bad_names() {
        let (_dir, store) = setup();
        assert!(store.create("").unwrap_err().is_validation());
        assert!(store.create("../escape").unwrap_err().is_validation());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_create_skips_meta_inf_in_source() {
        let (dir, store) = setup();
        let meta = dir.path().join("files/META-INF");
        fs::create_dir_all(&meta).unwrap();
        fs::write(meta.join("signature1.ksi"), b"forged").unwrap();

        store.create("box").unwrap();
        let handle = store.open_for_mutation("box").unwrap();
        assert!(!handle.contains("META-INF/signature1.ksi"));
    }

    #[cfg(unix)]
    #[test]
    fn test_create_skips_symlinks() {
        let (dir, store) = setup();
        let source = dir.path().join("files");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(&source, source.join("loop")).unwrap();
        std::os::unix::fs::symlink(&outside, source.join("linked")).unwrap();
        std::os::unix::fs::symlink(source.join("a.txt"), source.join("alias.txt")).unwrap();

        assert_eq!(store.create("box").unwrap(), 2);
        let handle = store.open_for_mutation("box").unwrap();
        let names: Vec<_> = handle.entry_names().collect();
        assert_eq!(names, vec!["a.txt", "sub/b.txt"]);
    }

    #[test]
    fn test_create_missing_source_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::default()
            .with_containers_dir(dir.path().join("containers"))
            .with_source_dir(dir.path().join("missing"));
        let store = ArchiveStore::new(&config);

        let err = store.create("box").unwrap_err();
        assert_eq!(err.kind(), "io");
        assert!(!store.exists("box"));
    }

    #[test]
    fn test_list_ignores_noise_and_missing_dir() {
        let (_dir, store) = setup();
        assert!(store.list().unwrap().is_empty());

        store.create("b").unwrap();
        store.create("a").unwrap();
        fs::write(store.containers_dir().join(".DS_Store"), b"").unwrap();
        fs::write(store.containers_dir().join("notes.txt"), b"").unwrap();
        fs::create_dir_all(store.containers_dir().join("dir.zip")).unwrap();

        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let (_dir, store) = setup();
        assert!(store.open_for_mutation("ghost").unwrap_err().is_not_found());
    }
}

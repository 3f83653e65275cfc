use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Capability surface the CRUD handler stores entities through. The disk
/// implementation is the production path; the in-memory one backs tests and
/// can be forced to fail per operation.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
    fn make_dir(&self, path: &Path) -> io::Result<()>;
    fn list_dir(&self, path: &Path) -> Vec<String>;
}

/// Host filesystem.
#[derive(Debug, Default)]
pub struct DiskFs;

impl FileSystem for DiskFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so readers never observe a partial file.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn make_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn list_dir(&self, path: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(path) {
            for entry in entries.flatten() {
                if entry.file_type().map_or(false, |t| t.is_file()) {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
        }
        names
    }
}

#[derive(Default)]
struct MemState {
    files: FxHashMap<PathBuf, Vec<u8>>,
    dirs: FxHashMap<PathBuf, Vec<String>>,
}

/// Per-operation failure switches for `MemFs`.
#[derive(Debug, Default)]
pub struct FailureFlags {
    pub fail_read: bool,
    pub fail_write: bool,
    pub fail_remove: bool,
    pub fail_make_dir: bool,
}

/// In-memory filesystem: file contents in a path map, directory membership
/// in a separate map so listings stay cheap.
#[derive(Default)]
pub struct MemFs {
    state: Mutex<MemState>,
    failures: Mutex<FailureFlags>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failures(&self, flags: FailureFlags) {
        *self.failures.lock() = flags;
    }

    fn forced_failure(&self, fail: impl Fn(&FailureFlags) -> bool) -> Option<io::Error> {
        if fail(&self.failures.lock()) {
            Some(io::Error::new(io::ErrorKind::Other, "injected failure"))
        } else {
            None
        }
    }
}

impl FileSystem for MemFs {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock();
        state.files.contains_key(path) || state.dirs.contains_key(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        if let Some(err) = self.forced_failure(|f| f.fail_read) {
            return Err(err);
        }
        self.state
            .lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(err) = self.forced_failure(|f| f.fail_write) {
            return Err(err);
        }
        let mut state = self.state.lock();
        state.files.insert(path.to_path_buf(), bytes.to_vec());
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            let name = name.to_string_lossy().into_owned();
            let members = state.dirs.entry(parent.to_path_buf()).or_default();
            if !members.contains(&name) {
                members.push(name);
            }
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if let Some(err) = self.forced_failure(|f| f.fail_remove) {
            return Err(err);
        }
        let mut state = self.state.lock();
        if state.files.remove(path).is_none() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            let name = name.to_string_lossy();
            if let Some(members) = state.dirs.get_mut(parent) {
                members.retain(|m| *m != name);
            }
        }
        Ok(())
    }

    fn make_dir(&self, path: &Path) -> io::Result<()> {
        if let Some(err) = self.forced_failure(|f| f.fail_make_dir) {
            return Err(err);
        }
        self.state.lock().dirs.entry(path.to_path_buf()).or_default();
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> Vec<String> {
        self.state.lock().dirs.get(path).cloned().unwrap_or_default()
    }
}

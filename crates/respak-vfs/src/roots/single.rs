//! Single-stream content root.
//!
//! Exposes exactly one file, backed by a caller-supplied stream. The stream is
//! drained at mount so each open gets its own cursor over the same bytes.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::sync::{Arc, OnceLock};

use crate::error::{VfsError, VfsResult};
use crate::path::ResPath;
use crate::root::{
    ContentRoot, DirectoryFilter, PathIter, ancestor_directories, child_entries,
    select_directories, select_files,
};
use crate::stream::ContentStream;

/// Content root serving one file at a fixed relative path.
pub struct SingleStreamContentRoot {
    path: ResPath,
    source: Mutex<Option<Box<dyn Read + Send>>>,
    data: OnceLock<Arc<[u8]>>,
}

impl SingleStreamContentRoot {
    /// Serve `stream` at `path` once mounted.
    pub fn new(stream: impl Read + Send + 'static, path: impl Into<ResPath>) -> Self {
        Self {
            path: path.into().to_relative(),
            source: Mutex::new(Some(Box::new(stream))),
            data: OnceLock::new(),
        }
    }

    /// Relative path of the single file.
    pub fn path(&self) -> &ResPath {
        &self.path
    }

    fn matches(&self, path: &ResPath) -> bool {
        path.to_relative() == self.path
    }
}

impl std::fmt::Debug for SingleStreamContentRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleStreamContentRoot")
            .field("path", &self.path)
            .field("mounted", &self.data.get().is_some())
            .finish()
    }
}

impl ContentRoot for SingleStreamContentRoot {
    fn mount(&self) -> VfsResult<()> {
        if self.data.get().is_some() {
            return Ok(());
        }
        if self.path.is_empty() || self.path.is_directory() {
            return Err(VfsError::invalid_path(self.path.to_string()));
        }
        let Some(mut stream) = self.source.lock().take() else {
            return Err(VfsError::other(format!(
                "stream for {} was already consumed",
                self.path
            )));
        };

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        tracing::debug!("Buffered {} bytes for {}", buffer.len(), self.path);
        let _ = self.data.set(Arc::from(buffer));
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "stream"
    }

    fn try_get_file(&self, path: &ResPath) -> Option<ContentStream> {
        if !self.matches(path) {
            return None;
        }
        let data = self.data.get()?;
        Some(Box::new(Cursor::new(Arc::clone(data))) as ContentStream)
    }

    fn file_exists(&self, path: &ResPath) -> bool {
        self.data.get().is_some() && self.matches(path)
    }

    fn find_files(&self, path: &ResPath, recursive: bool) -> PathIter {
        if self.data.get().is_none() {
            return Box::new(std::iter::empty());
        }
        Box::new(select_files([&self.path], path, recursive).into_iter())
    }

    fn find_directories(&self, path: &ResPath, filter: Option<DirectoryFilter>) -> PathIter {
        if self.data.get().is_none() {
            return Box::new(std::iter::empty());
        }
        let parents = ancestor_directories(&self.path);
        Box::new(select_directories(&parents, path, filter.as_ref()).into_iter())
    }

    fn get_entries(&self, path: &ResPath) -> BTreeSet<String> {
        if self.data.get().is_none() {
            return BTreeSet::new();
        }
        child_entries([&self.path], path)
    }

    fn get_relative_file_paths(&self) -> Vec<String> {
        if self.data.get().is_none() {
            return Vec::new();
        }
        vec![self.path.to_string()]
    }
}

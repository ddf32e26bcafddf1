//! Content-pack root.
//!
//! A content pack is a zip archive. The archive is opened and indexed once at
//! mount time; every open decompresses the entry into its own buffer, so
//! concurrent readers never share a cursor.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use zip::ZipArchive;

use crate::error::{VfsError, VfsResult};
use crate::path::ResPath;
use crate::root::{
    ContentRoot, DirectoryFilter, PathIter, ancestor_directories, child_entries,
    select_directories, select_files,
};
use crate::stream::ContentStream;

/// Seekable byte source a pack can be read from.
pub trait PackReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> PackReader for T {}

/// Where the archive bytes come from.
pub enum PackSource {
    /// Archive file on disk, opened at mount.
    Path(PathBuf),
    /// Caller-supplied seekable stream.
    Stream(Box<dyn PackReader>),
}

impl std::fmt::Debug for PackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            PackSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

struct MountedPack {
    archive: Mutex<ZipArchive<Box<dyn PackReader>>>,
    /// Relative path -> entry name inside the archive.
    files: HashMap<ResPath, String>,
    /// Explicit directory entries plus every parent implied by a file.
    directories: BTreeSet<ResPath>,
}

/// Zip-backed content root.
pub struct PackContentRoot {
    label: String,
    disk_path: Option<PathBuf>,
    source: Mutex<Option<PackSource>>,
    mounted: OnceLock<MountedPack>,
}

impl PackContentRoot {
    /// Pack read from `source`, indexed on mount.
    pub fn new(source: PackSource) -> Self {
        let (label, disk_path) = match &source {
            PackSource::Path(path) => (path.display().to_string(), Some(path.clone())),
            PackSource::Stream(_) => ("<stream>".to_string(), None),
        };
        Self {
            label,
            disk_path,
            source: Mutex::new(Some(source)),
            mounted: OnceLock::new(),
        }
    }

    /// Pack read from an archive file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(PackSource::Path(path.into()))
    }

    /// Pack read from an injected stream. `label` only appears in logs.
    pub fn from_stream(stream: impl Read + Seek + Send + 'static, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            disk_path: None,
            source: Mutex::new(Some(PackSource::Stream(Box::new(stream)))),
            mounted: OnceLock::new(),
        }
    }

    /// Archive file this pack was opened from, if any.
    pub fn pack_path(&self) -> Option<&Path> {
        self.disk_path.as_deref()
    }

    /// Whether `mount` has completed.
    pub fn is_mounted(&self) -> bool {
        self.mounted.get().is_some()
    }

    fn open_source(&self, source: PackSource) -> VfsResult<Box<dyn PackReader>> {
        match source {
            PackSource::Path(path) => match File::open(&path) {
                Ok(file) => Ok(Box::new(file)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Err(VfsError::not_found(
                    format!("content pack {}", path.display()),
                )),
                Err(e) => Err(e.into()),
            },
            PackSource::Stream(stream) => Ok(stream),
        }
    }

    fn read_entry(&self, pack: &MountedPack, name: &str) -> io::Result<Vec<u8>> {
        let mut archive = pack.archive.lock();
        let mut entry = archive.by_name(name).map_err(io::Error::other)?;
        let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl std::fmt::Debug for PackContentRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackContentRoot")
            .field("label", &self.label)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

/// Build the path index for an opened archive.
fn index_archive(
    archive: &ZipArchive<Box<dyn PackReader>>,
) -> (HashMap<ResPath, String>, BTreeSet<ResPath>) {
    let mut files = HashMap::new();
    let mut directories = BTreeSet::new();

    for name in archive.file_names() {
        let path = ResPath::new(name).to_relative();
        if path.is_empty() {
            continue;
        }
        directories.extend(ancestor_directories(&path));
        if path.is_directory() {
            directories.insert(path);
        } else {
            files.insert(path, name.to_string());
        }
    }
    (files, directories)
}

impl ContentRoot for PackContentRoot {
    fn mount(&self) -> VfsResult<()> {
        if self.is_mounted() {
            return Ok(());
        }
        let Some(source) = self.source.lock().take() else {
            return Err(VfsError::other(format!(
                "content pack {} has no source to mount",
                self.label
            )));
        };

        let reader = self.open_source(source)?;
        let archive = ZipArchive::new(reader)?;
        let (files, directories) = index_archive(&archive);
        tracing::debug!(
            "Indexed content pack {}: {} files, {} directories",
            self.label,
            files.len(),
            directories.len()
        );

        let _ = self.mounted.set(MountedPack {
            archive: Mutex::new(archive),
            files,
            directories,
        });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "pack"
    }

    fn try_get_file(&self, path: &ResPath) -> Option<ContentStream> {
        let pack = self.mounted.get()?;
        let name = pack.files.get(&path.to_relative())?;
        match self.read_entry(pack, name) {
            Ok(data) => Some(Box::new(Cursor::new(data)) as ContentStream),
            Err(e) => {
                tracing::warn!("Failed to read {} from content pack {}: {}", name, self.label, e);
                None
            }
        }
    }

    fn file_exists(&self, path: &ResPath) -> bool {
        self.mounted
            .get()
            .is_some_and(|pack| pack.files.contains_key(&path.to_relative()))
    }

    fn find_files(&self, path: &ResPath, recursive: bool) -> PathIter {
        let Some(pack) = self.mounted.get() else {
            return Box::new(std::iter::empty());
        };
        Box::new(select_files(pack.files.keys(), path, recursive).into_iter())
    }

    fn find_directories(&self, path: &ResPath, filter: Option<DirectoryFilter>) -> PathIter {
        let Some(pack) = self.mounted.get() else {
            return Box::new(std::iter::empty());
        };
        Box::new(select_directories(&pack.directories, path, filter.as_ref()).into_iter())
    }

    fn get_entries(&self, path: &ResPath) -> BTreeSet<String> {
        let Some(pack) = self.mounted.get() else {
            return BTreeSet::new();
        };
        child_entries(pack.files.keys().chain(pack.directories.iter()), path)
    }

    fn get_relative_file_paths(&self) -> Vec<String> {
        let Some(pack) = self.mounted.get() else {
            return Vec::new();
        };
        let mut paths: Vec<String> = pack.files.keys().map(|p| p.to_string()).collect();
        paths.sort();
        paths
    }
}

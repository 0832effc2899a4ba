//! Tar archives
//!
//! Packs directory trees under a renamed top-level directory, optionally gzip
//! compressed, and unpacks archives produced by other tools.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};
use walkdir::WalkDir;

use crate::config::defaults;
use crate::error::ArchiveError;

/// Whether a path has a component ending in the excluded suffix (`*_workspace`)
pub fn is_excluded(rel: &Path) -> bool {
    rel.components().any(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|n| n.ends_with(defaults::EXCLUDED_DIR_SUFFIX)),
        _ => false,
    })
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
        }
    }
}

impl Sink {
    fn finish(self) -> std::io::Result<()> {
        match self {
            Self::Plain(mut w) => w.flush(),
            Self::Gzip(w) => w.finish()?.flush(),
        }
    }
}

/// Builder for a tar archive written to disk
pub struct TarWriter {
    path: PathBuf,
    builder: Builder<Sink>,
}

impl std::fmt::Debug for TarWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarWriter").field("path", &self.path).finish_non_exhaustive()
    }
}

impl TarWriter {
    /// Create an archive at `path`; `.gz`/`.tgz` names are gzip compressed
    pub fn create(path: &Path) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| create_error(path, &e))?;
        }
        let file = File::create(path).map_err(|e| create_error(path, &e))?;
        let writer = if is_gzip(path) {
            Sink::Gzip(GzEncoder::new(BufWriter::new(file), Compression::default()))
        } else {
            Sink::Plain(BufWriter::new(file))
        };
        let mut builder = Builder::new(writer);
        builder.follow_symlinks(false);
        Ok(Self {
            path: path.to_path_buf(),
            builder,
        })
    }

    /// Add the contents of `dir` below the top-level directory `prefix`,
    /// skipping every path with a `*_workspace` component
    pub fn add_dir(&mut self, dir: &Path, prefix: &str) -> Result<(), ArchiveError> {
        let prefix = prefix.trim_start_matches("./").trim_end_matches('/');
        let mut walker = WalkDir::new(dir).follow_links(false).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| create_error(&self.path, &e))?;
            let rel = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| create_error(&self.path, &e))?;
            if is_excluded(rel) {
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }
            let name = if rel.as_os_str().is_empty() {
                PathBuf::from(prefix)
            } else {
                Path::new(prefix).join(rel)
            };
            self.builder
                .append_path_with_name(entry.path(), &name)
                .map_err(|e| create_error(&self.path, &e))?;
        }
        Ok(())
    }

    /// Add a single file under `name`
    pub fn add_file(&mut self, file: &Path, name: &str) -> Result<(), ArchiveError> {
        self.builder
            .append_path_with_name(file, name.trim_start_matches("./"))
            .map_err(|e| create_error(&self.path, &e))
    }

    /// Write the trailer and flush everything to disk
    pub fn finish(self) -> Result<PathBuf, ArchiveError> {
        let path = self.path;
        self.builder
            .into_inner()
            .and_then(Sink::finish)
            .map_err(|e| create_error(&path, &e))?;
        tracing::debug!("Wrote archive {}", path.display());
        Ok(path)
    }
}

/// Pack `dir` into `archive` below the top-level directory `prefix`
pub fn pack_dir(dir: &Path, archive: &Path, prefix: &str) -> Result<PathBuf, ArchiveError> {
    let mut writer = TarWriter::create(archive)?;
    writer.add_dir(dir, prefix)?;
    writer.finish()
}

/// Unpack `archive` into `dest`; gzip is detected from the file name
pub fn unpack(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let unpack_error = |e: &dyn std::fmt::Display| ArchiveError::Unpack {
        path: archive.to_path_buf(),
        dest: dest.to_path_buf(),
        error: e.to_string(),
    };
    std::fs::create_dir_all(dest).map_err(|e| unpack_error(&e))?;
    let file = File::open(archive).map_err(|e| unpack_error(&e))?;
    let result = if is_gzip(archive) {
        let mut archive = Archive::new(GzDecoder::new(file));
        archive.set_preserve_mtime(false);
        archive.unpack(dest)
    } else {
        let mut archive = Archive::new(file);
        archive.set_preserve_mtime(false);
        archive.unpack(dest)
    };
    result.map_err(|e| unpack_error(&e))
}

/// Entry names of an archive, in archive order
pub fn entry_names(archive: &Path) -> Result<Vec<String>, ArchiveError> {
    let read_error = |e: &dyn std::fmt::Display| ArchiveError::Unpack {
        path: archive.to_path_buf(),
        dest: PathBuf::new(),
        error: e.to_string(),
    };
    let file = File::open(archive).map_err(|e| read_error(&e))?;
    let reader: Box<dyn std::io::Read> = if is_gzip(archive) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut archive_reader = Archive::new(reader);
    let mut names = Vec::new();
    for entry in archive_reader.entries().map_err(|e| read_error(&e))? {
        let entry = entry.map_err(|e| read_error(&e))?;
        let path = entry.path().map_err(|e| read_error(&e))?;
        names.push(path.to_string_lossy().trim_end_matches('/').to_string());
    }
    Ok(names)
}

fn is_gzip(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".gz") || n.ends_with(".tgz"))
}

fn create_error(path: &Path, error: &dyn std::fmt::Display) -> ArchiveError {
    ArchiveError::Create {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

/// Error raised by the file helpers in this module, carrying the offending path.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("failed to open file `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write file `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    pub fn path(&self) -> &Path {
        match self {
            FileError::Open { path, .. }
            | FileError::Read { path, .. }
            | FileError::Write { path, .. } => path,
        }
    }

    pub fn kind(&self) -> io::ErrorKind {
        match self {
            FileError::Open { source, .. }
            | FileError::Read { source, .. }
            | FileError::Write { source, .. } => source.kind(),
        }
    }
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns [`FileError::Open`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use cpu_warden::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/mountinfo")?;
/// # Ok::<(), fsutil::FileError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads a single-value control file (e.g. `cpuset.cpus`) and strips surrounding whitespace.
///
/// # Errors
///
/// Returns [`FileError::Read`] if the file cannot be read or is not valid UTF-8.
pub fn read_trimmed(path: impl AsRef<Path>) -> Result<String, FileError> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .map(|content| content.trim().to_owned())
        .map_err(|source| FileError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Replaces the contents of `path` with `contents`.
///
/// The data is written to a sibling `.tmp` file first and renamed over `path`, so readers
/// never observe a half-written document.
///
/// # Errors
///
/// Returns [`FileError::Write`] if writing, syncing, or renaming fails.
pub fn replace_file(path: impl AsRef<Path>, contents: &[u8]) -> Result<(), FileError> {
    let path = path.as_ref();
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let write = || -> io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)
    };

    write().map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        FileError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

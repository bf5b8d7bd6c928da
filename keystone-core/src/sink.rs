//! Output destination for produced artifacts.
//!
//! An empty path selects standard output; anything else creates (or
//! truncates) a file. There is no fallback to standard output once a path
//! was requested.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Error type for output sink resolution.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output file could not be created.
    #[error("failed to create output file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where produced artifacts are written.
///
/// The caller owns the sink and must call [`finish`](OutputSink::finish) (or
/// at least flush) on every exit path.
#[derive(Debug)]
pub enum OutputSink {
    /// The process standard output stream.
    Stdout(io::Stdout),
    /// A newly created file.
    File { path: PathBuf, file: File },
}

impl OutputSink {
    /// Select the sink for an optional path.
    pub fn for_path(path: Option<&Path>) -> Result<Self, SinkError> {
        match path.filter(|p| !p.as_os_str().is_empty()) {
            None => Ok(Self::Stdout(io::stdout())),
            Some(path) => {
                let file = File::create(path).map_err(|source| SinkError::Create {
                    path: path.to_path_buf(),
                    source,
                })?;
                debug!("writing output to {:?}", path);
                Ok(Self::File {
                    path: path.to_path_buf(),
                    file,
                })
            }
        }
    }

    /// Whether this sink is standard output.
    pub fn is_stdout(&self) -> bool {
        matches!(self, Self::Stdout(_))
    }

    /// The output file path, if writing to a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Stdout(_) => None,
            Self::File { path, .. } => Some(path),
        }
    }

    /// Flush buffered output and, for files, sync it to disk.
    pub fn finish(mut self) -> io::Result<()> {
        self.flush()?;
        if let Self::File { file, .. } = &self {
            file.sync_all()?;
        }
        Ok(())
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(stdout) => stdout.write(buf),
            Self::File { file, .. } => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(stdout) => stdout.flush(),
            Self::File { file, .. } => file.flush(),
        }
    }
}

/// Resolve the output sink from a flag value; empty means standard output.
pub fn resolve_output_sink(path: &str) -> Result<OutputSink, SinkError> {
    if path.is_empty() {
        return Ok(OutputSink::Stdout(io::stdout()));
    }
    OutputSink::for_path(Some(Path::new(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path_is_stdout() {
        let sink = resolve_output_sink("").unwrap();
        assert!(sink.is_stdout());
        assert!(sink.path().is_none());

        assert!(OutputSink::for_path(None).unwrap().is_stdout());
        assert!(OutputSink::for_path(Some(Path::new(""))).unwrap().is_stdout());
    }

    #[test]
    fn test_error_message_names_path() {
        let error = SinkError::Create {
            path: PathBuf::from("/nope/out.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert_eq!(
            error.to_string(),
            "failed to create output file /nope/out.json: No such file or directory"
        );
    }
}

use crate::output::{format_thousands, print_file_header, Console};
use crate::progress::{ProgressReporter, SharedProgress, POLL_INTERVAL};
use log::{debug, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Bytes read from each input per step of the comparison loop.
pub const CHUNK_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("{}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("IO error: {0}")]
    Io(io::Error),
    #[error("input length changed during comparison (at byte {0})")]
    LengthChanged(u64),
}

impl From<io::Error> for CompareError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// First differing byte pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub offset: u64,
    pub byte1: u8,
    pub byte2: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Matched,
    Mismatched(Mismatch),
    SizeMismatch,
}

impl CompareResult {
    pub fn is_match(&self) -> bool {
        matches!(self, CompareResult::Matched)
    }
}

impl fmt::Display for CompareResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareResult::Matched => write!(f, "Matched"),
            CompareResult::Mismatched(mismatch) => write!(
                f,
                "Results: Unmatched. ([File 1]={:#x}; [File 2]={:#x} at byte {}.)",
                mismatch.byte1,
                mismatch.byte2,
                format_thousands(mismatch.offset)
            ),
            CompareResult::SizeMismatch => {
                write!(f, "Results: Unmatched. (Different file sizes.)")
            }
        }
    }
}

pub struct Comparator {
    chunk_size: usize,
    poll_interval: Duration,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            poll_interval: POLL_INTERVAL,
        }
    }
}

fn file_size(path: &Path) -> Result<u64, CompareError> {
    let open_error = |source: io::Error| CompareError::Open {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(open_error)?;
    if metadata.is_dir() {
        return Err(open_error(io::Error::new(
            ErrorKind::Other,
            "Is a directory",
        )));
    }

    Ok(metadata.len())
}

fn open_file(path: &Path) -> Result<File, CompareError> {
    File::open(path).map_err(|source| CompareError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Fills `buf` unless the reader hits end of stream first.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

impl Comparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Compares the files at `path1` and `path2`, writing the headers, the
    /// progress line and the result line to `console`.
    pub fn compare_paths<W: Write + Send + 'static>(
        &self,
        path1: &Path,
        path2: &Path,
        console: &Console<W>,
    ) -> Result<CompareResult, CompareError> {
        let (size1, size2) = rayon::join(|| file_size(path1), || file_size(path2));
        let (size1, size2) = (size1?, size2?);
        debug!("sizes: {} = {}, {} = {}", path1.display(), size1, path2.display(), size2);

        print_file_header(console, 1, path1, size1)?;
        print_file_header(console, 2, path2, size2)?;

        if size1 != size2 {
            let result = CompareResult::SizeMismatch;
            console.line(format_args!("{}", result))?;
            return Ok(result);
        }

        let result = {
            let mut file1 = open_file(path1)?;
            let mut file2 = open_file(path2)?;

            self.compare_readers(&mut file1, &mut file2, size1, console)?
        };

        console.line(format_args!("{}", result))?;

        Ok(result)
    }

    /// Runs the chunked comparison of two readers of `total` bytes each while
    /// a background reporter draws progress to `console`.
    ///
    /// The reporter has exited by the time this returns, on every path.
    pub fn compare_readers<R1: Read, R2: Read, W: Write + Send + 'static>(
        &self,
        reader1: &mut R1,
        reader2: &mut R2,
        total: u64,
        console: &Console<W>,
    ) -> Result<CompareResult, CompareError> {
        let progress = Arc::new(SharedProgress::new());
        let reporter = ProgressReporter::new(total, Arc::clone(&progress), console.clone())
            .with_interval(self.poll_interval)
            .spawn()?;

        let outcome = self.compare_chunks(reader1, reader2, total, &progress);
        let stopped = reporter.finish();

        let mismatch = outcome?;
        stopped?;

        Ok(match mismatch {
            Some(mismatch) => {
                debug!(
                    "first difference at byte {}: {:#x} != {:#x}",
                    mismatch.offset, mismatch.byte1, mismatch.byte2
                );
                CompareResult::Mismatched(mismatch)
            }
            None => CompareResult::Matched,
        })
    }

    fn compare_chunks<R1: Read, R2: Read>(
        &self,
        reader1: &mut R1,
        reader2: &mut R2,
        total: u64,
        progress: &SharedProgress,
    ) -> Result<Option<Mismatch>, CompareError> {
        let mut buf1 = vec![0u8; self.chunk_size];
        let mut buf2 = vec![0u8; self.chunk_size];
        let mut compared: u64 = 0;

        loop {
            let read1 = read_chunk(reader1, &mut buf1)?;
            let read2 = read_chunk(reader2, &mut buf2)?;
            let len = read1.min(read2);

            let chunk1 = &buf1[..len];
            let chunk2 = &buf2[..len];

            if let Some(position) = chunk1.iter().zip(chunk2).position(|(a, b)| a != b) {
                return Ok(Some(Mismatch {
                    offset: compared + position as u64,
                    byte1: chunk1[position],
                    byte2: chunk2[position],
                }));
            }

            if read1 != read2 {
                let offset = compared + len as u64;
                warn!("inputs changed length mid-comparison near byte {}", offset);
                return Err(CompareError::LengthChanged(offset));
            }

            // Content may outrun the stat size (procfs reports 0); cap at total.
            progress.add((len as u64).min(total.saturating_sub(compared)));
            compared += len as u64;

            if len < self.chunk_size {
                if compared != total {
                    debug!("inputs ended at byte {}, stat size was {}", compared, total);
                }

                return Ok(None);
            }
        }
    }
}

use itertools::Itertools;
use std::fmt;
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Output sink shared between the comparison loop and the progress reporter.
///
/// Every write goes through the same mutex, so the in-place status line is
/// never torn by another line being printed at the same time.
pub struct Console<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for Console<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Console<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    // A panicking writer leaves the sink usable; there is no state to repair.
    pub fn lock(&self) -> MutexGuard<'_, W> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn line(&self, args: fmt::Arguments) -> io::Result<()> {
        let mut out = self.lock();
        out.write_fmt(args)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// Formats `value` with `,` between every group of three digits.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();

    // Digits are ASCII, so byte groups are always valid str slices.
    digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(String::from_utf8_lossy)
        .join(",")
}

pub fn print_file_header<W: Write>(
    console: &Console<W>,
    index: usize,
    path: &Path,
    size: u64,
) -> io::Result<()> {
    console.line(format_args!(
        "[File {}]: {} ({} bytes)",
        index,
        path.display(),
        format_thousands(size)
    ))
}

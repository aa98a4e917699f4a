use crate::output::Console;
use log::debug;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

const BACKSPACE: char = '\x08';

/// Running count of bytes confirmed equal, written by the comparison loop and
/// read by the reporter.
#[derive(Debug, Default)]
pub struct SharedProgress {
    compared: AtomicU64,
    finished: AtomicBool,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) {
        self.compared.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.compared.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

pub fn percentage(compared: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }

    (compared as f64 / total as f64 * 100.0).min(100.0)
}

pub fn format_status(percent: f64, elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();

    format!(
        "Progress: {:6.2}% (Elapsed: {:02}:{:02}:{:02})",
        percent,
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// Periodically redraws a single status line until the watched count reaches
/// `total` or the comparison signals that it is done.
pub struct ProgressReporter<W> {
    total: u64,
    progress: Arc<SharedProgress>,
    console: Console<W>,
    interval: Duration,
}

impl<W: Write + Send + 'static> ProgressReporter<W> {
    pub fn new(total: u64, progress: Arc<SharedProgress>, console: Console<W>) -> Self {
        Self {
            total,
            progress,
            console,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn spawn(self) -> io::Result<ReporterHandle> {
        let progress = Arc::clone(&self.progress);
        let handle = thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || self.run())?;

        Ok(ReporterHandle { progress, handle })
    }

    fn run(self) -> io::Result<()> {
        debug!("progress reporter started, total {} bytes", self.total);

        let start = Instant::now();
        let mut previous_len = 0;

        loop {
            // Flag first: once it is set, the count read below is final.
            let finished = self.progress.is_finished();
            let compared = self.progress.get();

            let status = format_status(percentage(compared, self.total), start.elapsed());
            let done = finished || compared >= self.total;

            {
                let mut out = self.console.lock();
                let erase: String = std::iter::repeat(BACKSPACE).take(previous_len).collect();
                write!(out, "{}{}", erase, status)?;
                if done {
                    writeln!(out)?;
                }
                out.flush()?;
            }
            previous_len = status.len();

            if done {
                break;
            }

            thread::park_timeout(self.interval);
        }

        debug!("progress reporter stopped after {:?}", start.elapsed());
        Ok(())
    }
}

pub struct ReporterHandle {
    progress: Arc<SharedProgress>,
    handle: JoinHandle<io::Result<()>>,
}

impl ReporterHandle {
    /// Tells the reporter to draw its last line and waits for it to exit.
    pub fn finish(self) -> io::Result<()> {
        self.progress.finish();
        self.handle.thread().unpark();

        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::Other,
                "progress reporter panicked",
            )),
        }
    }
}

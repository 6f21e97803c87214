//! Run-scoped log of ffmpeg output.
//!
//! One file per run, truncated when the run starts. Each encode appends its
//! whole output as a single record under the lock, so records from
//! concurrent jobs never interleave.

use crate::error::CoreResult;

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct RunLog {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl RunLog {
    /// Creates (or truncates) the log at `path`, creating parent directories.
    pub fn create(path: &Path) -> CoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record: a header line followed by `body`.
    pub fn append_record(&self, header: &str, body: &str) -> CoreResult<()> {
        let mut record = String::with_capacity(header.len() + body.len() + 16);
        record.push_str("==== ");
        record.push_str(header);
        record.push_str(" ====\n");
        record.push_str(body);
        if !body.is_empty() && !body.ends_with('\n') {
            record.push('\n');
        }
        record.push('\n');

        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        file.write_all(record.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn create_truncates_previous_contents() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("out").join("reencode.log");

        let log = RunLog::create(&path)?;
        log.append_record("first run", "old line")?;
        drop(log);

        let log = RunLog::create(&path)?;
        log.append_record("second run", "new line")?;
        drop(log);

        let contents = fs::read_to_string(&path)?;
        assert!(!contents.contains("old line"));
        assert!(contents.contains("==== second run ===="));
        assert!(contents.contains("new line\n"));
        Ok(())
    }

    #[test]
    fn concurrent_records_do_not_interleave() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("reencode.log");
        let log = Arc::new(RunLog::create(&path)?);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    let body: String = (0..50).map(|line| format!("w{worker} line {line}\n")).collect();
                    log.append_record(&format!("worker {worker}"), &body)
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker panicked")?;
        }

        let contents = fs::read_to_string(&path)?;
        for record in contents.split("==== ").filter(|r| !r.is_empty()) {
            let (header, body) = record.split_once(" ====\n").expect("header");
            let worker = header.trim_start_matches("worker ");
            for line in body.lines().filter(|l| !l.is_empty()) {
                assert!(line.starts_with(&format!("w{worker} ")), "interleaved line {line:?} in record {header}");
            }
        }
        Ok(())
    }
}

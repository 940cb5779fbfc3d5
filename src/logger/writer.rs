use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use chrono::{NaiveDateTime, Utc};
use tracing_subscriber::fmt::MakeWriter;

use crate::logger::options::{Output, RotateOptions};
use crate::logger::LoggerError;

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const MEGABYTE: u64 = 1024 * 1024;
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Append-only log file that rotates once it reaches a size limit.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    size: u64,
    max_size: u64,
    max_backups: usize,
    max_age: Option<Duration>,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, rotate: Option<&RotateOptions>) -> Result<Self, LoggerError> {
        let path = path.into();
        let rotate = rotate.cloned().unwrap_or_default();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LoggerError::LogFileOpen {
                path: path.clone(),
                source,
            })?;
        }

        let file = open_append(&path).map_err(|source| LoggerError::LogFileOpen {
            path: path.clone(),
            source,
        })?;
        let size = file.metadata().map(|meta| meta.len()).unwrap_or(0);

        let max_size_mb = if rotate.max_size_mb == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            rotate.max_size_mb
        };

        Ok(Self {
            path,
            file,
            size,
            max_size: max_size_mb.saturating_mul(MEGABYTE),
            max_backups: rotate.max_backups,
            max_age: (rotate.max_age_days > 0)
                .then(|| Duration::from_secs(rotate.max_age_days * SECONDS_PER_DAY)),
        })
    }

    /// Overrides the size limit in bytes.
    pub fn with_max_size_bytes(mut self, max_size: u64) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotated files that belong to this log, newest first.
    pub fn backups(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .stamped_backups()?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    fn stamped_backups(&self) -> io::Result<Vec<((NaiveDateTime, u32), PathBuf)>> {
        let Some(dir) = self.dir() else {
            return Ok(Vec::new());
        };
        let (stem, ext) = split_name(&self.path);

        let mut backups = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stamp) = backup_stamp(&name, &stem, ext.as_deref()) {
                backups.push((stamp, entry.path()));
            }
        }

        backups.sort_by(|a, b| b.cmp(a));
        Ok(backups)
    }

    fn dir(&self) -> Option<&Path> {
        match self.path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
            other => other,
        }
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let backup = self.backup_path()?;
        fs::rename(&self.path, &backup)?;
        self.file = open_append(&self.path)?;
        self.size = 0;
        self.prune()
    }

    /// Next backup name; rotations within the same millisecond get an increasing `-N`.
    fn backup_path(&self) -> io::Result<PathBuf> {
        let (stem, ext) = split_name(&self.path);
        let stamp = Utc::now().format(BACKUP_TIME_FORMAT).to_string();
        let name = |attempt: u32| {
            let suffix = if attempt == 0 {
                String::new()
            } else {
                format!("-{attempt}")
            };
            match &ext {
                Some(ext) => format!("{stem}-{stamp}{suffix}.{ext}"),
                None => format!("{stem}-{stamp}{suffix}"),
            }
        };

        let mut attempt = self
            .stamped_backups()?
            .into_iter()
            .filter(|((time, _), _)| time.format(BACKUP_TIME_FORMAT).to_string() == stamp)
            .map(|((_, attempt), _)| attempt + 1)
            .max()
            .unwrap_or(0);
        let mut candidate = self.path.with_file_name(name(attempt));
        while candidate.exists() {
            attempt += 1;
            candidate = self.path.with_file_name(name(attempt));
        }
        Ok(candidate)
    }

    fn prune(&self) -> io::Result<()> {
        let backups = self.backups()?;
        let now = SystemTime::now();

        for (index, backup) in backups.iter().enumerate() {
            let over_count = self.max_backups > 0 && index >= self.max_backups;
            let too_old = self.max_age.is_some_and(|max_age| {
                fs::metadata(backup)
                    .and_then(|meta| meta.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age > max_age)
            });
            if over_count || too_old {
                fs::remove_file(backup)?;
            }
        }
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size > 0 && self.size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    File::options().create(true).append(true).open(path)
}

/// Rotation time and collision counter encoded in a backup name such as
/// `app-2024-05-01T10-00-00.000-1.log`; `None` for any other file.
fn backup_stamp(name: &str, stem: &str, ext: Option<&str>) -> Option<(NaiveDateTime, u32)> {
    let rest = name.strip_prefix(stem)?.strip_prefix('-')?;
    let rest = match ext {
        Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
        None => rest,
    };

    if let Ok(time) = NaiveDateTime::parse_from_str(rest, BACKUP_TIME_FORMAT) {
        return Some((time, 0));
    }
    let (stamp, attempt) = rest.rsplit_once('-')?;
    let attempt = attempt.parse().ok()?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT)
        .ok()
        .map(|time| (time, attempt))
}

fn split_name(path: &Path) -> (String, Option<String>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    (stem, ext)
}

/// Destination shared by every record a core emits.
#[derive(Clone, Debug)]
pub enum Sink {
    Stdout,
    Stderr,
    File(Arc<Mutex<RotatingFile>>),
}

impl Sink {
    pub fn open(output: &Output, rotate: Option<&RotateOptions>) -> Result<Self, LoggerError> {
        match output {
            Output::Stdout => Ok(Self::Stdout),
            Output::Stderr => Ok(Self::Stderr),
            Output::File(path) => Ok(Self::File(Arc::new(Mutex::new(RotatingFile::open(
                path.clone(),
                rotate,
            )?)))),
        }
    }

    pub fn is_terminal_stream(&self) -> bool {
        !matches!(self, Self::File(_))
    }

    pub fn flush(&self) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().flush(),
            Self::Stderr => io::stderr().flush(),
            Self::File(file) => lock(file)?.flush(),
        }
    }
}

pub struct SinkWriter {
    sink: Sink,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.sink {
            Sink::Stdout => io::stdout().write(buf),
            Sink::Stderr => io::stderr().write(buf),
            Sink::File(file) => lock(file)?.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl<'a> MakeWriter<'a> for Sink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter { sink: self.clone() }
    }
}

fn lock(file: &Mutex<RotatingFile>) -> io::Result<std::sync::MutexGuard<'_, RotatingFile>> {
    file.lock()
        .map_err(|_| io::Error::other("log file mutex poisoned"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_parent_directories() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("app.log");
        let mut file = RotatingFile::open(&path, None).unwrap();
        file.write_all(b"hello\n").unwrap();
        file.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn reopen_appends_to_existing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.log");
        fs::write(&path, "first\n").unwrap();

        let mut file = RotatingFile::open(&path, None).unwrap();
        file.write_all(b"second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn exceeding_size_rotates_into_backup() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.log");
        let mut file = RotatingFile::open(&path, None)
            .unwrap()
            .with_max_size_bytes(16);

        file.write_all(b"0123456789\n").unwrap();
        file.write_all(b"abcdefghij\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "abcdefghij\n");
        let backups = file.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "0123456789\n");
        let name = backups[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("app-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn max_backups_limits_retained_files() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.log");
        let rotate = RotateOptions {
            max_size_mb: 1,
            max_backups: 2,
            max_age_days: 0,
        };
        let mut file = RotatingFile::open(&path, Some(&rotate))
            .unwrap()
            .with_max_size_bytes(8);

        for line in ["aaaaaa\n", "bbbbbb\n", "cccccc\n", "dddddd\n", "eeeeee\n"] {
            file.write_all(line.as_bytes()).unwrap();
        }

        let backups = file.backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "dddddd\n");
        assert_eq!(fs::read_to_string(&backups[1]).unwrap(), "cccccc\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "eeeeee\n");
    }

    #[test]
    fn unrelated_files_are_not_backups() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.log");
        fs::write(temp.path().join("other.log"), "x").unwrap();
        fs::write(temp.path().join("app-notes.txt"), "x").unwrap();

        let file = RotatingFile::open(&path, None).unwrap();
        assert!(file.backups().unwrap().is_empty());
    }

    #[test]
    fn pruning_keeps_files_that_only_share_the_prefix() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.log");
        let archive = temp.path().join("app-archive.log");
        fs::write(&archive, "keep me").unwrap();
        let rotate = RotateOptions {
            max_size_mb: 1,
            max_backups: 1,
            max_age_days: 0,
        };
        let mut file = RotatingFile::open(&path, Some(&rotate))
            .unwrap()
            .with_max_size_bytes(8);

        for line in ["aaaaaa\n", "bbbbbb\n", "cccccc\n"] {
            file.write_all(line.as_bytes()).unwrap();
        }

        assert_eq!(fs::read_to_string(&archive).unwrap(), "keep me");
        let backups = file.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "bbbbbb\n");
    }

    #[test]
    fn backup_names_are_recognized() {
        let stamp = "2024-05-01T10-00-00.123";
        assert!(backup_stamp(&format!("app-{stamp}.log"), "app", Some("log")).is_some());
        assert_eq!(
            backup_stamp(&format!("app-{stamp}-2.log"), "app", Some("log")).map(|(_, n)| n),
            Some(2)
        );
        assert!(backup_stamp(&format!("app-{stamp}"), "app", None).is_some());
        assert!(backup_stamp("app-archive.log", "app", Some("log")).is_none());
        assert!(backup_stamp(&format!("app-{stamp}.txt"), "app", Some("log")).is_none());
        assert!(backup_stamp(&format!("apple-{stamp}.log"), "app", Some("log")).is_none());
    }

    #[test]
    fn backups_older_than_max_age_are_removed() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.log");
        let rotate = RotateOptions {
            max_size_mb: 1,
            max_backups: 0,
            max_age_days: 1,
        };
        let mut file = RotatingFile::open(&path, Some(&rotate))
            .unwrap()
            .with_max_size_bytes(8);

        file.write_all(b"aaaaaa\n").unwrap();
        file.write_all(b"bbbbbb\n").unwrap();
        let stale = file.backups().unwrap();
        assert_eq!(stale.len(), 1);

        let three_days = Duration::from_secs(3 * SECONDS_PER_DAY);
        File::options()
            .write(true)
            .open(&stale[0])
            .unwrap()
            .set_modified(SystemTime::now() - three_days)
            .unwrap();

        file.write_all(b"cccccc\n").unwrap();

        assert!(!stale[0].exists());
        let backups = file.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "bbbbbb\n");
    }

    #[test]
    fn sink_file_writer_shares_handle() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sink.log");
        let sink = Sink::open(&Output::File(path.clone()), None).unwrap();
        assert!(!sink.is_terminal_stream());

        let mut writer = sink.make_writer();
        writer.write_all(b"via sink\n").unwrap();
        sink.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "via sink\n");
    }
}

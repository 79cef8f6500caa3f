//! Indexed-format writer
//!
//! Packets are buffered into keyframe-aligned groups. When the next primary
//! keyframe arrives the finished group is appended to the data file of the
//! current UTC hour and a matching [`IndexRecord`] to its index file:
//!
//! ```text
//! <root>/YYYY/MM/DD/<hour>.d   group blobs
//! <root>/YYYY/MM/DD/<hour>.m   32-byte index records
//! ```
//!
//! The pair is swapped when a flush happens in a different hour than the one
//! the open files belong to.

use crate::clock::Clock;
use crate::gof::Gof;
use crate::index::IndexRecord;
use crate::packet::{CodecParameters, Packet};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Data and index files of one hour
struct HourFiles {
    key: (NaiveDate, u32),
    dir: PathBuf,
    data: File,
    index: File,
    groups: u64,
}

pub struct NvrWriter {
    root: PathBuf,
    clock: Box<dyn Clock>,
    gof: Gof,
    duration: Duration,
    files: Option<HourFiles>,
}

impl NvrWriter {
    pub fn new(root: impl Into<PathBuf>, clock: Box<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
            gof: Gof::default(),
            duration: Duration::ZERO,
            files: None,
        }
    }

    /// Set the codec parameters embedded in every group
    pub fn write_header(&mut self, streams: CodecParameters) {
        self.gof = Gof::new(streams);
        self.duration = Duration::ZERO;
    }

    /// Buffer a packet, flushing the previous group on a primary keyframe.
    ///
    /// The packet always ends up in the open group, even when flushing the
    /// previous one fails; the failed group is dropped, not re-buffered.
    pub fn write_packet(&mut self, packet: Packet) -> Result<()> {
        let mut result = Ok(());

        if packet.is_primary_keyframe() {
            let (finished, duration) = self.take_gof();
            if !finished.is_empty() {
                result = self.write_gof(&finished, duration);
            }
        }

        if packet.is_primary() {
            self.duration += packet.duration;
        }
        self.gof.packets.push(packet);

        result
    }

    /// Flush the open group and close the hour files
    pub fn close(&mut self) -> Result<()> {
        let (pending, duration) = self.take_gof();
        let flushed = if pending.is_empty() {
            Ok(())
        } else {
            self.write_gof(&pending, duration)
        };
        let closed = self.close_files();
        flushed.and(closed)
    }

    fn take_gof(&mut self) -> (Gof, Duration) {
        let streams = self.gof.streams.clone();
        let gof = std::mem::replace(&mut self.gof, Gof::new(streams));
        (gof, std::mem::take(&mut self.duration))
    }

    fn write_gof(&mut self, gof: &Gof, duration: Duration) -> Result<()> {
        let now = self.clock.now();
        let blob = gof.encode()?;

        let key = hour_key(&now);
        if self.files.as_ref().map(|f| f.key) != Some(key) {
            self.open_hour(&now)?;
        }
        let files = self
            .files
            .as_mut()
            .ok_or_else(|| Error::InvalidInput("hour files are not open".to_string()))?;

        let offset = files.data.seek(SeekFrom::End(0))?;
        files.data.write_all(&blob)?;

        let record = IndexRecord {
            time_ns: now.timestamp_nanos_opt().unwrap_or(i64::MAX),
            offset: offset as i64,
            duration_ms: duration.as_millis() as i64,
        };
        files.index.write_all(&record.encode())?;
        files.groups += 1;

        tracing::debug!(
            dir = %files.dir.display(),
            hour = key.1,
            offset,
            bytes = blob.len(),
            packets = gof.packets.len(),
            duration_ms = record.duration_ms,
            "group flushed"
        );
        Ok(())
    }

    fn open_hour(&mut self, now: &DateTime<Utc>) -> Result<()> {
        self.close_files()?;

        let dir = self.root.join(now.format("%Y/%m/%d").to_string());
        fs::create_dir_all(&dir)?;

        let hour = now.hour();
        let data = open_append(&dir.join(format!("{}.d", hour)))?;
        let index = open_append(&dir.join(format!("{}.m", hour)))?;

        tracing::info!(dir = %dir.display(), hour, "opened hour files");
        self.files = Some(HourFiles {
            key: hour_key(now),
            dir,
            data,
            index,
            groups: 0,
        });
        Ok(())
    }

    fn close_files(&mut self) -> Result<()> {
        if let Some(files) = self.files.take() {
            files.data.sync_all()?;
            files.index.sync_all()?;
            tracing::info!(
                dir = %files.dir.display(),
                hour = files.key.1,
                groups = files.groups,
                "closed hour files"
            );
        }
        Ok(())
    }
}

fn hour_key(t: &DateTime<Utc>) -> (NaiveDate, u32) {
    (t.date_naive(), t.hour())
}

fn open_append(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o660);
    }
    options.open(path)
}

use std::{
    fmt,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
    config::WriterConfig,
    error::{NemError, Result},
    record::{format_datetime12, NemRecord, Row},
};

pub const HEADER_RECORD: u16 = 100;
pub const END_OF_DATA_RECORD: u16 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Nem12,
    Nem13,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nem12 => "NEM12",
            Self::Nem13 => "NEM13",
        }
    }
}

/// The 100 record shared by NEM12 and NEM13 files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    version: Version,
    file_time: PrimitiveDateTime,
    from_participant: Option<String>,
    to_participant: String,
}

impl FileHeader {
    /// Captures the current local time as the file creation time.
    ///
    /// `time` refuses to read the local offset once the process has more
    /// than one thread, so in most multi-threaded callers this falls back
    /// to UTC. Set the timestamp explicitly with `set_file_time` (or the
    /// files' `with_file_time`) when the local wall clock matters.
    pub fn new(
        version: Version,
        to_participant: impl Into<String>,
        from_participant: Option<String>,
    ) -> Result<Self> {
        let to_participant = to_participant.into();
        if to_participant.trim().is_empty() {
            return Err(NemError::Configuration("to_participant is required".to_string()));
        }

        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());

        Ok(Self {
            version,
            file_time: PrimitiveDateTime::new(now.date(), now.time()),
            from_participant: from_participant.filter(|p| !p.trim().is_empty()),
            to_participant,
        })
    }

    pub fn set_file_time(&mut self, at: PrimitiveDateTime) {
        self.file_time = at;
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn file_time(&self) -> PrimitiveDateTime {
        self.file_time
    }

    pub fn from_participant(&self) -> Option<&str> {
        self.from_participant.as_deref()
    }

    pub fn to_participant(&self) -> &str {
        &self.to_participant
    }
}

impl NemRecord for FileHeader {
    fn to_row(&self) -> Row {
        let mut row = Row::new(HEADER_RECORD);
        row.push_str(self.version.as_str())
            .push_str(&format_datetime12(self.file_time))
            .push_opt(self.from_participant())
            .push_str(&self.to_participant);
        row
    }
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} {} {}>",
            self.version.as_str(),
            format_datetime12(self.file_time),
            self.to_participant
        )
    }
}

/// CSV row writer with minimal quoting and CRLF line endings.
///
/// Rows have different field counts per record type, so the writer is
/// flexible.
pub struct RowWriter<W: Write> {
    inner: csv::Writer<W>,
    rows: usize,
}

impl<W: Write> RowWriter<W> {
    pub fn new(sink: W) -> Self {
        let inner = csv::WriterBuilder::new()
            .flexible(true)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::CRLF)
            .from_writer(sink);
        Self { inner, rows: 0 }
    }

    pub fn write(&mut self, row: &Row) -> Result<()> {
        self.inner
            .write_record(row.fields())
            .map_err(|e| NemError::Sink(format!("failed to write row: {e}")))?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes buffered rows and returns the number written.
    pub fn finish(mut self) -> Result<usize> {
        self.inner
            .flush()
            .map_err(|e| NemError::Sink(format!("failed to flush rows: {e}")))?;
        Ok(self.rows)
    }
}

/// Shared serialization for NEM12 and NEM13 files: 100 header, the
/// format-specific body, then the 900 terminator.
pub trait NemFile {
    fn header(&self) -> &FileHeader;

    fn write_body<W: Write>(&self, out: &mut RowWriter<W>) -> Result<()>;

    /// Writes the whole file to `sink` and returns the number of rows.
    ///
    /// Rows already handed to `sink` stay there if this fails partway; use
    /// [`NemFile::nem_output`] when a half-written file must never be visible.
    fn write_to<W: Write>(&self, sink: W) -> Result<usize> {
        let mut out = RowWriter::new(sink);
        out.write(&self.header().to_row())?;
        self.write_body(&mut out)?;
        out.write(&Row::new(END_OF_DATA_RECORD))?;
        out.finish()
    }

    /// Writes the file to `path` atomically: rows go to `<path>.tmp`, which
    /// is fsynced and renamed over `path` only once everything succeeded.
    fn nem_output<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let version = self.header().version().as_str();

        match write_atomic(path, |file| self.write_to(file)) {
            Ok(rows) => {
                metrics::counter!("nem_rows_written_total", "format" => version)
                    .increment(rows as u64);
                tracing::info!(format = version, path = %path.display(), rows, "nem file written");
                Ok(rows)
            }
            Err(e) => {
                metrics::counter!("nem_output_errors_total", "format" => version).increment(1);
                tracing::error!(error = %e, format = version, path = %path.display(), "nem file write failed");
                Err(e)
            }
        }
    }

    /// `nem_output` to the `[output] path` of `cfg`.
    fn nem_output_configured(&self, cfg: &WriterConfig) -> Result<usize> {
        self.nem_output(&cfg.output.path)
    }
}

fn tmp_path_for(path: &Path) -> Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| NemError::Sink(format!("destination '{}' has no file name", path.display())))?
        .to_os_string();
    name.push(".tmp");
    Ok(path.with_file_name(name))
}

fn sync_parent_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        File::open(parent)?.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn write_atomic<F>(path: &Path, write: F) -> Result<usize>
where
    F: FnOnce(&mut File) -> Result<usize>,
{
    let tmp_path = tmp_path_for(path)?;

    let result = (|| {
        let mut file = File::create(&tmp_path).map_err(|e| {
            NemError::Sink(format!("failed to open '{}' for writing: {e}", tmp_path.display()))
        })?;

        let rows = write(&mut file)?;

        file.sync_all()
            .map_err(|e| NemError::Sink(format!("failed to sync '{}': {e}", tmp_path.display())))?;
        drop(file);

        fs::rename(&tmp_path, path).map_err(|e| {
            NemError::Sink(format!(
                "failed to move '{}' to '{}': {e}",
                tmp_path.display(),
                path.display()
            ))
        })?;

        if let Err(e) = sync_parent_dir(path) {
            tracing::warn!(error = %e, path = %path.display(), "failed to sync destination directory");
        }

        Ok(rows)
    })();

    if result.is_err() {
        match fs::remove_file(&tmp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(error = %e, path = %tmp_path.display(), "failed to remove temporary file");
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use time::macros::datetime;

    struct HeaderOnly(FileHeader);

    impl NemFile for HeaderOnly {
        fn header(&self) -> &FileHeader {
            &self.0
        }

        fn write_body<W: Write>(&self, _out: &mut RowWriter<W>) -> Result<()> {
            Ok(())
        }
    }

    struct FailingBody(FileHeader);

    impl NemFile for FailingBody {
        fn header(&self) -> &FileHeader {
            &self.0
        }

        fn write_body<W: Write>(&self, out: &mut RowWriter<W>) -> Result<()> {
            out.write(&Row::new(200))?;
            Err(NemError::MalformedReading("boom".to_string()))
        }
    }

    fn header() -> FileHeader {
        let mut h = FileHeader::new(Version::Nem12, "RETAILER1", Some("MDP1".to_string())).unwrap();
        h.set_file_time(datetime!(2024-03-01 10:15:42));
        h
    }

    #[test]
    fn missing_to_participant_is_a_configuration_error() {
        let res = FileHeader::new(Version::Nem12, "  ", None);
        assert!(matches!(res, Err(NemError::Configuration(_))));
    }

    #[test]
    fn header_row_has_minute_precision_timestamp() {
        let row = header().to_row();
        assert_eq!(row.fields(), &["100", "NEM12", "202403011015", "MDP1", "RETAILER1"]);
    }

    #[test]
    fn header_row_leaves_absent_sender_empty() {
        let mut h = FileHeader::new(Version::Nem13, "RETAILER1", None).unwrap();
        h.set_file_time(datetime!(2024-03-01 10:15));
        assert_eq!(h.to_row().fields(), &["100", "NEM13", "202403011015", "", "RETAILER1"]);
    }

    #[test]
    fn header_displays_version_time_and_recipient() {
        assert_eq!(header().to_string(), "<NEM12 202403011015 RETAILER1>");
    }

    #[test]
    fn write_to_frames_body_with_header_and_terminator() {
        let mut buf = Vec::new();
        let rows = HeaderOnly(header()).write_to(&mut buf).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "100,NEM12,202403011015,MDP1,RETAILER1\r\n900\r\n"
        );
    }

    #[test]
    fn fields_are_quoted_only_when_needed() {
        let mut buf = Vec::new();
        {
            let mut out = RowWriter::new(&mut buf);
            let mut row = Row::new(200);
            row.push_str("plain").push_str("with,comma").push_str("with\"quote");
            out.write(&row).unwrap();
            out.finish().unwrap();
        }
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "200,plain,\"with,comma\",\"with\"\"quote\"\r\n"
        );
    }

    #[test]
    fn nem_output_replaces_destination_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale").unwrap();

        let rows = HeaderOnly(header()).nem_output(&path).unwrap();

        assert_eq!(rows, 2);
        assert!(fs::read_to_string(&path).unwrap().starts_with("100,NEM12"));
        assert!(!dir.path().join("out.csv.tmp").exists());
    }

    #[test]
    fn nem_output_keeps_previous_file_when_body_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "previous").unwrap();

        let res = FailingBody(header()).nem_output(&path);

        assert!(matches!(res, Err(NemError::MalformedReading(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
        assert!(!dir.path().join("out.csv.tmp").exists());
    }

    #[test]
    fn nem_output_reports_unwritable_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let res = HeaderOnly(header()).nem_output(&path);
        assert!(matches!(res, Err(NemError::Sink(_))));
    }

    #[test]
    fn nem_output_configured_writes_to_the_configured_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nem12.csv");
        let cfg = WriterConfig::from_toml_str(&format!(
            "[participants]\nto = \"RETAILER1\"\n\n[output]\npath = {:?}\n",
            path.display().to_string()
        ))
        .unwrap();

        let rows = HeaderOnly(header()).nem_output_configured(&cfg).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "100,NEM12,202403011015,MDP1,RETAILER1\r\n900\r\n"
        );
    }
}

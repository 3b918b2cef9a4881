use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::error::WriterError;
use super::event_record::EventRecord;

/// Streams accepted EventRecords into a JSON array on disk.
///
/// Records are written as they arrive, so a run never holds more than one batch in memory.
/// The array is closed by `close`; a writer that is dropped without closing leaves an
/// unterminated file.
#[derive(Debug)]
pub struct JsonWriter {
    file: BufWriter<File>,
    path: PathBuf,
    records_written: u64,
}

impl JsonWriter {
    /// Create the writer, opening a file at path and starting the array
    pub fn new(path: &Path) -> Result<Self, WriterError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(b"[")?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            records_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &EventRecord) -> Result<(), WriterError> {
        if self.records_written > 0 {
            self.file.write_all(b",")?;
        }
        self.file.write_all(b"\n")?;
        serde_json::to_writer(&mut self.file, record)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Terminate the array and flush to disk
    pub fn close(mut self) -> Result<u64, WriterError> {
        self.file.write_all(b"\n]\n")?;
        self.file.flush()?;
        Ok(self.records_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::Hit;
    use crate::stream_info::StreamInfo;
    use tempfile::TempDir;

    #[test]
    fn test_writes_valid_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("run_sro_data.json");
        let info = StreamInfo {
            frame_number: 1,
            timestamp: 2,
        };
        let hit = Hit {
            payload_id: 15,
            channel: 3,
            time: 4,
            charge: 5,
        };
        let mut writer = JsonWriter::new(&path).unwrap();
        writer
            .write_record(&EventRecord::new(&info, &info, vec![hit]))
            .unwrap();
        writer
            .write_record(&EventRecord::new(&info, &info, vec![]))
            .unwrap();
        assert_eq!(writer.close().unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let records: Vec<EventRecord> = serde_json::from_str(&contents).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hits, vec![hit]);
        assert!(records[1].hits.is_empty());
    }

    #[test]
    fn test_empty_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty_sro_data.json");
        let writer = JsonWriter::new(&path).unwrap();
        assert_eq!(writer.close().unwrap(), 0);
        let contents = std::fs::read_to_string(&path).unwrap();
        let records: Vec<EventRecord> = serde_json::from_str(&contents).unwrap();
        assert!(records.is_empty());
    }
}

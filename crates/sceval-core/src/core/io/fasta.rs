use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Header text without the leading `>`.
    pub header: String,
    pub sequence: String,
}

impl FastaRecord {
    pub fn new(header: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            sequence: sequence.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Sequence data on line {0} appears before any header")]
    MissingHeader(usize),
}

/// Reads all records, preserving file order. Sequence lines are concatenated
/// with surrounding whitespace removed.
pub fn read_fasta(reader: &mut impl BufRead) -> Result<Vec<FastaRecord>, FastaError> {
    let mut records: Vec<FastaRecord> = Vec::new();
    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            records.push(FastaRecord::new(header.trim(), String::new()));
        } else {
            let record = records
                .last_mut()
                .ok_or(FastaError::MissingHeader(line_num + 1))?;
            record.sequence.push_str(line);
        }
    }
    Ok(records)
}

pub fn read_fasta_path(path: impl AsRef<Path>) -> Result<Vec<FastaRecord>, FastaError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_fasta(&mut reader)
}

pub fn write_fasta(records: &[FastaRecord], writer: &mut impl Write) -> Result<(), FastaError> {
    for record in records {
        writeln!(writer, ">{}", record.header)?;
        writeln!(writer, "{}", record.sequence)?;
    }
    Ok(())
}

pub fn write_fasta_path(records: &[FastaRecord], path: impl AsRef<Path>) -> Result<(), FastaError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_fasta(records, &mut writer)?;
    writer.flush()?;
    Ok(())
}

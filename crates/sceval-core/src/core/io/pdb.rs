use super::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::builder::StructureBuilder;
use crate::core::models::structure::Structure;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// REMARK number reserved for structured `KEY value` annotations.
pub const ANNOTATION_REMARK: &str = "REMARK 999";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    /// Non-coordinate records preceding the coordinates, verbatim.
    pub header_lines: Vec<String>,
    /// `REMARK 999 KEY value` annotations keyed by upper-cased key.
    pub annotations: BTreeMap<String, String>,
}

impl PdbMetadata {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn set_annotation(&mut self, key: &str, value: &str) {
        self.annotations
            .insert(key.to_ascii_uppercase(), value.to_string());
    }
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_optional_float(line: &str, start: usize, end: usize, default: f64) -> f64 {
    slice_and_trim(line, start, end).parse().unwrap_or(default)
}

pub struct PdbFile;

impl StructureFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Structure, Self::Metadata), Self::Error> {
        let mut builder = StructureBuilder::new();
        let mut metadata = PdbMetadata::default();
        let mut seen_coordinates = false;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" => {
                    seen_coordinates = true;
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    let alt_loc = slice_and_trim(&line, 16, 17);
                    if !(alt_loc.is_empty() || alt_loc == "A") {
                        continue;
                    }

                    let serial_str = slice_and_trim(&line, 6, 11);
                    let serial: usize = serial_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "7-11".into(),
                            value: serial_str.into(),
                        },
                    })?;
                    let name = slice_and_trim(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".into(),
                            },
                        });
                    }
                    let res_name = slice_and_trim(&line, 17, 20);
                    let chain = slice_and_trim(&line, 21, 22).chars().next().unwrap_or('A');
                    let res_seq_str = slice_and_trim(&line, 22, 26);
                    let res_seq: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "23-26".into(),
                            value: res_seq_str.into(),
                        },
                    })?;
                    let insertion_code = slice_and_trim(&line, 26, 27).chars().next();

                    let x = parse_float(&line, line_num, 30, 38)?;
                    let y = parse_float(&line, line_num, 38, 46)?;
                    let z = parse_float(&line, line_num, 46, 54)?;

                    let mut atom = Atom::new(serial, name, Point3::new(x, y, z));
                    atom.occupancy = parse_optional_float(&line, 54, 60, 1.0);
                    atom.b_factor = parse_optional_float(&line, 60, 66, 0.0);
                    atom.element = slice_and_trim(&line, 76, 78).to_string();
                    atom.is_hetero = record_type == "HETATM";

                    builder.push_atom(chain, res_seq, insertion_code, res_name, atom);
                }
                "ENDMDL" | "END" => {
                    if seen_coordinates {
                        break;
                    }
                }
                "MODEL" | "TER" | "ANISOU" | "CONECT" | "MASTER" => {}
                _ => {
                    if line.trim().is_empty() || seen_coordinates {
                        continue;
                    }
                    if let Some(rest) = line.strip_prefix(ANNOTATION_REMARK) {
                        if let Some((key, value)) = rest.trim().split_once(char::is_whitespace) {
                            metadata.set_annotation(key, value.trim());
                        }
                    }
                    metadata.header_lines.push(line);
                }
            }
        }

        if builder.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }
        Ok((builder.build(), metadata))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            if !line.starts_with(ANNOTATION_REMARK) {
                writeln!(writer, "{}", line)?;
            }
        }
        for (key, value) in &metadata.annotations {
            writeln!(writer, "{} {} {}", ANNOTATION_REMARK, key, value)?;
        }

        for chain in structure.chains() {
            let mut last_residue = None;
            for residue in chain
                .residues()
                .iter()
                .filter_map(|&id| structure.residue(id))
            {
                for atom in residue.atoms() {
                    let record_type = if atom.is_hetero { "HETATM" } else { "ATOM" };
                    let name = if atom.name.len() < 4 {
                        format!(" {:<3}", atom.name)
                    } else {
                        atom.name.clone()
                    };
                    writeln!(
                        writer,
                        "{:<6}{:>5} {:<4} {:>3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                        record_type,
                        atom.serial,
                        name,
                        residue.name,
                        chain.id,
                        residue.number,
                        residue.insertion_code.unwrap_or(' '),
                        atom.position.x,
                        atom.position.y,
                        atom.position.z,
                        atom.occupancy,
                        atom.b_factor,
                        atom.element
                    )?;
                }
                last_residue = Some(residue);
            }
            if let Some(residue) = last_residue {
                writeln!(
                    writer,
                    "TER   {:>5}      {:>3} {:1}{:>4}",
                    residue.atoms().last().map_or(0, |a| a.serial + 1),
                    residue.name,
                    chain.id,
                    residue.number
                )?;
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}

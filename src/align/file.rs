use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::error::DecomposeError;
use crate::error::Result;
use crate::read::Read;

use super::AlignmentSource;

/// A fixed-width aligned-read FASTA file addressed by path.
///
/// Records are two lines each: a `>id` defline followed by one sequence
/// line. The alignment is never held whole in memory — every method that
/// needs to scan it opens its own buffered reader.
#[derive(Debug, Clone)]
pub struct Alignment {
    path: PathBuf,
}

impl Alignment {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(DecomposeError::io(
                path.clone(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "alignment file not found"),
            ));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// descending-multiplicity unique sequences, see [`crate::unique`]
    pub fn unique_iter(&self) -> Result<crate::unique::UniqueIter> {
        crate::unique::UniqueIter::scan(self)
    }
}

impl AlignmentSource for Alignment {
    type Iter<'a> = AlignmentIter;

    fn total(&self) -> Result<usize> {
        Ok(self.iter()?.count())
    }

    fn width(&self) -> Result<usize> {
        let mut iter = self.iter()?;
        match iter.next() {
            Some(read) => Ok(read?.sequence.len()),
            None => Ok(0),
        }
    }

    fn iter(&self) -> Result<AlignmentIter> {
        let file = File::open(&self.path).map_err(|e| DecomposeError::io(&self.path, e))?;
        Ok(AlignmentIter {
            path: self.path.clone(),
            lines: BufReader::new(file).lines(),
            expected_len: None,
        })
    }
}

pub struct AlignmentIter {
    path: PathBuf,
    lines: std::io::Lines<BufReader<File>>,
    expected_len: Option<usize>,
}

impl Iterator for AlignmentIter {
    type Item = Result<Read>;

    fn next(&mut self) -> Option<Self::Item> {
        let defline = loop {
            match self.lines.next()? {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => break line,
                Err(e) => return Some(Err(DecomposeError::io(&self.path, e))),
            }
        };
        let id = match defline.strip_prefix('>') {
            Some(id) => id.to_string(),
            None => {
                return Some(Err(DecomposeError::Format(format!(
                    "expected defline starting with '>', got {defline:?}"
                ))))
            }
        };
        let sequence = match self.lines.next() {
            Some(Ok(seq)) => seq,
            Some(Err(e)) => return Some(Err(DecomposeError::io(&self.path, e))),
            None => {
                return Some(Err(DecomposeError::Format(format!(
                    "id {id} has no sequence line"
                ))))
            }
        };
        let sequence: Vec<u8> = sequence
            .bytes()
            .map(|b| if crate::ALPHABET.contains(&b) { b } else { b'-' })
            .collect();

        match self.expected_len {
            None => self.expected_len = Some(sequence.len()),
            Some(expected) if expected != sequence.len() => {
                return Some(Err(DecomposeError::Format(format!(
                    "read {id} has length {} but alignment length is {expected}",
                    sequence.len()
                ))))
            }
            Some(_) => {}
        }

        Some(Ok(Read { id, sequence }))
    }
}

/// Write-only, append-then-close access to an alignment file.
pub struct AlignmentWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AlignmentWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| DecomposeError::io(&path, e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, id: &str, sequence: &[u8]) -> Result<()> {
        writeln!(self.writer, ">{id}").map_err(|e| DecomposeError::io(&self.path, e))?;
        self.writer
            .write_all(sequence)
            .and_then(|_| writeln!(self.writer))
            .map_err(|e| DecomposeError::io(&self.path, e))
    }

    pub fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| DecomposeError::io(&self.path, e))
    }
}

/// A single aligned record: an id line and a fixed-width sequence.
///
/// `sequence` is raw ASCII bytes from `{A,C,G,T,-}`; anything else is
/// coerced to `-` at the point it is read off disk (see [`crate::align`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl Read {
    pub fn new(id: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
        }
    }

    /// length with gaps removed
    pub fn unaligned_len(&self) -> usize {
        self.sequence.iter().filter(|&&b| b != b'-').count()
    }
}

/// Derives the sample name from a read id: split on `|`, take element 0,
/// split that on `separator`, drop the last segment, rejoin with `separator`.
///
/// Mirrors the original `dataset_name_from_defline`:
/// `sep.join(defline.split('|')[0].split(sep)[0:-1])`.
pub fn sample_name(id: &str, separator: char) -> String {
    let defline = id.split('|').next().unwrap_or(id);
    let mut parts: Vec<&str> = defline.split(separator).collect();
    if parts.len() > 1 {
        parts.pop();
    }
    parts.join(&separator.to_string())
}

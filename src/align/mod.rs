mod file;

pub use file::Alignment;
pub use file::AlignmentWriter;

use crate::read::Read;

/// Sequential + random access over a fixed-width aligned-read file.
///
/// Implementations must coerce any byte outside [`crate::ALPHABET`] to `-`
/// and must fail with `DecomposeError::Format` the moment a sequence whose
/// length differs from the first one observed is read.
pub trait AlignmentSource {
    type Iter<'a>: Iterator<Item = crate::error::Result<Read>>
    where
        Self: 'a;

    /// total number of reads in the file
    fn total(&self) -> crate::error::Result<usize>;
    /// length L of every sequence in this alignment
    fn width(&self) -> crate::error::Result<usize>;
    /// sequential iteration from the start of the file
    fn iter(&self) -> crate::error::Result<Self::Iter<'_>>;
}

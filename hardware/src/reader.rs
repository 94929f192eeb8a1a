//! RFID reader abstraction

use std::fmt;

use crate::ReaderError;

/// Identifier read from a tag
///
/// Stored as the decimal string the reader reports so it can be compared
/// with ids written by hand into configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(String);

impl TagId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for TagId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reader that blocks until a tag is presented
pub trait TagReader: Send {
    fn read_tag(&mut self) -> Result<TagId, ReaderError>;
}

impl<T: TagReader + ?Sized> TagReader for Box<T> {
    fn read_tag(&mut self) -> Result<TagId, ReaderError> {
        (**self).read_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids_compare_equal() {
        assert_eq!(TagId::from(584190412874u64), TagId::new("584190412874"));
        assert_eq!(TagId::new(" 42 \n"), TagId::new("42"));
    }
}

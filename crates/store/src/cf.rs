//! Fixed column family definitions.
//!
//! The engine has exactly two column families, both known at compile time.
//! Type metadata records and per-type payload keys live in separate families
//! so a metadata scan never touches payload data.

/// Compile-time column family identifier. Dynamic creation is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColumnFamily {
    /// Per-user-key type metadata records.
    Metadata = 0,

    /// Versioned internal keys holding per-type payload blobs.
    Data = 1,
}

impl ColumnFamily {
    /// Total number of column families.
    pub const COUNT: usize = 2;

    /// Returns the human-readable name for this column family.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Data => "data",
        }
    }

    /// Returns all column families.
    pub const fn all() -> [ColumnFamily; Self::COUNT] {
        [Self::Metadata, Self::Data]
    }

    /// Converts from u8 to ColumnFamily.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Metadata),
            1 => Some(Self::Data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_family_round_trip() {
        for cf in ColumnFamily::all() {
            let byte = cf as u8;
            let recovered = ColumnFamily::from_u8(byte).unwrap();
            assert_eq!(cf, recovered);
        }
    }

    #[test]
    fn test_from_u8_rejects_out_of_range() {
        assert!(ColumnFamily::from_u8(2).is_none());
        assert!(ColumnFamily::from_u8(255).is_none());
    }

    #[test]
    fn test_names() {
        assert_eq!(ColumnFamily::Metadata.name(), "metadata");
        assert_eq!(ColumnFamily::Data.name(), "data");
    }
}

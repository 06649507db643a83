use derive_more::Display;

/// The size of a byte stream passed between codecs.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum BytesRepresentation {
    /// Exactly this many bytes.
    #[display("{_0} bytes")]
    FixedSize(u64),
    /// At most this many bytes.
    #[display("at most {_0} bytes")]
    BoundedSize(u64),
    /// The size is not known in advance.
    #[display("unknown size")]
    UnboundedSize,
}

impl BytesRepresentation {
    /// Return the fixed size or upper bound, or [`None`] if the size is unbounded.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        match self {
            Self::FixedSize(size) | Self::BoundedSize(size) => Some(*size),
            Self::UnboundedSize => None,
        }
    }

    /// Return the size as a buffer capacity, zero if unbounded or not addressable.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.size()
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or_default()
    }

    /// Add `overhead` bytes, keeping the representation kind.
    #[must_use]
    pub const fn with_overhead(self, overhead: u64) -> Self {
        match self {
            Self::FixedSize(size) => Self::FixedSize(size + overhead),
            Self::BoundedSize(size) => Self::BoundedSize(size + overhead),
            Self::UnboundedSize => Self::UnboundedSize,
        }
    }

    /// The upper bound of a compressed stream with `overhead(size)` bytes of framing.
    ///
    /// A compressor cannot know the exact output size, so a known size becomes a bound.
    #[must_use]
    pub fn compressed(self, overhead: impl FnOnce(u64) -> u64) -> Self {
        self.size()
            .map_or(Self::UnboundedSize, |size| {
                Self::BoundedSize(size + overhead(size))
            })
    }
}

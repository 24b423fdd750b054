//! Filter to kernel entry point mapping.

use ifx_core::{FILTER_COUNT, FilterId};

/// Entry point names indexed by [`FilterId::index`].
const ENTRY_POINTS: [&str; FILTER_COUNT] = [
    "invertFilterKernel",
    "grayFilterKernel",
    "grayToBinaryFilterKernel",
    "acosFilterKernel",
    "sepiaFilterKernel",
    "gaussianBlurFilterKernel",
    "redChannelFilterKernel",
    "greenChannelFilterKernel",
    "blueChannelFilterKernel",
];

/// Reverse lookup used by backends that implement kernels natively.
pub fn filter_for_entry_point(name: &str) -> Option<FilterId> {
    ENTRY_POINTS
        .iter()
        .position(|e| *e == name)
        .map(|i| FilterId::ALL[i])
}

/// Owned table of kernel entry point names, one per filter.
///
/// Built once per session and released at teardown. Releasing consumes the
/// table, so a released table cannot be queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelNameTable {
    names: [String; FILTER_COUNT],
}

impl KernelNameTable {
    /// Populates every entry.
    pub fn build() -> Self {
        let names = ENTRY_POINTS.map(String::from);
        tracing::trace!(count = names.len(), "kernel name table built");
        Self { names }
    }

    /// Entry point for a filter.
    pub fn entry_point(&self, filter: FilterId) -> &str {
        &self.names[filter.index()]
    }

    /// `(filter, entry point)` pairs in filter order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterId, &str)> + '_ {
        FilterId::ALL.into_iter().zip(self.names.iter().map(String::as_str))
    }

    /// Number of entries (always [`FILTER_COUNT`]).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Never true; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Frees every entry and returns how many were released.
    pub fn release(self) -> usize {
        let count = self.names.len();
        drop(self.names);
        tracing::debug!(count, "kernel name table released");
        count
    }
}

impl Default for KernelNameTable {
    fn default() -> Self {
        Self::build()
    }
}

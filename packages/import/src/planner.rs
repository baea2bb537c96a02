//! Splitting work into ordered, bounded chunks.

/// Records per `create_records` call unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Splits `items` into contiguous chunks of at most `chunk_size`,
/// preserving order. The last chunk may be shorter. A `chunk_size` of 0
/// is treated as 1.
#[must_use]
pub fn plan<T>(items: Vec<T>, chunk_size: usize) -> Vec<Vec<T>> {
    let size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));

    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }

    chunks
}

/// Progress after a chunk has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Chunks written so far.
    pub completed: usize,
    /// Chunks in the whole run.
    pub total: usize,
}

impl ChunkProgress {
    /// `completed / total`, or `1.0` for an empty run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }

    /// Whether every chunk has been written.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.completed >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_twenty_items_make_three_chunks() {
        let chunks = plan((0..120).collect(), DEFAULT_CHUNK_SIZE);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, [50, 50, 20]);
        assert_eq!(chunks.concat(), (0..120).collect::<Vec<_>>());
    }

    #[test]
    fn chunk_count_is_ceiling() {
        for n in [0usize, 1, 49, 50, 51, 100, 101, 257] {
            let chunks = plan(vec![(); n], 50);
            assert_eq!(chunks.len(), n.div_ceil(50), "n = {n}");
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 50));
        }
    }

    #[test]
    fn zero_chunk_size_means_one() {
        let chunks = plan(vec!['a', 'b', 'c'], 0);
        assert_eq!(chunks, [vec!['a'], vec!['b'], vec!['c']]);
    }

    #[test]
    fn fraction() {
        let p = ChunkProgress {
            completed: 1,
            total: 4,
        };
        assert!((p.fraction() - 0.25).abs() < f64::EPSILON);
        assert!(!p.is_complete());
        let empty = ChunkProgress {
            completed: 0,
            total: 0,
        };
        assert!((empty.fraction() - 1.0).abs() < f64::EPSILON);
        assert!(empty.is_complete());
    }
}

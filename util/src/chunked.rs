//! Fork-join scheduling for per-tile grid transforms.

use rayon::prelude::*;

/// Contiguous half-open index span over a work list.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Number of parallel workers to plan for.
///
/// `None` means use available hardware parallelism.
pub fn worker_count(requested: Option<usize>) -> usize {
    requested
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1)
}

/// Partition `len` work items into spans sized for `workers` parallel
/// tasks.
///
/// Spans start at `min_chunk` items and double in size until at most
/// `2 * workers` spans remain. A work list smaller than the minimum chunk
/// is split in half instead so short passes can still fan out.
pub fn partition_spans(len: usize, min_chunk: usize, workers: usize) -> Vec<Span> {
    if len == 0 {
        return Vec::new();
    }

    let workers = workers.max(1);
    let mut chunk = min_chunk.max(1).min((len / 2).max(1));
    while len.div_ceil(chunk) > 2 * workers {
        chunk *= 2;
    }

    (0..len)
        .step_by(chunk)
        .map(|start| Span {
            start,
            end: (start + chunk).min(len),
        })
        .collect()
}

/// Run one task per span and block until every task has completed.
///
/// Results come back in span order. Spans must not overlap in the cells
/// they write; nothing here locks. A panic inside a task propagates to
/// the caller after the join.
pub fn process_spans<R, F>(spans: &[Span], f: F) -> Vec<R>
where
    R: Send,
    F: Fn(Span) -> R + Sync,
{
    spans.par_iter().map(|&s| f(s)).collect()
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[quickcheck]
    fn partition_covers_everything(len: usize, min_chunk: usize, workers: usize) {
        let len = len % 10_000;
        let min_chunk = min_chunk % 256;
        let workers = workers % 64;

        let spans = partition_spans(len, min_chunk, workers);

        let mut cursor = 0;
        for s in &spans {
            assert_eq!(s.start, cursor, "gap or overlap in spans");
            assert!(s.end > s.start);
            cursor = s.end;
        }
        assert_eq!(cursor, len);

        if len > 0 {
            assert!(spans.len() <= 2 * workers.max(1));
        }
    }

    #[test]
    fn small_grids_split_in_half() {
        let spans = partition_spans(10, 64, 8);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], Span { start: 0, end: 5 });
        assert_eq!(spans[1], Span { start: 5, end: 10 });
    }

    #[test]
    fn chunks_double_down_to_worker_count() {
        // 1024 items, min chunk 16, one worker: 64 spans is far too many,
        // doubling stops at 512-item chunks.
        let spans = partition_spans(1024, 16, 1);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn spans_join_with_results_in_order() {
        let spans = partition_spans(100, 10, 4);
        let sums = process_spans(&spans, |s| (s.start..s.end).sum::<usize>());
        assert_eq!(sums.iter().sum::<usize>(), (0..100).sum::<usize>());
        assert_eq!(sums.len(), spans.len());
    }
}

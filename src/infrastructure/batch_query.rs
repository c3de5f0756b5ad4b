//! Batched key lookups with a fixed set of prepared statement shapes.
//!
//! A list of N keys is served by repeatedly taking the largest shape that
//! still fits the remainder, so only one statement per shape is ever
//! prepared while most keys travel in a few round trips.

/// Shape sizes used for primary-key lookups.
pub const DEFAULT_SHAPES: [usize; 4] = [51, 13, 4, 1];

#[derive(Debug, Clone)]
pub struct BatchQuery {
    /// Descending by size; the last shape always has size 1.
    shapes: Vec<(usize, String)>,
}

impl BatchQuery {
    /// `render(n)` must produce the statement taking exactly `n` parameter
    /// sets. A size-1 shape is added when missing.
    pub fn new(sizes: &[usize], render: impl Fn(usize) -> String) -> Self {
        let mut sizes: Vec<usize> = sizes.iter().copied().filter(|&n| n > 0).collect();
        sizes.push(1);
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes.dedup();

        Self {
            shapes: sizes.into_iter().map(|n| (n, render(n))).collect(),
        }
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.shapes.iter().map(|(n, _)| *n).collect()
    }

    /// Splits `keys` into (statement, chunk) pairs; every chunk length
    /// equals the parameter count of its statement.
    pub fn chunks<'q, 'k, K>(&'q self, keys: &'k [K]) -> Chunks<'q, 'k, K> {
        Chunks {
            shapes: &self.shapes,
            shape: 0,
            keys,
        }
    }

    /// Runs `exec` once per chunk and concatenates the results.
    pub fn run<K, T, E, F>(&self, keys: &[K], mut exec: F) -> Result<Vec<T>, E>
    where
        F: FnMut(&str, &[K]) -> Result<Vec<T>, E>,
    {
        let mut out = Vec::new();
        for (sql, chunk) in self.chunks(keys) {
            out.extend(exec(sql, chunk)?);
        }
        Ok(out)
    }
}

pub struct Chunks<'q, 'k, K> {
    shapes: &'q [(usize, String)],
    shape: usize,
    keys: &'k [K],
}

impl<'q, 'k, K> Iterator for Chunks<'q, 'k, K> {
    type Item = (&'q str, &'k [K]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.keys.is_empty() {
            return None;
        }
        // Terminates: the smallest shape is 1 and keys is non-empty.
        while self.shapes[self.shape].0 > self.keys.len() {
            self.shape += 1;
        }
        let (size, sql) = &self.shapes[self.shape];
        let (chunk, rest) = self.keys.split_at(*size);
        self.keys = rest;
        Some((sql.as_str(), chunk))
    }
}

/// `$1, $2, ..., $n`
pub fn pg_placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> BatchQuery {
        BatchQuery::new(&DEFAULT_SHAPES, |n| format!("q{}", n))
    }

    fn plan(len: usize) -> Vec<usize> {
        let keys: Vec<usize> = (0..len).collect();
        query().chunks(&keys).map(|(_, chunk)| chunk.len()).collect()
    }

    #[test]
    fn uses_largest_fitting_shape_first() {
        assert_eq!(plan(120), vec![51, 51, 13, 4, 1]);
        assert_eq!(plan(51), vec![51]);
        assert_eq!(plan(50), vec![13, 13, 13, 4, 4, 1, 1, 1]);
        assert_eq!(plan(3), vec![1, 1, 1]);
        assert!(plan(0).is_empty());
    }

    #[test]
    fn statement_matches_chunk_size() {
        let keys: Vec<u32> = (0..70).collect();
        let q = query();
        for (sql, chunk) in q.chunks(&keys) {
            assert_eq!(sql, format!("q{}", chunk.len()));
        }
    }

    #[test]
    fn run_preserves_key_order_and_stops_on_error() {
        let keys: Vec<u32> = (0..20).collect();
        let echoed: Result<Vec<u32>, String> = query().run(&keys, |_, chunk| Ok(chunk.to_vec()));
        assert_eq!(echoed.unwrap(), keys);

        let mut calls = 0;
        let failed: Result<Vec<u32>, String> = query().run(&keys, |_, _| {
            calls += 1;
            Err("boom".to_string())
        });
        assert_eq!(failed.unwrap_err(), "boom");
        assert_eq!(calls, 1);
    }

    #[test]
    fn shapes_are_normalized_and_always_end_in_one() {
        let q = BatchQuery::new(&[4, 0, 13, 4], |n| n.to_string());
        assert_eq!(q.sizes(), vec![13, 4, 1]);
    }

    #[test]
    fn renders_postgres_placeholders() {
        assert_eq!(pg_placeholders(1), "$1");
        assert_eq!(pg_placeholders(4), "$1, $2, $3, $4");
    }
}

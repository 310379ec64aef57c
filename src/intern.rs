//! String interning for repeated field values.
//!
//! Host names and page URLs repeat across millions of log lines. Each parse
//! run owns one [`Interner`]; equal strings handed to it come back as clones
//! of the same `Arc<str>`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared, thread-safe intern table scoped to one parse run
#[derive(Debug, Default)]
pub struct Interner {
    table: Mutex<HashSet<Arc<str>>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical instance for `value`, inserting it if new.
    pub fn intern(&self, value: &str) -> Arc<str> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = table.get(value) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(value);
        table.insert(Arc::clone(&shared));
        shared
    }

    /// Number of distinct strings held
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_strings_share_instance() {
        let interner = Interner::new();
        let a = interner.intern("www.wikipedia.org");
        let b = interner.intern(&String::from("www.wikipedia.org"));
        let c = interner.intern("www.example.com");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_separate_runs_do_not_share() {
        let first = Interner::new();
        let second = Interner::new();
        let a = first.intern("webclient1");
        let b = second.intern("webclient1");

        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!first.is_empty());
    }

    #[test]
    fn test_concurrent_interning() {
        let interner = Interner::new();
        let handles: Vec<Arc<str>> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..4)
                .map(|_| s.spawn(|| interner.intern("relayexit3")))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(interner.len(), 1);
    }
}

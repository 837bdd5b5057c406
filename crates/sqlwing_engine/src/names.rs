use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

const TAG_LEN: usize = 8;

/// Random lowercase tag chosen once per process.
///
/// Keeps names from two processes writing into the same database file apart.
fn process_tag() -> &'static str {
    static TAG: OnceLock<String> = OnceLock::new();
    TAG.get_or_init(|| {
        let mut rng = rand::rng();
        (0..TAG_LEN)
            .map(|_| rng.random_range(b'a'..=b'z') as char)
            .collect()
    })
}

/// Generates relation names of the form `<prefix><tag>_<n>`.
///
/// Names are valid bare SQL identifiers and unique for the lifetime of the
/// process: the counter never repeats and the tag is fixed per process.
#[derive(Debug)]
pub struct NameGenerator {
    prefix: &'static str,
    next: AtomicU64,
}

impl NameGenerator {
    /// `prefix` must itself be a valid identifier start, e.g. `_tbl_`.
    pub const fn new(prefix: &'static str) -> Self {
        NameGenerator {
            prefix,
            next: AtomicU64::new(0),
        }
    }

    pub fn next_name(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}_{n}", self.prefix, process_tag())
    }
}

//! Collation lookup service.
//!
//! Collation tables are external data; the core only looks an id up and
//! delegates. The process registry ships two built-ins: the `binary`
//! collation and an ASCII case-insensitive collation standing in for the
//! `*_general_ci` family. Anything else is registered by the embedder.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use serde::{Deserialize, Serialize};

/// Numeric collation identifier as used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollationId(pub u32);

/// Sentinel for "no collation known".
pub const COLLATION_UNKNOWN: CollationId = CollationId(0);

/// MySQL id 63, `binary`.
pub const COLLATION_BINARY: CollationId = CollationId(63);

/// MySQL id 11, `ascii_general_ci`.
pub const COLLATION_ASCII_GENERAL_CI: CollationId = CollationId(11);

impl CollationId {
    pub fn is_unknown(self) -> bool {
        self == COLLATION_UNKNOWN
    }
}

impl std::fmt::Display for CollationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One collation's comparison and hashing behavior.
///
/// Contract: `collate(a, b, pad) == 0` implies `hash(a, s) == hash(b, s)`
/// for every seed `s`.
pub trait Collation: Send + Sync {
    fn id(&self) -> CollationId;
    fn name(&self) -> &str;

    /// Three-way comparison. `pad_space` requests PAD SPACE semantics
    /// (trailing spaces ignored).
    fn collate(&self, left: &[u8], right: &[u8], pad_space: bool) -> i32;

    /// Seeded hash consistent with `collate`.
    fn hash(&self, bytes: &[u8], seed: u64) -> u64;
}

/// Id-to-collation lookup table.
pub struct CollationRegistry {
    by_id: RwLock<HashMap<CollationId, Arc<dyn Collation>>>,
}

impl CollationRegistry {
    pub fn new() -> Self {
        CollationRegistry { by_id: RwLock::new(HashMap::new()) }
    }

    /// Process-wide registry, pre-seeded with the built-in collations.
    pub fn global() -> &'static CollationRegistry {
        static GLOBAL: OnceLock<CollationRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let registry = CollationRegistry::new();
            registry.register(Arc::new(BinaryCollation));
            registry.register(Arc::new(AsciiGeneralCi));
            registry
        })
    }

    pub fn register(&self, collation: Arc<dyn Collation>) {
        self.by_id
            .write()
            .expect("collation registry poisoned")
            .insert(collation.id(), collation);
    }

    pub fn lookup(&self, id: CollationId) -> Option<Arc<dyn Collation>> {
        self.by_id
            .read()
            .expect("collation registry poisoned")
            .get(&id)
            .cloned()
    }
}

impl Default for CollationRegistry {
    fn default() -> Self {
        CollationRegistry::new()
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8], seed: u64) -> u64 {
    let mut hash = FNV_OFFSET ^ seed;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn trim_trailing_spaces(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == b' ' {
        end -= 1;
    }
    &bytes[..end]
}

/// Raw byte comparison, no padding, no case folding.
struct BinaryCollation;

impl Collation for BinaryCollation {
    fn id(&self) -> CollationId {
        COLLATION_BINARY
    }

    fn name(&self) -> &str {
        "binary"
    }

    fn collate(&self, left: &[u8], right: &[u8], _pad_space: bool) -> i32 {
        match left.cmp(right) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }
    }

    fn hash(&self, bytes: &[u8], seed: u64) -> u64 {
        fnv1a(bytes, seed)
    }
}

/// ASCII case-insensitive comparison with PAD SPACE support.
struct AsciiGeneralCi;

impl Collation for AsciiGeneralCi {
    fn id(&self) -> CollationId {
        COLLATION_ASCII_GENERAL_CI
    }

    fn name(&self) -> &str {
        "ascii_general_ci"
    }

    fn collate(&self, left: &[u8], right: &[u8], pad_space: bool) -> i32 {
        let (left, right) = if pad_space {
            (trim_trailing_spaces(left), trim_trailing_spaces(right))
        } else {
            (left, right)
        };
        let folded = |b: &u8| b.to_ascii_lowercase();
        match left.iter().map(folded).cmp(right.iter().map(folded)) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }
    }

    fn hash(&self, bytes: &[u8], seed: u64) -> u64 {
        // Hash the weight form: case-folded with trailing spaces stripped, so
        // pad-equal strings collide as the contract requires.
        let weights: Vec<u8> = trim_trailing_spaces(bytes)
            .iter()
            .map(u8::to_ascii_lowercase)
            .collect();
        fnv1a(&weights, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_builtins() {
        let registry = CollationRegistry::global();
        assert_eq!(registry.lookup(COLLATION_BINARY).expect("binary").name(), "binary");
        assert_eq!(
            registry.lookup(COLLATION_ASCII_GENERAL_CI).expect("ascii").name(),
            "ascii_general_ci"
        );
        assert!(registry.lookup(COLLATION_UNKNOWN).is_none());
    }

    #[test]
    fn case_insensitive_equality_implies_equal_hashes() {
        let coll = CollationRegistry::global()
            .lookup(COLLATION_ASCII_GENERAL_CI)
            .expect("ascii collation");
        assert_eq!(coll.collate(b"Hello", b"hELLO", false), 0);
        assert_eq!(coll.hash(b"Hello", 0), coll.hash(b"hELLO", 0));
        assert_eq!(coll.collate(b"abc ", b"abc", true), 0);
        assert_eq!(coll.hash(b"abc ", 7), coll.hash(b"abc", 7));
    }

    #[test]
    fn binary_orders_bytes_lexicographically() {
        let coll = CollationRegistry::global().lookup(COLLATION_BINARY).expect("binary");
        assert!(coll.collate(b"abc", b"abd", false) < 0);
        assert!(coll.collate(b"b", b"a", false) > 0);
        assert_eq!(coll.collate(b"same", b"same", false), 0);
        assert_ne!(coll.collate(b"A", b"a", false), 0);
    }
}

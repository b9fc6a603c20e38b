//! String interning for site keys and prefix groups.
//!
//! Site keys and group prefixes are mapped to dense integers once at
//! registry build time, so the allocator compares `u32`s instead of
//! slicing and comparing strings on every check.

use rustc_hash::FxHashMap;

/// Interned site key (index into the registry).
pub type SiteId = u32;

/// Interned prefix group.
pub type GroupId = u32;

/// String interner that maps strings to dense integer ids in insertion order.
#[derive(Debug, Clone)]
pub struct KeyInterner {
    to_int: FxHashMap<String, u32>,
    from_int: Vec<String>,
}

impl KeyInterner {
    /// Create a new interner with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_int: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_int: Vec::with_capacity(capacity),
        }
    }

    /// Intern a string, returning its integer ID.
    /// If already interned, returns the existing ID.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.to_int.get(s) {
            return id;
        }
        let id = self.from_int.len() as u32;
        self.from_int.push(s.to_string());
        self.to_int.insert(s.to_string(), id);
        id
    }

    /// Get the integer ID for a string, if it exists.
    #[inline]
    pub fn get(&self, s: &str) -> Option<u32> {
        self.to_int.get(s).copied()
    }

    /// Get the string for an integer ID.
    #[inline]
    pub fn resolve(&self, id: u32) -> Option<&str> {
        self.from_int.get(id as usize).map(|s| s.as_str())
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.from_int.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.from_int.is_empty()
    }
}

impl Default for KeyInterner {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

//! Interned-string dictionary.
//!
//! Names occurring in a document tend to repeat heavily, so the tokenizer
//! returns `Rc<str>` handles deduplicated through a per-parse dictionary.
//! Two occurrences of the same name intern to the same allocation, which
//! lets tag matching compare by pointer before falling back to bytes.

use std::rc::Rc;

/// Initial number of buckets. Kept a power of two so the hash can be
/// reduced with a mask.
const INITIAL_BUCKETS: usize = 128;
/// Rehash when the entry count exceeds buckets * MAX_LOAD.
const MAX_LOAD: usize = 4;

/// A name-interning hash table.
///
/// The hash is seeded from [`rand::random`] at construction so that an
/// attacker controlling document names cannot pre-compute a collision set.
#[doc(alias = "xmlDict")]
pub struct XmlDict {
    seed: u64,
    buckets: Vec<Vec<Rc<str>>>,
    entries: usize,
}

impl XmlDict {
    pub fn new() -> Self {
        Self {
            seed: rand::random(),
            buckets: vec![Vec::new(); INITIAL_BUCKETS],
            entries: 0,
        }
    }

    fn hash(&self, s: &str) -> u64 {
        // FNV-1a folded with the per-dictionary seed.
        let mut h = 0xCBF2_9CE4_8422_2325u64 ^ self.seed;
        for &b in s.as_bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x0000_0100_0000_01B3);
        }
        h
    }

    /// Return the interned handle for `s` if it is already present.
    #[doc(alias = "xmlDictExists")]
    pub fn lookup(&self, s: &str) -> Option<Rc<str>> {
        let index = (self.hash(s) as usize) & (self.buckets.len() - 1);
        self.buckets[index]
            .iter()
            .find(|interned| interned.as_ref() == s)
            .cloned()
    }

    /// Intern `s`, returning the shared handle.
    #[doc(alias = "xmlDictLookup")]
    pub fn intern(&mut self, s: &str) -> Rc<str> {
        let index = (self.hash(s) as usize) & (self.buckets.len() - 1);
        if let Some(interned) = self.buckets[index].iter().find(|i| i.as_ref() == s) {
            return Rc::clone(interned);
        }
        let interned: Rc<str> = Rc::from(s);
        self.buckets[index].push(Rc::clone(&interned));
        self.entries += 1;
        if self.entries > self.buckets.len() * MAX_LOAD {
            self.grow();
        }
        interned
    }

    /// Intern the `prefix:local` form.
    #[doc(alias = "xmlDictQLookup")]
    pub fn intern_qname(&mut self, prefix: &str, local: &str) -> Rc<str> {
        let qname = format!("{prefix}:{local}");
        self.intern(&qname)
    }

    fn grow(&mut self) {
        let new_len = self.buckets.len() * 2;
        let old = std::mem::replace(&mut self.buckets, vec![Vec::new(); new_len]);
        for bucket in old {
            for interned in bucket {
                let index = (self.hash(&interned) as usize) & (new_len - 1);
                self.buckets[index].push(interned);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

impl Default for XmlDict {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut dict = XmlDict::new();
        let a = dict.intern("element");
        let b = dict.intern("element");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(dict.len(), 1);
        let c = dict.intern("attribute");
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn lookup_does_not_insert() {
        let mut dict = XmlDict::new();
        assert!(dict.lookup("missing").is_none());
        assert!(dict.is_empty());
        let a = dict.intern("present");
        assert!(Rc::ptr_eq(&a, &dict.lookup("present").unwrap()));
    }

    #[test]
    fn qname_interning() {
        let mut dict = XmlDict::new();
        let q = dict.intern_qname("ns", "local");
        assert_eq!(q.as_ref(), "ns:local");
        let again = dict.intern("ns:local");
        assert!(Rc::ptr_eq(&q, &again));
    }

    #[test]
    fn survives_rehash() {
        let mut dict = XmlDict::new();
        let handles: Vec<_> = (0..2000).map(|i| dict.intern(&format!("name{i}"))).collect();
        for (i, h) in handles.iter().enumerate() {
            let found = dict.lookup(&format!("name{i}")).unwrap();
            assert!(Rc::ptr_eq(h, &found));
        }
    }
}

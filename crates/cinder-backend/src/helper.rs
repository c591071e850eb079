use std::fmt::{Debug, Display};

use cranelift_bitset::ScalarBitSet;

/// Runtime functions the generated code calls.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Helper {
    Safe,
    SafeAsync,
    Range,
    Get,
    Set,
}

impl Helper {
    pub const ALL: [Helper; 5] = [
        Helper::Safe,
        Helper::SafeAsync,
        Helper::Range,
        Helper::Get,
        Helper::Set,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Helper::Safe => "_safe",
            Helper::SafeAsync => "_safe_async",
            Helper::Range => "_range",
            Helper::Get => "_get",
            Helper::Set => "_set",
        }
    }

    pub fn from_name(name: &str) -> Option<Helper> {
        Helper::ALL.into_iter().find(|h| h.name() == name)
    }
}

impl Display for Helper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The helpers one compilation needs, iterated in declaration order.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HelperSet(ScalarBitSet<u8>);

impl HelperSet {
    pub fn new() -> HelperSet {
        HelperSet(ScalarBitSet::new())
    }

    pub fn insert(&mut self, helper: Helper) {
        self.0.insert(helper as u8);
    }

    pub fn contains(&self, helper: Helper) -> bool {
        self.0.contains(helper as u8)
    }

    pub fn iter(&self) -> impl Iterator<Item = Helper> + '_ {
        Helper::ALL.into_iter().filter(|&h| self.contains(h))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.iter().map(Helper::name)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl Default for HelperSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for HelperSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl FromIterator<Helper> for HelperSet {
    fn from_iter<T: IntoIterator<Item = Helper>>(iter: T) -> Self {
        let mut set = HelperSet::new();
        for helper in iter {
            set.insert(helper);
        }
        set
    }
}

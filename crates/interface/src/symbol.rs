use smv_data_structures::map::FxHashMap;
use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

/// An interned string.
///
/// Two symbols interned from equal strings are equal, so comparison and
/// hashing are O(1). The interner is process-global and leaks its strings;
/// symbols are valid for the lifetime of the process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    /// Interns `string`, returning its canonical symbol.
    pub fn intern(string: &str) -> Self {
        with_interner(|interner| interner.intern(string))
    }

    /// Returns the string this symbol was interned from.
    pub fn as_str(self) -> &'static str {
        with_interner(|interner| interner.get(self))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
struct Interner {
    names: FxHashMap<&'static str, Symbol>,
    strings: Vec<&'static str>,
}

impl Interner {
    fn intern(&mut self, string: &str) -> Symbol {
        if let Some(&sym) = self.names.get(string) {
            return sym;
        }
        let sym = Symbol(u32::try_from(self.strings.len()).expect("interner overflowed"));
        let string: &'static str = Box::leak(string.to_owned().into_boxed_str());
        self.strings.push(string);
        self.names.insert(string, sym);
        sym
    }

    fn get(&self, sym: Symbol) -> &'static str {
        self.strings[sym.0 as usize]
    }
}

fn with_interner<R>(f: impl FnOnce(&mut Interner) -> R) -> R {
    static INTERNER: OnceLock<Mutex<Interner>> = OnceLock::new();
    let mut guard = INTERNER.get_or_init(Default::default).lock().unwrap_or_else(|e| {
        // The interner holds no invariants across panics.
        e.into_inner()
    });
    f(&mut guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_canonical() {
        let a = Symbol::intern("state");
        let b = Symbol::intern("state");
        let c = Symbol::intern("state2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "state");
        assert_eq!(c.as_str(), "state2");
    }

    #[test]
    fn display() {
        let s = Symbol::intern("running");
        assert_eq!(s.to_string(), "running");
        assert_eq!(format!("{s:?}"), "\"running\"");
    }
}

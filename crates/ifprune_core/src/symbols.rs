use anyhow::{bail, Result};

/// True for characters that may occur in a preprocessor identifier.
pub fn symchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// True for characters that may start a preprocessor identifier.
pub fn sym_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Cached evaluation state of a symbol within the current file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Unevaluated,
    Value(i32),
    Insoluble,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    /// `Some` when the symbol is assumed defined, with its replacement
    /// text. `None` when assumed undefined, or for a symbol the
    /// evaluator merely encountered.
    pub def: Option<String>,
    pub resolution: Resolution,
    /// Set once the evaluator has started resolving the symbol. A
    /// revisit while still unresolved means a circular definition.
    pub visited: bool,
    /// Inserted while listing symbols rather than given on the command
    /// line. Forgotten at the end of each file.
    unknown: bool,
}

/// The assumption set, ordered by name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    syms: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.syms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }

    pub fn get(&self, index: usize) -> &Symbol {
        &self.syms[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Symbol {
        &mut self.syms[index]
    }

    /// Look up an identifier, returning its index or the index at which
    /// it would be inserted.
    pub fn find(&self, ident: &[u8]) -> Result<usize, usize> {
        self.syms
            .binary_search_by(|sym| sym.name.as_bytes().cmp(ident))
    }

    /// Record a `-D NAME[=VALUE]` assumption.
    pub fn assume_defined(&mut self, arg: &str) -> Result<()> {
        let (name, def) = match arg.split_once('=') {
            Some((name, value)) => (name, value.to_string()),
            None => (arg, String::new()),
        };
        self.insert_assumption(name, Some(def), arg)
    }

    /// Record a `-U NAME` assumption.
    pub fn assume_undefined(&mut self, arg: &str) -> Result<()> {
        if arg.contains('=') {
            bail!("Garbage in argument \"{arg}\"");
        }
        self.insert_assumption(arg, None, arg)
    }

    fn insert_assumption(&mut self, name: &str, def: Option<String>, arg: &str) -> Result<()> {
        if !is_identifier(name) {
            bail!("Identifier needed instead of \"{arg}\"");
        }
        match self.find(name.as_bytes()) {
            Ok(_) => bail!("Duplicate and possibly conflicting assumptions for symbol \"{name}\""),
            Err(at) => {
                self.syms.insert(
                    at,
                    Symbol {
                        name: name.to_string(),
                        def,
                        resolution: Resolution::Unevaluated,
                        visited: false,
                        unknown: false,
                    },
                );
                Ok(())
            }
        }
    }

    /// Record a symbol encountered while listing, at the insertion
    /// point previously returned by [`find`](Self::find).
    pub fn insert_unknown(&mut self, at: usize, name: &[u8]) {
        self.syms.insert(
            at,
            Symbol {
                name: String::from_utf8_lossy(name).into_owned(),
                def: None,
                resolution: Resolution::Unevaluated,
                visited: false,
                unknown: true,
            },
        );
    }

    /// Discard per-file state: encountered symbols, visit marks, and
    /// cached resolutions.
    pub fn reset_file_state(&mut self) {
        self.syms.retain(|sym| !sym.unknown);
        for sym in &mut self.syms {
            sym.visited = false;
            sym.resolution = Resolution::Unevaluated;
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes.first() {
        Some(&b) if sym_start(b) => bytes[1..].iter().all(|&b| symchar(b)),
        _ => false,
    }
}

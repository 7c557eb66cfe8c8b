use std::collections::BTreeMap;

use crate::program::{Program, ProgramId};

/// Host-side source of library programs for `calll`.
///
/// Resolution must be deterministic: the same id must always yield the same
/// program (or none) for the lifetime of a run.
pub trait LibraryResolver {
    /// Returns the program stored under `id`, if the host has one.
    fn resolve_library(&self, id: &ProgramId) -> Option<Program>;
}

/// Resolver that knows no libraries; every `calll` fails with `LibraryNotFound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLibraries;

impl LibraryResolver for NoLibraries {
    fn resolve_library(&self, _id: &ProgramId) -> Option<Program> {
        None
    }
}

/// In-memory library store keyed by program id.
#[derive(Debug, Clone, Default)]
pub struct StaticLibraryStore {
    programs: BTreeMap<ProgramId, Program>,
}

impl StaticLibraryStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            programs: BTreeMap::new(),
        }
    }

    /// Adds a program under its own id and returns that id.
    pub fn insert(&mut self, program: Program) -> ProgramId {
        let id = program.id();
        self.programs.insert(id, program);
        id
    }

    /// Stores a program under an arbitrary id.
    ///
    /// Lets hosts model a misbehaving store; the context rejects the
    /// resulting id mismatch.
    pub fn insert_as(&mut self, id: ProgramId, program: Program) {
        self.programs.insert(id, program);
    }

    /// Number of stored programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns true when the store holds no program.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl LibraryResolver for StaticLibraryStore {
    fn resolve_library(&self, id: &ProgramId) -> Option<Program> {
        self.programs.get(id).cloned()
    }
}

impl<T: LibraryResolver + ?Sized> LibraryResolver for &T {
    fn resolve_library(&self, id: &ProgramId) -> Option<Program> {
        (**self).resolve_library(id)
    }
}

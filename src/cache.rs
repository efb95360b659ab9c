use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::template::FormatProgram;
use crate::Result;

/// Shared template-to-program cache.
///
/// Lookups only take the read lock. A miss parses outside any lock and
/// inserts under the write lock; if another thread won the race the
/// freshly parsed program is discarded and the published one is
/// returned, so readers never observe a partial entry. Parse failures
/// are returned to the caller and never cached.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: RwLock<FxHashMap<String, Arc<FormatProgram>>>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_parse(&self, template: &str) -> Result<Arc<FormatProgram>> {
        if let Some(program) = self.programs.read().get(template) {
            return Ok(program.clone());
        }
        let parsed = Arc::new(FormatProgram::parse(template)?);
        let mut programs = self.programs.write();
        Ok(programs
            .entry(template.to_string())
            .or_insert(parsed)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.programs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.read().is_empty()
    }
}

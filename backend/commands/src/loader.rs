//! Enumerates handler declarations from the configured command modules.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::declaration::{CommandModule, HandlerDeclaration};

#[derive(Debug, Clone, Default)]
pub struct DeclarationLoader {
    modules: Vec<CommandModule>,
}

impl DeclarationLoader {
    pub fn new(modules: Vec<CommandModule>) -> Self {
        Self { modules }
    }

    pub fn with_module(mut self, module: CommandModule) -> Self {
        self.modules.push(module);
        self
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name())
    }

    /// Load declarations from the named roots. An empty root list loads every module.
    pub fn load(&self, roots: &[String]) -> Vec<Arc<HandlerDeclaration>> {
        if roots.is_empty() {
            return self.modules.iter().flat_map(|m| self.load_module(m)).collect();
        }

        let mut declarations = Vec::new();
        for root in roots {
            match self.modules.iter().find(|m| m.name().eq_ignore_ascii_case(root)) {
                Some(module) => declarations.extend(self.load_module(module)),
                None => warn!(
                    module = %root,
                    available = ?self.module_names().collect::<Vec<_>>(),
                    "Command module not found; skipping"
                ),
            }
        }
        declarations
    }

    fn load_module(&self, module: &CommandModule) -> Vec<Arc<HandlerDeclaration>> {
        trace!(module = %module.name(), "Loading command module");
        if module.declarations().is_empty() {
            warn!(module = %module.name(), "Cannot load commands from module - it declares no command handlers");
        }
        module.declarations().to_vec()
    }
}

//! Registry of tools available to the model.
//!
//! An entry either carries an initializer or it does not — optional
//! capabilities are explicit fields, never runtime introspection. The
//! registry is an explicit value constructed at startup and handed to
//! the turn controller; there is no ambient global state.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Executes a tool with its (already normalized) arguments mapping.
///
/// The contract is a mapping containing at least an `ok` boolean; any
/// other return shape is reported back to the model as a violation.
pub type ToolRunner = Box<dyn Fn(&Map<String, Value>) -> anyhow::Result<Value> + Send + Sync>;

/// One-shot setup hook run before a tool's first execution.
pub type ToolInitializer = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// A registered tool.
pub struct ToolEntry {
    name: String,
    /// JSON-schema-shaped function definition, rendered into the
    /// tool-enabled system preamble.
    definition: Value,
    runner: Option<ToolRunner>,
    initializer: Option<ToolInitializer>,
    initialized: AtomicBool,
}

impl ToolEntry {
    pub fn new(name: impl Into<String>, definition: Value, runner: ToolRunner) -> Self {
        Self {
            name: name.into(),
            definition,
            runner: Some(runner),
            initializer: None,
            initialized: AtomicBool::new(false),
        }
    }

    /// An entry that advertises a definition but cannot execute.
    /// Execution attempts produce a structured error result.
    pub fn without_runner(name: impl Into<String>, definition: Value) -> Self {
        Self {
            name: name.into(),
            definition,
            runner: None,
            initializer: None,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with_initializer(mut self, initializer: ToolInitializer) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &Value {
        &self.definition
    }

    pub(crate) fn runner(&self) -> Option<&ToolRunner> {
        self.runner.as_ref()
    }

    /// The initializer, if present and not yet claimed. Claims it:
    /// subsequent calls return `None` regardless of the init outcome.
    pub(crate) fn take_initialization(&self) -> Option<&ToolInitializer> {
        let initializer = self.initializer.as_ref()?;
        if self.initialized.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(initializer)
    }
}

/// Name-keyed tool registry. Names are unique; registration replaces.
#[derive(Default)]
pub struct ToolRegistry {
    entries: BTreeMap<String, ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing entry with the same name.
    pub fn register(&mut self, entry: ToolEntry) {
        self.entries.insert(entry.name().to_owned(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tool names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Function definitions in name order, for preamble assembly.
    pub fn definitions(&self) -> Vec<&Value> {
        self.entries.values().map(ToolEntry::definition).collect()
    }
}

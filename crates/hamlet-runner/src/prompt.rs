//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/`
//! directory) so operators can tune the town's voice without
//! recompiling. A copy of every template is compiled into the binary as
//! a fallback for tests and containerized deployments that do not mount
//! the directory.

use minijinja::Environment;

use crate::error::DispatchError;

/// The template set the dispatcher renders.
///
/// One entry per conversation phase plus the memory summary.
const TEMPLATE_NAMES: [&str; 4] = [
    "conversation_start",
    "conversation_continue",
    "conversation_leave",
    "memory_summary",
];

/// Built-in copies of the shipped templates, compiled into the binary.
const BUILTIN_TEMPLATES: [(&str, &str); 4] = [
    (
        "conversation_start",
        include_str!("../../../templates/conversation_start.j2"),
    ),
    (
        "conversation_continue",
        include_str!("../../../templates/conversation_continue.j2"),
    ),
    (
        "conversation_leave",
        include_str!("../../../templates/conversation_leave.j2"),
    ),
    (
        "memory_summary",
        include_str!("../../../templates/memory_summary.j2"),
    ),
];

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with all dispatcher templates
/// pre-loaded. Templates can be edited on disk and are picked up on the
/// next call to [`PromptEngine::new`].
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create a prompt engine loading templates from the given directory.
    ///
    /// The directory must contain `conversation_start.j2`,
    /// `conversation_continue.j2`, `conversation_leave.j2`, and
    /// `memory_summary.j2`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Template`] if a file is missing or does
    /// not parse.
    pub fn new(templates_dir: &str) -> Result<Self, DispatchError> {
        let mut env = Environment::new();
        for name in TEMPLATE_NAMES {
            let source = load_template(templates_dir, name)?;
            env.add_template_owned(name.to_owned(), source).map_err(|e| {
                DispatchError::Template(format!("failed to add template {name}: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Create a prompt engine from the compiled-in template copies.
    pub fn builtin() -> Result<Self, DispatchError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN_TEMPLATES {
            env.add_template(name, source).map_err(|e| {
                DispatchError::Template(format!("failed to add builtin template {name}: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Render a template with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Template`] for unknown template names or
    /// render failures.
    pub fn render(
        &self,
        name: &str,
        context: &serde_json::Value,
    ) -> Result<String, DispatchError> {
        self.env
            .get_template(name)
            .map_err(|e| DispatchError::Template(format!("missing template {name}: {e}")))?
            .render(context)
            .map_err(|e| DispatchError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, name: &str) -> Result<String, DispatchError> {
    let path = format!("{dir}/{name}.j2");
    std::fs::read_to_string(&path)
        .map_err(|e| DispatchError::Template(format!("failed to read {path}: {e}")))
}

//! Builder boilerplate for scanners backed by an external tool.

/// Implements the common builder methods for structs with a `tool: ToolConfig` field.
///
/// Generates:
/// - `with_runner(self, runner)` - swap the process runner (fakes in tests)
/// - `with_program(self, program)` - override the executable name or path
/// - `Default`, calling `new()`
///
/// # Example
///
/// ```ignore
/// pub struct MyScanner {
///     tool: ToolConfig,
/// }
///
/// impl MyScanner {
///     pub fn new() -> Self {
///         Self { tool: ToolConfig::new("mytool") }
///     }
/// }
///
/// impl_tool_scanner!(MyScanner);
/// ```
#[macro_export]
macro_rules! impl_tool_scanner {
    ($scanner:ty) => {
        impl $scanner {
            /// Runs the tool through `runner` instead of spawning processes directly.
            pub fn with_runner(
                mut self,
                runner: std::sync::Arc<dyn $crate::external::ToolRunner>,
            ) -> Self {
                self.tool = self.tool.with_runner(runner);
                self
            }

            /// Overrides the executable name or path.
            pub fn with_program(mut self, program: impl Into<String>) -> Self {
                self.tool = self.tool.with_program(program);
                self
            }
        }

        impl Default for $scanner {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

//! Tool interfaces and the built-in tool set exposed to the assistant model.

pub mod builtins;
pub mod context;
pub mod registry;
pub mod tool;
pub mod weather;

/// Built-in tool registry and registration helper.
pub use builtins::{builtin_tool_registry, register_builtin_tools};
/// Tool context and shared turn services.
pub use context::{ToolContext, TurnServices, render_output};
/// Tool registry type.
pub use registry::ToolRegistry;
/// Event sink for tool events (re-exported from protocol).
pub use steward_rs_protocol::EventSink;
/// Tool trait and spec type.
pub use tool::{Tool, ToolSpec, empty_parameters};
/// Weather lookup interface and the Open-Meteo client.
pub use weather::{OpenMeteoWeather, WeatherError, WeatherProvider, WeatherReport};

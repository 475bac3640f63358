//! Builtin commands registered by the server binary.
//!
//! `ping` and `list_commands` are answered by the server itself. The engine
//! catalogue is registered so that clients can discover it, but every entry
//! fails until an engine bridge replaces the placeholder handler.

use std::sync::{Arc, Weak};

use serde_json::{Value, json};
use unreal_mcp_types::Params;

use crate::registry::{CommandHandler, CommandRegistry, HandlerError};

/// Engine-side commands exposed by the editor plugin.
pub const ENGINE_COMMANDS: &[&str] = &[
    // actors
    "get_actors_in_level",
    "find_actors_by_name",
    "create_actor",
    "delete_actor",
    "set_actor_transform",
    "get_actor_properties",
    // editor
    "focus_viewport",
    "take_screenshot",
    "create_level",
    "save_level",
    "refresh_content_browser",
    // blueprints
    "create_blueprint",
    "add_component_to_blueprint",
    "set_component_property",
    "set_physics_properties",
    "compile_blueprint",
    "spawn_blueprint_actor",
    "set_blueprint_property",
    "set_static_mesh_properties",
    // blueprint graphs
    "connect_blueprint_nodes",
    "create_input_mapping",
    "add_blueprint_node",
    // project
    "set_level_game_mode",
];

/// Registers `ping`, `list_commands`, and the engine catalogue.
///
/// Existing handlers with the same names are replaced.
pub fn register_builtin_commands(registry: &Arc<CommandRegistry>) {
    registry.register("ping", ping);
    registry.register(
        "list_commands",
        ListCommands {
            registry: Arc::downgrade(registry),
        },
    );
    for &command in ENGINE_COMMANDS {
        registry.register(command, EngineBridgeMissing { command });
    }
}

fn ping(_params: Params) -> Result<Params, HandlerError> {
    Ok(object(json!({
        "pong": true,
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Reports the registered command types.
///
/// Holds a weak reference so the registry does not keep itself alive.
struct ListCommands {
    registry: Weak<CommandRegistry>,
}

impl CommandHandler for ListCommands {
    fn handle(&self, _params: Params) -> Result<Params, HandlerError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| HandlerError::new("command registry is no longer available"))?;
        Ok(object(json!({ "commands": registry.list_commands() })))
    }
}

/// Placeholder for commands that need the editor to execute.
struct EngineBridgeMissing {
    command: &'static str,
}

impl CommandHandler for EngineBridgeMissing {
    fn handle(&self, _params: Params) -> Result<Params, HandlerError> {
        Err(HandlerError::new(format!(
            "'{}' requires the editor, but no engine bridge is attached",
            self.command
        )))
    }
}

fn object(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

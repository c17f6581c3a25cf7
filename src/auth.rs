// Auth Commands - The `auth` namespace of the core command
//
// Backends are plugin units managed by a second PluginManager; which
// permissions a backend grants is up to the backend.

use crate::commands::CommandRegistry;
use crate::core_command::{register_lifecycle, CoreState};
use crate::plugins::PluginManager;

pub const AUTH_COMMAND: &str = "auth";

pub fn auth_registry(separator_width: usize) -> CommandRegistry<CoreState> {
    let mut registry = CommandRegistry::new(AUTH_COMMAND, "Authorization specific commands.")
        .with_separator_width(separator_width);

    register_lifecycle(&mut registry, auth_of, "<backend>", "an auth backend");
    registry.add_command("list", "List all currently loaded auth backends.", &[], |inv| {
        let separator = inv.state.config.separator();
        inv.state.auth.print_list(&separator);
        Ok(())
    });

    registry
}

fn auth_of(state: &mut CoreState) -> &mut PluginManager {
    &mut state.auth
}

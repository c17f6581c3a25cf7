// Built-in sub-commands of the core command

use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::auth_registry;
use crate::commands::{CommandArgs, CommandError, CommandRegistry, Invocation};
use crate::config::CoreConfig;
use crate::credits::format_credits;
use crate::docs::DocMetadata;
use crate::plugins::PluginManager;

use super::CoreState;

/// Selects one plugin manager of the state.
pub(crate) type ManagerOf = fn(&mut CoreState) -> &mut PluginManager;

pub(super) fn core_registry(config: &CoreConfig) -> CommandRegistry<CoreState> {
    let mut registry = CommandRegistry::new(config.command.clone(), config.description.clone())
        .with_separator_width(config.separator_width);

    register_lifecycle(&mut registry, plugins_of, "<plugin>", "a plugin");

    registry
        .add_registry(auth_registry(config.separator_width))
        .add_command(
            "delay",
            "Execute a command after the given delay.",
            &["<delay>", "<command>", "[arguments]"],
            delay_execution,
        )
        .add_command(
            "dump",
            "Dump data to logs.",
            &["<dump_type>", "<filename>"],
            dump_data,
        )
        .add_command("list", "List all currently loaded plugins.", &[], |inv| {
            let separator = inv.state.config.separator();
            inv.state.plugins.print_list(&separator);
            Ok(())
        })
        .add_command(
            "version",
            "Display version information.",
            &[],
            |inv| {
                let config = &inv.state.config;
                inv.logger.log_message(&format!(
                    "Current {} version: {}",
                    config.project_name, config.version
                ));
                Ok(())
            },
        )
        .add_command("credits", "List all credits.", &[], |inv| {
            let groups = inv.state.credits.groups()?;
            let report = format_credits(inv.logger.prefix(), &inv.state.config.separator(), &groups);
            inv.logger.log_message(&report);
            Ok(())
        })
        .add_command("help", "Print all sub-commands.", &[], |inv| {
            let parent = &inv.path[..inv.path.len().saturating_sub(1)];
            inv.registry.print_help(inv.logger, parent);
            Ok(())
        })
        .add_command("build_doc", "Build the documentation.", &[], build_doc);

    registry
}

/// Register `load`, `unload` and `reload` driving the manager selected by
/// `manager`. `what` completes the descriptions, e.g. "a plugin".
pub(crate) fn register_lifecycle(
    registry: &mut CommandRegistry<CoreState>,
    manager: ManagerOf,
    hint: &'static str,
    what: &str,
) {
    registry
        .add_command(
            "load",
            &format!("Load {}.", what),
            &[hint],
            move |inv| {
                let name = inv.args.require(0, hint)?;
                let _ = manager(inv.state).load(name);
                Ok(())
            },
        )
        .add_command(
            "unload",
            &format!("Unload {}.", what),
            &[hint],
            move |inv| {
                let name = inv.args.require(0, hint)?;
                let _ = manager(inv.state).unload(name);
                Ok(())
            },
        )
        .add_command(
            "reload",
            &format!("Reload {}.", what),
            &[hint],
            move |inv| {
                let name = inv.args.require(0, hint)?;
                let _ = manager(inv.state).reload(name);
                Ok(())
            },
        );
}

fn plugins_of(state: &mut CoreState) -> &mut PluginManager {
    &mut state.plugins
}

fn delay_execution(inv: &mut Invocation<'_, CoreState>) -> anyhow::Result<()> {
    let delay = parse_delay(&inv.args)?;
    inv.args.require(1, "<command>")?;
    let command = inv.args.rest(1);

    let handle = inv.state.delays.schedule(
        delay,
        |state: &mut CoreState, args: Vec<String>| {
            state.console.server_command(&args.join(" "));
            Ok(())
        },
        vec![command],
    )?;

    debug!(?handle, delay, "delayed server command");
    Ok(())
}

fn parse_delay(args: &CommandArgs) -> Result<f64, CommandError> {
    let raw = args.require(0, "<delay>")?;
    raw.parse::<f64>().map_err(|_| CommandError::InvalidArgument {
        value: raw.to_string(),
        reason: "delay must be a number of seconds".to_string(),
    })
}

fn dump_data(inv: &mut Invocation<'_, CoreState>) -> anyhow::Result<()> {
    let kind = inv.args.require(0, "<dump_type>")?;
    let filename = inv.args.require(1, "<filename>")?;

    let dumps = Arc::clone(&inv.state.dumps);
    dumps.dump_logged(&*inv.state, inv.logger, kind, filename);
    Ok(())
}

fn build_doc(inv: &mut Invocation<'_, CoreState>) -> anyhow::Result<()> {
    let config = &inv.state.config;
    let metadata = DocMetadata::from_config(config);
    let project = &config.paths.docs_project_dir;
    let output = &config.paths.docs_output_dir;

    inv.logger.diagnostic(&format!(
        "Building documentation for {} {}...",
        metadata.project_name, metadata.version
    ));
    inv.state.docs.generate(project, output, &metadata)?;

    info!(output = ?output, "build_doc finished");
    inv.logger
        .diagnostic(&format!("Documentation written to {}.", output.display()));
    Ok(())
}

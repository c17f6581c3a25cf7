// Core Command tests - Console lines end to end against in-memory collaborators

use super::*;
use crate::commands::Dispatch;
use crate::credits::{CreditGroup, StaticCredits};
use crate::docs::{DocError, DocMetadata};
use crate::host::{ManualClock, QueuedConsole};
use crate::logging::MemorySink;
use crate::plugins::{FactoryLoader, InertPlugin, PluginInfo, PluginUnit};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

type DocCalls = Arc<Mutex<Vec<(PathBuf, PathBuf, DocMetadata)>>>;

struct RecordingDocs {
    calls: DocCalls,
    fail: bool,
}

impl DocGenerator for RecordingDocs {
    fn generate(&self, project: &Path, output: &Path, metadata: &DocMetadata) -> Result<(), DocError> {
        self.calls
            .lock()
            .push((project.to_path_buf(), output.to_path_buf(), metadata.clone()));
        if self.fail {
            return Err(DocError::MissingProject(project.to_path_buf()));
        }
        Ok(())
    }
}

struct Fixture {
    core: CoreCommand,
    sink: MemorySink,
    clock: ManualClock,
    console: QueuedConsole,
    docs: DocCalls,
    _dir: TempDir,
}

fn inert(info: Option<PluginInfo>) -> impl Fn(&str) -> anyhow::Result<Box<dyn PluginUnit>> + Send + Sync {
    move |_name: &str| -> anyhow::Result<Box<dyn PluginUnit>> { Ok(Box::new(InertPlugin::new(info.clone()))) }
}

fn fixture_with(fail_docs: bool) -> Fixture {
    let dir = TempDir::new().unwrap();
    let mut config = CoreConfig::default();
    config.version = "1.2.3".to_string();
    config.paths.dump_dir = dir.path().join("logs");
    config.paths.docs_project_dir = dir.path().join("packages");
    config.paths.docs_output_dir = dir.path().join("docs");

    let sink = MemorySink::new();
    let clock = ManualClock::new();
    let console = QueuedConsole::new();
    let docs: DocCalls = Arc::default();

    let plugins = FactoryLoader::new()
        .with("alpha", inert(None))
        .with("zeta", inert(None))
        .with("meta", inert(Some(PluginInfo::new().with("version", "0.9"))));
    let auth = FactoryLoader::new().with("simple", inert(None));
    let credits = StaticCredits(vec![CreditGroup::new("Developers").entry("Alice", "Core")]);

    let core = CoreCommand::new(
        config,
        CoreCollaborators {
            sink: Arc::new(sink.clone()),
            clock: Arc::new(clock.clone()),
            console: Box::new(console.clone()),
            plugin_loader: Box::new(plugins),
            auth_loader: Box::new(auth),
            credits: Box::new(credits),
            docs: Box::new(RecordingDocs {
                calls: Arc::clone(&docs),
                fail: fail_docs,
            }),
        },
    );

    Fixture {
        core,
        sink,
        clock,
        console,
        docs,
        _dir: dir,
    }
}

fn fixture() -> Fixture {
    fixture_with(false)
}

#[test]
fn test_lines_for_other_commands_are_ignored() {
    let mut f = fixture();

    assert_eq!(f.core.execute_line("status"), None);
    assert_eq!(f.core.execute_line("   "), None);
    assert!(f.sink.messages().is_empty());
}

#[test]
fn test_bare_command_prints_help() {
    let mut f = fixture();

    assert_eq!(f.core.execute_line("sp"), Some(Dispatch::Help));

    let help = f.sink.contents();
    assert!(help.starts_with("[SP] sp Help:\nSource.Python base command.\n\n"));
    assert!(help.contains(&format!("{:<39} {}\n", "sp auth list", "List all currently loaded auth backends.")));
    assert!(help.contains(&format!(
        "{:<39} {}\n",
        "sp delay <delay> <command> [arguments]",
        "Execute a command after the given delay."
    )));
    assert!(help.contains(&format!("{:<39} {}\n", "sp load <plugin>", "Load a plugin.")));
    assert!(help.ends_with(&"=".repeat(61)));

    let auth = help.find("sp auth list").unwrap();
    let version = help.find("sp version").unwrap();
    assert!(auth < version);
}

#[test]
fn test_help_command_matches_bare_command() {
    let mut f = fixture();
    f.core.execute_line("sp");
    let bare = f.sink.contents();
    f.sink.clear();

    assert_eq!(f.core.execute_line("sp help"), Some(Dispatch::Invoked));
    assert_eq!(f.sink.contents(), bare);
}

#[test]
fn test_unknown_subcommand_reports_once() {
    let mut f = fixture();

    let outcome = f.core.execute_line("sp bogus 1 2");

    assert_eq!(outcome, Some(Dispatch::Unknown("bogus".to_string())));
    assert_eq!(
        f.sink.messages(),
        vec!["[SP] Unknown command \"sp bogus\". Type \"sp\" for a list of commands."]
    );
    assert!(f.core.state().plugins.is_empty());
}

#[test]
fn test_load_list_unload_flow() {
    let mut f = fixture();

    f.core.execute_line("sp load zeta");
    f.core.execute_line("sp load alpha");
    f.core.execute_line("sp load alpha");
    assert_eq!(f.sink.count_containing("Plugin 'alpha' is already loaded."), 1);
    assert_eq!(f.core.state().plugins.names(), vec!["alpha", "zeta"]);

    f.sink.clear();
    f.core.execute_line("sp list");
    let separator = "=".repeat(61);
    assert_eq!(
        f.sink.messages(),
        vec![format!("[SP] Loaded plugins:\n{0}\n\nalpha\n\nzeta\n\n{0}", separator)]
    );

    f.core.execute_line("sp unload alpha");
    f.sink.clear();
    f.core.execute_line("sp list");
    assert!(!f.sink.contents().contains("alpha"));
    assert_eq!(f.core.state().plugins.get("zeta").unwrap().logger.target(), "sp.plugins.zeta");
}

#[test]
fn test_reload_of_unloaded_plugin_loads_it() {
    let mut f = fixture();

    f.core.execute_line("sp reload alpha");

    assert!(f.core.state().plugins.is_loaded("alpha"));
    assert_eq!(f.sink.count_containing("is not loaded"), 0);
}

#[test]
fn test_load_without_name_reports_usage() {
    let mut f = fixture();

    let outcome = f.core.execute_line("sp load");

    assert_eq!(outcome, Some(Dispatch::Failed("Missing argument <plugin>".to_string())));
    assert_eq!(
        f.sink.messages(),
        vec![
            "[SP] Error while executing \"sp load\": Missing argument <plugin>",
            "[SP] Usage: sp load <plugin>"
        ]
    );
}

#[test]
fn test_list_renders_metadata() {
    let mut f = fixture();
    f.core.execute_line("sp load meta");
    f.sink.clear();

    f.core.execute_line("sp list");

    assert!(f.sink.contents().contains("meta:\n\tversion:\n\t\t0.9\n\n"));
}

#[test]
fn test_version() {
    let mut f = fixture();

    f.core.execute_line("sp version");

    assert_eq!(f.sink.messages(), vec!["Current Source.Python version: 1.2.3"]);
}

#[test]
fn test_credits_report() {
    let mut f = fixture();

    f.core.execute_line("sp credits");

    let separator = "=".repeat(61);
    assert_eq!(
        f.sink.messages(),
        vec![format!(
            "[SP] Credits\n{0}\n\n\tDevelopers:\n\t\tAlice               Core\n\n{0}\n\n",
            separator
        )]
    );
}

#[test]
fn test_delay_runs_server_command_once_due() {
    let mut f = fixture();

    assert_eq!(f.core.execute_line("sp delay 2.5 sp load alpha"), Some(Dispatch::Invoked));
    assert_eq!(f.core.state().delays.len(), 1);

    f.clock.advance(1.0);
    assert_eq!(f.core.tick(), 0);
    assert!(f.console.is_empty());

    f.clock.advance(1.5);
    assert_eq!(f.core.tick(), 1);
    assert_eq!(f.console.drain(), vec!["sp load alpha"]);

    f.clock.advance(10.0);
    assert_eq!(f.core.tick(), 0);
    assert!(f.console.is_empty());
}

#[test]
fn test_zero_delay_fires_on_next_tick_in_order() {
    let mut f = fixture();
    f.core.execute_line("sp delay 0 echo first");
    f.core.execute_line("sp delay 0 echo second");

    assert_eq!(f.core.tick(), 2);
    assert_eq!(f.console.drain(), vec!["echo first", "echo second"]);
}

#[test]
fn test_failing_delayed_callbacks_reach_the_sink() {
    let mut f = fixture();
    let delays = &mut f.core.state_mut().delays;
    delays
        .schedule(0.0, |_: &mut CoreState, _| anyhow::bail!("boom-delay"), Vec::new())
        .unwrap();
    delays
        .schedule(0.0, |_: &mut CoreState, _| panic!("panic-delay"), Vec::new())
        .unwrap();
    f.core.execute_line("sp delay 0 echo after");

    f.clock.advance(0.015);
    assert_eq!(f.core.tick(), 3);

    assert_eq!(f.sink.count_containing("boom-delay"), 1);
    assert_eq!(f.sink.count_containing("panicked: panic-delay"), 1);
    assert_eq!(f.console.drain(), vec!["echo after"]);
}

#[test]
fn test_delay_rejects_bad_delays() {
    let mut f = fixture();

    let outcome = f.core.execute_line("sp delay soon sp list");
    assert!(matches!(outcome, Some(Dispatch::Failed(_))));
    assert_eq!(f.sink.count_containing("Invalid argument \"soon\""), 1);
    assert_eq!(
        f.sink.messages().last().unwrap(),
        "[SP] Usage: sp delay <delay> <command> [arguments]"
    );

    f.core.execute_line("sp delay inf sp list");
    f.core.execute_line("sp delay 5");
    assert!(f.core.state().delays.is_empty());
    assert_eq!(f.sink.count_containing("Missing argument <command>"), 1);
}

#[test]
fn test_dump_plugins_writes_file() {
    let mut f = fixture();
    f.core.execute_line("sp load alpha");

    f.core.execute_line("sp dump plugins loaded");

    let path = f.core.state().config.paths.dump_dir.join("loaded.txt");
    let dumped: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(dumped["plugins"][0]["name"], "alpha");
    assert_eq!(dumped["auth_backends"].as_array().unwrap().len(), 0);
}

#[test]
fn test_dump_config_and_delays() {
    let mut f = fixture();
    f.core.execute_line("sp delay 3 sp list");

    f.core.execute_line("sp dump config cfg");
    f.core.execute_line("sp dump delays pending");

    let dump_dir = f.core.state().config.paths.dump_dir.clone();
    let config = CoreConfig::from_toml_str(&std::fs::read_to_string(dump_dir.join("cfg.txt")).unwrap()).unwrap();
    assert_eq!(config, f.core.state().config);

    let delays: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dump_dir.join("pending.txt")).unwrap()).unwrap();
    assert_eq!(delays["pending"][0]["args"][0], "sp list");
}

#[test]
fn test_dump_unknown_kind_lists_valid_kinds() {
    let mut f = fixture();

    f.core.execute_line("sp dump nope out");

    assert_eq!(
        f.sink.messages(),
        vec![
            "Invalid dump_type \"nope\". The valid types are:",
            "\tconfig",
            "\tdelays",
            "\tplugins"
        ]
    );
    assert!(!f.core.state().config.paths.dump_dir.join("out.txt").exists());
}

#[test]
fn test_registered_dump_kind_is_listed() {
    let mut f = fixture();
    f.core
        .register_dump("greeting", |_state: &CoreState| Ok("hello".to_string()));

    f.core.execute_line("sp dump nope out");
    assert_eq!(f.sink.count_containing("\tgreeting"), 1);

    f.core.execute_line("sp dump greeting hi");
    let path = f.core.state().config.paths.dump_dir.join("hi.txt");
    assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
}

#[test]
fn test_auth_namespace() {
    let mut f = fixture();

    f.core.execute_line("sp auth load simple");
    assert!(f.core.state().auth.is_loaded("simple"));
    assert!(f.core.state().plugins.is_empty());
    assert_eq!(f.sink.count_containing("Successfully loaded auth backend 'simple'."), 1);

    f.sink.clear();
    f.core.execute_line("sp auth list");
    assert!(f.sink.contents().starts_with("[SP] Loaded auth backends:"));
    assert!(f.sink.contents().contains("simple\n"));

    f.sink.clear();
    f.core.execute_line("sp auth frobnicate");
    assert_eq!(
        f.sink.messages(),
        vec!["[SP] Unknown command \"sp auth frobnicate\". Type \"sp auth\" for a list of commands."]
    );
}

#[test]
fn test_build_doc_drives_generator() {
    let mut f = fixture();

    assert_eq!(f.core.execute_line("sp build_doc"), Some(Dispatch::Invoked));

    let calls = f.docs.lock();
    assert_eq!(calls.len(), 1);
    let (project, output, metadata) = &calls[0];
    assert_eq!(project, &f.core.state().config.paths.docs_project_dir);
    assert_eq!(output, &f.core.state().config.paths.docs_output_dir);
    assert_eq!(metadata.project_name, "Source.Python");
    assert_eq!(metadata.version, "1.2.3");
}

#[test]
fn test_build_doc_failure_is_reported() {
    let mut f = fixture_with(true);

    let outcome = f.core.execute_line("sp build_doc");

    assert!(matches!(outcome, Some(Dispatch::Failed(_))));
    assert_eq!(f.sink.count_containing("Error while executing \"sp build_doc\""), 1);
}

#[test]
fn test_custom_command_overrides_builtin() {
    let mut f = fixture();
    f.core.add_command("version", "Custom version.", &[], |inv| {
        inv.logger.log_message("custom");
        Ok(())
    });

    f.core.execute_line("sp version");

    assert_eq!(f.sink.messages(), vec!["custom"]);
}

#[test]
fn test_shutdown_unloads_everything() {
    let mut f = fixture();
    f.core.execute_line("sp load alpha");
    f.core.execute_line("sp auth load simple");

    f.core.shutdown();

    assert!(f.core.state().plugins.is_empty());
    assert!(f.core.state().auth.is_empty());
}

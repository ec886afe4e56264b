//! Command-line interface for webcfg-guard.

use clap::{ArgAction, Parser, Subcommand};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::analyzer::Analyzer;
use crate::contract::{self, Contract};
use crate::engine::RuleSet;
use crate::parser::XmlParserFactory;
use crate::project::{is_project_file, SourceFile, TARGET_CONFIG_NAME};
use crate::report;
use crate::rules;
use crate::runner::Runner;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default contract file names to search for.
const DEFAULT_CONTRACT_NAMES: &[&str] = &["webcfg-guard.yaml", ".webcfg-guard.yaml"];

/// Label used in reports when no contract file is in play.
const BUILTIN_LABEL: &str = "built-in rules";

/// Directories never containing a project's own web.config.
const SKIPPED_DIRS: &[&str] = &["bin", "obj", "node_modules", "packages"];

const CONTRACT_TEMPLATE: &str = include_str!("templates/webcfg-guard.yaml");

/// Security checks for ASP.NET web.config files.
///
/// webcfg-guard inspects the web.config at the root of each .NET project and
/// reports settings that weaken a production deployment: cookieless session
/// identifiers, long session lifetimes, and ELMAH remote access open to
/// everyone.
#[derive(Parser)]
#[command(name = "webcfg-guard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check web.config files against the rules
    #[command(visible_alias = "check")]
    Lint(LintArgs),
    /// List the rules that would be applied
    Rules(RulesArgs),
    /// Create a new webcfg-guard contract from the template
    Init(InitArgs),
}

/// Arguments for the lint command.
#[derive(Parser)]
pub struct LintArgs {
    /// Path to check (project directory, solution directory or web.config)
    pub path: PathBuf,

    /// Path to contract YAML file (default: auto-discover, else built-in rules)
    #[arg(short, long)]
    pub contract: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Show suppressed violations in output
    #[arg(long)]
    pub show_suppressed: bool,
}

/// Arguments for the rules command.
#[derive(Parser)]
pub struct RulesArgs {
    /// Path to contract YAML file (default: auto-discover, else built-in rules)
    #[arg(short, long)]
    pub contract: Option<PathBuf>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "webcfg-guard.yaml")]
    pub output: PathBuf,
}

/// Discover a contract file in the current directory.
fn discover_contract() -> Option<PathBuf> {
    DEFAULT_CONTRACT_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Rules in effect and where they came from.
pub struct LoadedRules {
    pub contract: Contract,
    pub rules: RuleSet,
    /// Contract path, or a label for the built-in rules.
    pub source: String,
}

/// Load the contract (explicit, discovered, or none) and build its rule set.
pub fn load_rules(explicit: Option<&Path>) -> anyhow::Result<LoadedRules> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => discover_contract(),
    };

    let Some(path) = path else {
        info!("no contract file found, using built-in rules");
        return Ok(LoadedRules {
            contract: Contract::default(),
            rules: rules::builtin().clone(),
            source: BUILTIN_LABEL.to_string(),
        });
    };

    let contract = Contract::parse_file(&path)
        .map_err(|e| anyhow::anyhow!("cannot parse contract {}: {}", path.display(), e))?;
    contract::validate(&contract)?;
    let rules = contract::build_rule_set(&contract)?;
    info!("loaded {} rules from {}", rules.len(), path.display());

    Ok(LoadedRules {
        contract,
        rules,
        source: path.to_string_lossy().to_string(),
    })
}

fn is_target_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.eq_ignore_ascii_case(TARGET_CONFIG_NAME))
        .unwrap_or(false)
}

/// The project file in `dir` or the nearest ancestor directory.
fn nearest_project(dir: &Path) -> Option<PathBuf> {
    for candidate in dir.ancestors() {
        let Ok(entries) = std::fs::read_dir(candidate) else {
            continue;
        };
        let mut projects: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_project_file(p))
            .collect();
        projects.sort();
        if let Some(project) = projects.into_iter().next() {
            return Some(project);
        }
    }
    None
}

/// Collect the web.config files under `root`, each paired with its project.
///
/// A config is paired with the nearest project at or above it; whether it is
/// that project's root config is decided later by the analyzer.
pub fn collect_targets(root: &Path, contract: &Contract) -> anyhow::Result<Vec<SourceFile>> {
    let mut configs = BTreeSet::new();

    if root.is_file() {
        if is_target_name(root) {
            configs.insert(root.to_path_buf());
        } else if is_project_file(root) {
            if let Some(dir) = root.parent() {
                configs.extend(
                    std::fs::read_dir(dir)?
                        .filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| p.is_file() && is_target_name(p)),
                );
            }
        }
    } else {
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.')
                    && !SKIPPED_DIRS.iter().any(|d| name.eq_ignore_ascii_case(d))
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && is_target_name(entry.path()) {
                configs.insert(entry.path().to_path_buf());
            }
        }
    }

    let mut targets = Vec::new();
    for config in configs {
        let relative = config.strip_prefix(root).unwrap_or(&config);
        if contract.is_path_excluded(relative) {
            debug!("excluded by contract: {}", config.display());
            continue;
        }
        let dir = config.parent().unwrap_or(root);
        match nearest_project(dir) {
            Some(project) => targets.push(SourceFile::new(config, project)),
            None => debug!("no project file owns {}", config.display()),
        }
    }

    Ok(targets)
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" && args.format != "sarif" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let loaded = match load_rules(args.contract.as_deref()) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if loaded.rules.is_empty() {
        warn!("{} enables no rules", loaded.source);
    }

    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let targets = collect_targets(&abs_path, &loaded.contract)?;
    info!("found {} candidate config files", targets.len());
    if targets.is_empty() {
        eprintln!("Warning: no web.config files belonging to a project were found");
        return Ok(EXIT_SUCCESS);
    }

    let analyzer = Analyzer::with_parser(Arc::new(loaded.rules), &XmlParserFactory);
    let result = Runner::new(&analyzer).run(&targets);

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, &loaded.source, &result)?,
        "sarif" => report::write_sarif(&abs_path, &result, analyzer.rules())?,
        _ => report::write_pretty(&path_str, &loaded.source, &result, args.show_suppressed),
    }

    if result.has_violations() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the rules command.
pub fn run_rules(args: &RulesArgs) -> anyhow::Result<i32> {
    let loaded = match load_rules(args.contract.as_deref()) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    println!("Rules from {}:", loaded.source);
    println!();
    for id in loaded.rules.rule_ids() {
        let description = loaded.rules.description_of(id).unwrap_or("");
        println!("  {:<48} {}", id, description);
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, CONTRACT_TEMPLATE) {
        eprintln!("Error: failed to write contract: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize for your project", args.output.display());
    println!("  2. Run: webcfg-guard lint . --contract {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collect_targets_pairs_configs_with_projects() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("Site/Site.csproj"), "<Project />");
        touch(&root.join("Site/Web.config"), "<configuration />");
        touch(&root.join("Site/Views/web.config"), "<configuration />");
        touch(&root.join("Site/bin/Web.config"), "<configuration />");
        touch(&root.join("Orphan/web.config"), "<configuration />");

        let targets = collect_targets(root, &Contract::default()).unwrap();

        assert_eq!(targets.len(), 2);
        assert!(targets
            .iter()
            .all(|t| t.project == root.join("Site/Site.csproj")));
        assert!(targets.iter().any(|t| t.path.ends_with("Views/web.config")));
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_targets_survives_symlink_loop() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("Site/Site.csproj"), "<Project />");
        touch(&root.join("Site/Web.config"), "<configuration />");
        fs::create_dir_all(root.join("Other")).unwrap();
        std::os::unix::fs::symlink(root, root.join("Other/loop")).unwrap();

        let targets = collect_targets(root, &Contract::default()).unwrap();

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].project, root.join("Site/Site.csproj"));
    }

    #[test]
    fn test_collect_targets_honors_excluded_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("Site/Site.csproj"), "<Project />");
        touch(&root.join("Site/Web.config"), "<configuration />");
        touch(&root.join("Legacy/Legacy.vbproj"), "<Project />");
        touch(&root.join("Legacy/Web.config"), "<configuration />");

        let contract = Contract {
            excluded_paths: vec!["Legacy/**".to_string()],
            ..Contract::default()
        };
        let targets = collect_targets(root, &contract).unwrap();

        assert_eq!(targets.len(), 1);
        assert!(targets[0].path.starts_with(root.join("Site")));
    }

    #[test]
    fn test_collect_targets_single_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("App.csproj"), "<Project />");
        let config = root.join("Web.config");
        touch(&config, "<configuration />");

        let targets = collect_targets(&config, &Contract::default()).unwrap();
        assert_eq!(targets, vec![SourceFile::new(&config, root.join("App.csproj"))]);
    }

    #[test]
    fn test_load_rules_from_contract() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("webcfg-guard.yaml");
        fs::write(
            &path,
            r#"
version: "1.0"
builtin_rules: false
rules:
  - id: AvoidDebugCompilation
    checks:
      - tag: compilation
        attribute: debug
        domain: string
        policy: forbidden_value
        value: "true"
"#,
        )
        .unwrap();

        let loaded = load_rules(Some(path.as_path())).unwrap();
        assert_eq!(loaded.rules.rule_ids(), vec!["AvoidDebugCompilation"]);
        assert_eq!(loaded.source, path.to_string_lossy());
    }

    #[test]
    fn test_load_rules_rejects_invalid_contract() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("webcfg-guard.yaml");
        fs::write(
            &path,
            r#"
rules:
  - id: Broken
    checks:
      - tag: forms
        attribute: cookieless
        domain: string
        policy: max_value
        value: 3
"#,
        )
        .unwrap();

        assert!(load_rules(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_template_is_a_valid_contract() {
        let contract: Contract = serde_yaml::from_str(CONTRACT_TEMPLATE).unwrap();
        contract::validate(&contract).unwrap();
        let rules = contract::build_rule_set(&contract).unwrap();
        assert!(rules.len() > rules::builtin().len());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("webcfg-guard.yaml");
        fs::write(&output, "existing").unwrap();

        let code = run_init(&InitArgs {
            output: output.clone(),
        })
        .unwrap();
        assert_eq!(code, EXIT_ERROR);
        assert_eq!(fs::read_to_string(&output).unwrap(), "existing");
    }
}

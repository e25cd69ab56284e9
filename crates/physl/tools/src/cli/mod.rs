// PhySL
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use physl_common::{init_logging, PhyslConfig};
use physl_compiler::{generate_ast, Compiler, Environment, Function, PatternRegistry};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(author, version, about = "Compile and evaluate PhySL programs", long_about = None)]
struct Cli {
    /// TOML configuration file; PHYSL_* variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and evaluate a program, printing its result
    Run {
        file: PathBuf,
        /// Abort evaluation after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Evaluate parallel constructs inline
        #[arg(long)]
        direct: bool,
        /// Print per-node evaluation counters as JSON afterwards
        #[arg(long)]
        counters: bool,
    },
    /// Print the parsed expressions of a program
    Ast {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show the help text of a primitive
    Help { name: String },
    /// List registered patterns in match order
    Patterns,
    /// Print the execution tree of a program in Graphviz format
    Dot { file: PathBuf },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.log_filter);

    match cli.command {
        Commands::Run { file, timeout_ms, direct, counters } => {
            let direct = direct || config.direct_execution;
            let mut config = config.with_direct_execution(direct);
            if let Some(ms) = timeout_ms {
                config = config.with_eval_timeout(Duration::from_millis(ms));
            }
            let function = compile_file(&file, config)?;
            let value = function.run().await.with_context(|| format!("evaluation of {} failed", file.display()))?;
            println!("{}", value);
            if counters {
                println!("{}", serde_json::to_string_pretty(&function.performance_counters())?);
            }
        }
        Commands::Ast { file, json } => {
            let source = read_source(&file)?;
            println!("{}", render_ast(&source, json)?);
        }
        Commands::Help { name } => {
            println!("{}", PatternRegistry::global()?.find_help(&name));
        }
        Commands::Patterns => {
            print!("{}", list_patterns(&*PatternRegistry::global()?));
        }
        Commands::Dot { file } => {
            println!("{}", compile_file(&file, config)?.to_dot());
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PhyslConfig> {
    let config = match path {
        Some(path) => PhyslConfig::load(path)?,
        None => PhyslConfig::default(),
    };
    Ok(config.merge_env())
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))
}

fn compile_file(file: &Path, config: PhyslConfig) -> Result<Function> {
    let source = read_source(file)?;
    let codename = file.display().to_string();
    debug!("compiling {}", codename);
    compile_source(&codename, &source, config)
}

fn compile_source(codename: &str, source: &str, config: PhyslConfig) -> Result<Function> {
    let compiler = Compiler::with_default_registry()?.with_config(config.with_codename(codename));
    Ok(compiler.compile_source(codename, source, &mut Environment::new())?)
}

fn render_ast(source: &str, json: bool) -> Result<String> {
    let expressions = generate_ast(source)?;
    if json {
        return Ok(serde_json::to_string_pretty(&expressions)?);
    }
    Ok(expressions.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))
}

fn list_patterns(registry: &PatternRegistry) -> String {
    registry
        .entries()
        .iter()
        .map(|entry| format!("{:<20} {:<28} {}\n", entry.name, entry.template, entry.origin))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use physl_core::Value;
    use std::io::Write;

    async fn evaluate(codename: &str, source: &str, config: PhyslConfig) -> Result<Value> {
        Ok(compile_source(codename, source, config)?.run().await?)
    }

    #[tokio::test]
    async fn test_evaluate_source() {
        let value = evaluate("test", "define(sq, x, x * x), sq(7)", PhyslConfig::default()).await.unwrap();
        assert_eq!(value, Value::from(49_i64));
    }

    #[test]
    fn test_compile_file_reports_codename() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1 + missing").unwrap();
        let error = compile_file(file.path(), PhyslConfig::default()).unwrap_err();
        assert!(error.to_string().contains("unbound identifier 'missing'"));
        assert!(error.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_render_ast() {
        assert_eq!(render_ast("f(1, 2) ,  x*(y+1)", false).unwrap(), "f(1, 2)\nx * (y + 1)");
        let json = render_ast("x", true).unwrap();
        assert!(json.contains("\"Identifier\""));
        assert!(render_ast("f(", false).is_err());
    }

    #[test]
    fn test_list_patterns_in_order() {
        let listing = list_patterns(&PatternRegistry::with_builtins().unwrap());
        let first = listing.lines().next().unwrap();
        assert!(first.starts_with("define"));
        assert!(listing.contains("shape(_1, _2)"));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_recursion_depth = 64").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.max_recursion_depth, 64);
    }
}

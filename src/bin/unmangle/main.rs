use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rustc_hash::FxHashSet;
use tracing_subscriber::EnvFilter;

use unmangle::error::Severity;
use unmangle::pipeline::options::Options;
use unmangle::pipeline::pass::PassSet;
use unmangle::pipeline::timing::Timing;
use unmangle::pipeline::{run_many, FileResult, SourceFile};
use unmangle::unminify::default_pass_sets;
use unmangle::unpacker::unpack_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Silent,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Silent => "off",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "unmangle", version, about = "Unpack bundles and unminify JavaScript")]
struct Cli {
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the rewrite passes over each file.
    Unminify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        /// Write into a non-empty output directory.
        #[arg(long)]
        force: bool,
        /// Print per-pass timings.
        #[arg(long)]
        perf: bool,
        /// JSON options file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Pass or pass-set ids to skip.
        #[arg(long, value_delimiter = ',')]
        disable: Vec<String>,
    },
    /// Split a bundle into one file per module.
    Unpack {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Unminify every extracted module.
        #[arg(long)]
        unminify: bool,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(config: Option<&Path>) -> Result<Options> {
    match config {
        Some(path) => Options::from_file(path),
        None => Ok(Options::default()),
    }
}

fn prepare_output(dir: &Path, force: bool) -> Result<()> {
    if dir.exists() {
        let occupied = fs::read_dir(dir)
            .with_context(|| format!("failed to list {}", dir.display()))?
            .next()
            .is_some();
        if occupied && !force {
            bail!("{} is not empty, pass --force to write into it", dir.display());
        }
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

fn write_file(path: &Path, code: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, code).with_context(|| format!("failed to write {}", path.display()))
}

fn report(results: &[FileResult], perf: bool) -> usize {
    let mut timing = Timing::default();
    let mut failed = 0;
    for result in results {
        for diagnostic in &result.diagnostics {
            if diagnostic.severity == Severity::Warning {
                let pass = diagnostic.pass.as_deref().unwrap_or("-");
                tracing::warn!(path = %result.path, pass, "{}", diagnostic.message);
            }
        }
        if result.failed {
            failed += 1;
        }
        timing.merge(&result.timing);
    }

    if perf {
        for entry in timing.entries() {
            println!("{:<24} {:>10.2?}", entry.key, entry.duration);
        }
        println!("{:<24} {:>10.2?}", "total", timing.total());
    }
    failed
}

/// Output path of each input file. Basenames when they are unique, otherwise
/// paths relative to the deepest directory shared by every input.
fn output_names(files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut basenames = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_name()
            .with_context(|| format!("{} is not a file", file.display()))?;
        basenames.push(PathBuf::from(name));
    }
    if all_distinct(&basenames) {
        return Ok(basenames);
    }

    let absolute = files
        .iter()
        .map(|file| std::path::absolute(file).with_context(|| format!("failed to resolve {}", file.display())))
        .collect::<Result<Vec<_>>>()?;
    let mut root: Vec<Component> = absolute[0].parent().map(|dir| dir.components().collect()).unwrap_or_default();
    for file in &absolute[1..] {
        let shared = root
            .iter()
            .zip(file.components())
            .take_while(|(a, b)| *a == b)
            .count();
        root.truncate(shared);
    }

    let mut names = Vec::with_capacity(files.len());
    for (file, path) in files.iter().zip(&absolute) {
        let relative: PathBuf = path.components().skip(root.len()).collect();
        if !relative.components().all(|component| matches!(component, Component::Normal(_))) {
            bail!("cannot place {} inside the output directory", file.display());
        }
        names.push(relative);
    }
    if !all_distinct(&names) {
        bail!("the same input file was given more than once");
    }
    Ok(names)
}

fn all_distinct(paths: &[PathBuf]) -> bool {
    let mut seen = FxHashSet::default();
    paths.iter().all(|path| seen.insert(path))
}

fn unminify_files(
    files: &[PathBuf],
    output: &Path,
    force: bool,
    perf: bool,
    config: Option<&Path>,
    disable: &[String],
) -> Result<()> {
    let options = load_options(config)?;
    let passes = PassSet::flatten(default_pass_sets(), disable);

    let names = output_names(files)?;
    let mut sources = Vec::with_capacity(files.len());
    for (file, name) in files.iter().zip(names) {
        let source = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
        sources.push(SourceFile {
            path: name.to_string_lossy().into_owned(),
            source,
        });
    }

    prepare_output(output, force)?;
    let results = run_many(&sources, &passes, &options);
    for result in &results {
        write_file(&output.join(&result.path), &result.code)?;
    }

    let failed = report(&results, perf);
    tracing::info!(files = results.len(), failed, "unminified");
    if failed > 0 {
        bail!("{failed} of {} files could not be fully processed", results.len());
    }
    Ok(())
}

fn unpack_bundle(file: &Path, output: &Path, unminify: bool, force: bool, config: Option<&Path>) -> Result<()> {
    let unpacked = unpack_file(file).with_context(|| format!("failed to unpack {}", file.display()))?;

    let mut sources: Vec<SourceFile> = unpacked
        .modules
        .iter()
        .map(|module| SourceFile {
            path: unpacked.filename(&module.id),
            source: module.code.clone(),
        })
        .collect();

    if unminify {
        let options = load_options(config)?;
        let passes = PassSet::flatten(default_pass_sets(), &[]);
        let results = run_many(&sources, &passes, &options);
        report(&results, false);
        sources = results
            .into_iter()
            .map(|result| SourceFile {
                path: result.path,
                source: result.code,
            })
            .collect();
    }

    prepare_output(output, force)?;
    for source in &sources {
        write_file(&output.join(&source.path), &source.source)?;
    }
    tracing::info!(
        modules = sources.len(),
        entries = unpacked.entries().count(),
        "unpacked into {}",
        output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match cli.command {
        Command::Unminify {
            files,
            output,
            force,
            perf,
            config,
            disable,
        } => unminify_files(&files, &output, force, perf, config.as_deref(), &disable),
        Command::Unpack {
            file,
            output,
            unminify,
            force,
            config,
        } => unpack_bundle(&file, &output, unminify, force, config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(paths: &[&str]) -> Vec<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_unique_basenames_are_kept() {
        let names = output_names(&paths(&["src/a.js", "lib/b.js"])).unwrap();
        assert_eq!(names, paths(&["a.js", "b.js"]));
    }

    #[test]
    fn test_duplicate_basenames_keep_their_directories() {
        let names = output_names(&paths(&["app/a/index.js", "app/b/index.js", "app/b/c/index.js"])).unwrap();
        assert_eq!(names, paths(&["a/index.js", "b/index.js", "b/c/index.js"]));
    }

    #[test]
    fn test_repeated_input_is_rejected() {
        assert!(output_names(&paths(&["a/index.js", "a/index.js"])).is_err());
    }
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use verso_config::VersoConfig;
use verso_core::Uri;
use verso_vfs::{GitUriOptions, GitUriParams};

#[derive(Parser)]
#[command(
    name = "verso",
    version,
    about = "Verso CLI (encode, decode and resolve git: locators)"
)]
struct Cli {
    /// Path to a `verso.toml` (defaults to discovery from the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a file at a revision as a git: URI
    Encode(EncodeArgs),
    /// Decode the params carried by a git: URI
    Decode(DecodeArgs),
    /// Print the base/ours/theirs URIs for a conflicted file
    Merge(MergeArgs),
    /// Resolve symlinks in a path, file URI or git: URI
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct EncodeArgs {
    /// File to encode (relative paths are made absolute)
    path: PathBuf,
    /// Revision the content is taken from
    #[arg(long = "ref")]
    git_ref: String,
    /// Append `.git` to the URI path
    #[arg(long)]
    replace_file_extension: bool,
    /// Root of the parent repository when the file lives in a submodule
    #[arg(long)]
    submodule_of: Option<String>,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DecodeArgs {
    /// A git: URI in its string form
    uri: String,
    /// Resolve symlinks in the decoded path
    #[arg(long)]
    resolve: bool,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MergeArgs {
    /// Conflicted file
    path: PathBuf,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ResolveArgs {
    /// A filesystem path or a URI
    target: String,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct EncodeReport {
    uri: String,
    params: GitUriParams,
}

#[derive(Serialize)]
struct MergeReport {
    base: String,
    ours: String,
    theirs: String,
}

#[derive(Serialize)]
struct ResolveReport {
    input: String,
    resolved: String,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    verso_config::init_tracing(&config.logging);

    match cli.command {
        Command::Encode(args) => {
            let path = absolute_path_string(&args.path)?;
            let options = GitUriOptions {
                replace_file_extension: args.replace_file_extension,
                submodule_of: args.submodule_of,
            };
            let uri = verso_vfs::to_git_uri(&Uri::file(&path), &args.git_ref, &options)?;
            tracing::debug!(target: "verso.cli", %uri, "encoded git uri");

            if args.json {
                let params = verso_vfs::from_git_uri(&uri)?;
                print_json(&EncodeReport {
                    uri: uri.to_string(),
                    params,
                })?;
            } else {
                println!("{uri}");
            }
        }
        Command::Decode(args) => {
            let uri: Uri = args
                .uri
                .parse()
                .with_context(|| format!("invalid uri {:?}", args.uri))?;
            let params = if args.resolve && config.resolve.symlinks {
                verso_vfs::from_git_uri_resolved(&uri)?
            } else {
                verso_vfs::from_git_uri(&uri)?
            };

            if args.json {
                print_json(&params)?;
            } else {
                println!("path: {}", params.path);
                println!("ref: {}", params.git_ref);
                if let Some(submodule_of) = &params.submodule_of {
                    println!("submoduleOf: {submodule_of}");
                }
            }
        }
        Command::Merge(args) => {
            let path = absolute_path_string(&args.path)?;
            let uris = verso_vfs::to_merge_uris(&Uri::file(&path))?;

            if args.json {
                print_json(&MergeReport {
                    base: uris.base.to_string(),
                    ours: uris.ours.to_string(),
                    theirs: uris.theirs.to_string(),
                })?;
            } else {
                for uri in uris.into_array() {
                    println!("{uri}");
                }
            }
        }
        Command::Resolve(args) => {
            let resolved = if config.resolve.symlinks {
                resolve_target(&args.target)?
            } else {
                tracing::debug!(target: "verso.cli", "symlink resolution disabled by config");
                args.target.clone()
            };

            if args.json {
                print_json(&ResolveReport {
                    input: args.target,
                    resolved,
                })?;
            } else {
                println!("{resolved}");
            }
        }
    }

    Ok(0)
}

fn load_config(explicit: Option<&Path>) -> Result<VersoConfig> {
    if let Some(path) = explicit {
        return VersoConfig::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let (config, _path) = verso_config::load_for_workspace(&cwd)?;
    Ok(config)
}

fn resolve_target(target: &str) -> Result<String> {
    // A single-letter "scheme" is a Windows drive letter, not a URI.
    match target.parse::<Uri>() {
        Ok(uri) if uri.scheme().len() > 1 => {
            let resolved = if verso_vfs::is_git_uri(&uri) {
                verso_vfs::resolve_git_uri(&uri)
            } else {
                verso_vfs::resolve_uri(&uri)
            };
            Ok(resolved.to_string())
        }
        _ => {
            let path = absolute_path_string(Path::new(target))?;
            Ok(verso_vfs::resolve_path(&path))
        }
    }
}

fn absolute_path_string(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("failed to make {} absolute", path.display()))?;
    absolute
        .into_os_string()
        .into_string()
        .map_err(|raw| anyhow::anyhow!("path is not valid UTF-8: {raw:?}"))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! respak command-line inspector.
//!
//! Mounts content directories and packs the way a game would at startup and
//! answers questions about the merged namespace.
//!
//! Usage:
//!   respak --dir Resources ls /Textures
//!   respak --config vfs.ron find /Prototypes
//!   respak --pack Content.zip --dir Mods cat /Maps/level.map > level.map
//!   respak --dir Resources resolve Textures sub/foo.png
//!   RUST_LOG=respak_vfs=debug respak --config vfs.ron roots

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use respak_vfs::{MountConfig, MountSource, ResPath, ResourceManager, SeekPolicy, VfsConfig};

/// Inspect content mounted through the respak VFS.
#[derive(Parser, Debug)]
#[command(name = "respak")]
#[command(about = "Inspect content mounted through the respak VFS")]
struct Args {
    /// RON config describing mounts; applied before --dir and --pack.
    /// Relative paths inside it are relative to the config file's directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content directory to mount at `/` (repeatable, earlier wins)
    #[arg(long = "dir", value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// Content pack to mount at `/` after every --dir (repeatable)
    #[arg(long = "pack", value_name = "ZIP")]
    packs: Vec<PathBuf>,

    /// Override the stream seek policy
    #[arg(long)]
    seek_policy: Option<SeekPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the immediate children of a directory
    Ls {
        #[arg(default_value = "/")]
        path: ResPath,
    },
    /// Enumerate files (or directories) below a path
    Find {
        #[arg(default_value = "/")]
        path: ResPath,
        /// Direct children only
        #[arg(long)]
        shallow: bool,
        /// List directories instead of files
        #[arg(long, conflicts_with = "under")]
        dirs: bool,
        /// Only files below directories with this name
        #[arg(long, value_name = "NAME")]
        under: Option<String>,
    },
    /// Write a file's bytes to stdout
    Cat { path: ResPath },
    /// Find PATH below some directory named ROOT_NAME
    Resolve {
        root_name: String,
        path: String,
        /// Directory to start searching from
        #[arg(long)]
        origin: Option<ResPath>,
    },
    /// Show mounted roots in shadowing order
    Roots,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let manager = build_manager(&args)?;
    run(&manager, args.command)
}

fn build_manager(args: &Args) -> Result<ResourceManager> {
    let mut config = match &args.config {
        Some(path) => VfsConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => VfsConfig::default(),
    };
    if let Some(policy) = args.seek_policy {
        config.seek_policy = policy;
    }

    for dir in &args.dirs {
        config.mounts.push(MountConfig {
            source: MountSource::Directory(absolute(dir)?),
            prefix: None,
        });
    }
    for pack in &args.packs {
        config.mounts.push(MountConfig {
            source: MountSource::Pack(absolute(pack)?),
            prefix: None,
        });
    }

    tracing::debug!("Building resource manager with {} mounts", config.mounts.len());
    ResourceManager::from_config(&config).context("failed to mount content")
}

/// Command-line paths are relative to the working directory, not the executable.
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("invalid path {}", path.display()))
}

fn run(manager: &ResourceManager, command: Command) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match command {
        Command::Ls { path } => {
            for entry in manager.content_get_directory_entries(&path.to_rooted())? {
                writeln!(out, "{}", entry)?;
            }
        }
        Command::Find {
            path,
            shallow,
            dirs,
            under,
        } => {
            let path = path.to_rooted();
            if let Some(name) = under {
                for file in manager.content_find_files_under_directories_with_name(&path, &name)? {
                    writeln!(out, "{}", file)?;
                }
            } else if dirs {
                for dir in manager.content_find_directories(&path)? {
                    writeln!(out, "{}", dir)?;
                }
            } else {
                for file in manager.content_find_files(&path, !shallow)? {
                    writeln!(out, "{}", file)?;
                }
            }
        }
        Command::Cat { path } => {
            let data = manager.content_file_read_to_end(&path.to_rooted())?;
            out.write_all(&data)?;
        }
        Command::Resolve {
            root_name,
            path,
            origin,
        } => {
            let origin = origin.map(|o| o.to_rooted());
            let resolved = manager.resolve_path(&root_name, path, origin.as_ref())?;
            writeln!(out, "{}", resolved)?;
        }
        Command::Roots => {
            for (index, mount) in manager.mounts().into_iter().enumerate() {
                let disk = mount
                    .disk_path
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                writeln!(
                    out,
                    "{:>3}  {:<24} {:<10} {}",
                    index,
                    mount.prefix.as_str(),
                    mount.kind,
                    disk
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_find() {
        let args = Args::try_parse_from([
            "respak",
            "--dir",
            "Resources",
            "--seek-policy",
            "non-seekable",
            "find",
            "/Textures",
            "--shallow",
        ])
        .unwrap();
        assert_eq!(args.dirs, vec![PathBuf::from("Resources")]);
        assert_eq!(args.seek_policy, Some(SeekPolicy::ForceNonSeekable));
        match args.command {
            Command::Find { path, shallow, .. } => {
                assert_eq!(path, ResPath::new("/Textures"));
                assert!(shallow);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_dirs_conflicts_with_under() {
        let parsed = Args::try_parse_from(["respak", "find", "--dirs", "--under", "Textures"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_build_manager_from_flags() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("Textures")).unwrap();
        std::fs::write(temp.path().join("Textures/a.png"), b"png").unwrap();
        let dir = temp.path().to_str().unwrap();

        let args = Args::try_parse_from(["respak", "--dir", dir, "roots"]).unwrap();
        let manager = build_manager(&args).unwrap();
        assert_eq!(manager.mounts().len(), 1);
        assert_eq!(manager.mounts()[0].kind, "directory");
        assert_eq!(
            manager
                .content_file_read_to_end(&ResPath::new("/Textures/a.png"))
                .unwrap(),
            b"png"
        );
    }
}

//! Defines the modularizer's CLI through clap types.

mod clone;
mod modularize;

use std::{borrow::Cow, env, io, path::Path, str::FromStr};

use anyhow::Context;
use clap::Parser;
use rig_dom::ComponentKind;
use serde::Serialize;
use thiserror::Error;

use crate::{options::ModularizeOptions, scene::Scene};

pub use self::clone::CloneCommand;
pub use self::modularize::ModularizeCommand;

/// Command line options that the modularizer accepts, defined using the clap
/// crate.
#[derive(Debug, Parser)]
#[clap(name = "modularizer", version, about, author)]
pub struct Options {
    #[clap(flatten)]
    pub global: GlobalOptions,

    /// Subcommand to run in this invocation.
    #[clap(subcommand)]
    pub subcommand: Subcommand,
}

impl Options {
    pub fn run(self) -> anyhow::Result<()> {
        match self.subcommand {
            Subcommand::Clone(subcommand) => subcommand.run(),
            Subcommand::Modularize(subcommand) => subcommand.run(),
        }
    }
}

#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Sets verbosity level. Can be specified multiple times.
    #[clap(long("verbose"), short, global(true), parse(from_occurrences))]
    pub verbosity: u8,

    /// Set color behavior. Valid values are auto, always, and never.
    #[clap(long("color"), global(true), default_value("auto"))]
    pub color: ColorChoice,
}

#[derive(Debug, Clone, Copy)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl FromStr for ColorChoice {
    type Err = ColorChoiceParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        match source {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(ColorChoiceParseError {
                attempted: source.to_owned(),
            }),
        }
    }
}

impl From<ColorChoice> for env_logger::WriteStyle {
    fn from(value: ColorChoice) -> Self {
        match value {
            ColorChoice::Auto => env_logger::WriteStyle::Auto,
            ColorChoice::Always => env_logger::WriteStyle::Always,
            ColorChoice::Never => env_logger::WriteStyle::Never,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid color choice '{attempted}'. Valid values are: auto, always, never")]
pub struct ColorChoiceParseError {
    attempted: String,
}

#[derive(Debug, Parser)]
pub enum Subcommand {
    Clone(CloneCommand),
    Modularize(ModularizeCommand),
}

/// Flags that override the `options` stored in a scene document.
#[derive(Debug, Default, Parser)]
pub struct OptionOverrides {
    /// Name of the node that receives the merged hierarchy. `{workspace}` is
    /// replaced with the workspace's name.
    #[clap(long)]
    pub merge_root_name: Option<String>,

    /// Folder that generated assets are persisted under.
    #[clap(long)]
    pub generated_folder: Option<String>,

    /// Component kind that is never copied onto the base. Replaces the
    /// scene's list when given; can be specified multiple times.
    #[clap(long("exclude"))]
    pub excluded_kinds: Vec<String>,
}

impl OptionOverrides {
    pub fn apply(self, options: &mut ModularizeOptions) {
        if let Some(name) = self.merge_root_name {
            options.merge_root_name = name;
        }

        if let Some(folder) = self.generated_folder {
            options.generated_folder = folder;
        }

        if !self.excluded_kinds.is_empty() {
            options.excluded_kinds = self
                .excluded_kinds
                .iter()
                .map(|kind| ComponentKind::new(kind))
                .collect();
        }
    }
}

pub(super) fn resolve_path(path: &Path) -> io::Result<Cow<'_, Path>> {
    if path.is_absolute() {
        Ok(Cow::Borrowed(path))
    } else {
        Ok(Cow::Owned(env::current_dir()?.join(path)))
    }
}

pub(super) fn read_scene(path: &Path) -> anyhow::Result<Scene> {
    let path = resolve_path(path).context("Could not resolve the input path")?;
    let contents = fs_err::read(path.as_ref())?;

    serde_json::from_slice(&contents)
        .with_context(|| format!("Could not parse scene document {}", path.display()))
}

pub(super) fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let path = resolve_path(path).context("Could not resolve the output path")?;
    let mut contents =
        serde_json::to_string_pretty(value).context("Could not serialize the output")?;
    contents.push('\n');

    fs_err::write(path.as_ref(), contents)?;

    Ok(())
}

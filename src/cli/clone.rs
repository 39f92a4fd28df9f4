use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use crate::workspace::create_workspace_avoiding;

use super::{read_scene, write_json, OptionOverrides};

/// Adds a workspace copy of an avatar to a scene document.
#[derive(Debug, Parser)]
pub struct CloneCommand {
    /// Path to the scene document to read.
    #[clap(long, short)]
    pub input: PathBuf,

    /// Name of the avatar to copy.
    #[clap(long)]
    pub base: String,

    /// Where to write the scene with the workspace added. Defaults to
    /// overwriting the input.
    #[clap(long, short)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub overrides: OptionOverrides,
}

impl CloneCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let mut scene = read_scene(&self.input)?;
        self.overrides.apply(&mut scene.options);

        let base = match scene.avatar(&self.base) {
            Some(base) => base.clone(),
            None => bail!("The scene has no avatar named {:?}", self.base),
        };

        let avatar_names: Vec<String> = scene.avatars.keys().cloned().collect();
        let reserved: Vec<&str> = avatar_names.iter().map(String::as_str).collect();

        let workspace = create_workspace_avoiding(
            &mut scene.dom,
            &mut scene.assets,
            &base,
            &scene.options,
            &reserved,
        )
        .with_context(|| format!("Could not create a workspace for {:?}", self.base))?;

        for request in &workspace.persist {
            log::info!("Save {} to {}", request.asset, request.path);
        }

        scene.avatars.insert(workspace.name.clone(), workspace.avatar);

        let output = self.output.as_ref().unwrap_or(&self.input);
        write_json(output, &scene)?;

        println!("Created workspace {:?} in {}", workspace.name, output.display());

        Ok(())
    }
}

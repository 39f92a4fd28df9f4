use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use crate::{modularize::modularize, scene::ModularizeOutput};

use super::{read_scene, write_json, OptionOverrides};

/// Extracts the edits made to a workspace into a merge module for its base.
#[derive(Debug, Parser)]
pub struct ModularizeCommand {
    /// Path to the scene document to read.
    #[clap(long, short)]
    pub input: PathBuf,

    /// Where to write the module, along with the scene it refers into.
    #[clap(long, short)]
    pub output: PathBuf,

    /// Name of the edited workspace avatar.
    #[clap(long)]
    pub workspace: String,

    /// Name of the avatar the workspace was copied from.
    #[clap(long)]
    pub base: String,

    #[clap(flatten)]
    pub overrides: OptionOverrides,
}

impl ModularizeCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let mut scene = read_scene(&self.input)?;
        self.overrides.apply(&mut scene.options);

        let (workspace, base) = match (scene.avatar(&self.workspace), scene.avatar(&self.base)) {
            (Some(workspace), Some(base)) => (workspace.clone(), base.clone()),
            (None, _) => bail!("The scene has no avatar named {:?}", self.workspace),
            (_, None) => bail!("The scene has no avatar named {:?}", self.base),
        };

        let module = modularize(
            &mut scene.dom,
            &mut scene.assets,
            &workspace,
            &base,
            &scene.options,
        )
        .with_context(|| format!("Could not modularize {:?} into {:?}", self.workspace, self.base))?;

        write_json(
            &self.output,
            &ModularizeOutput {
                module: &module,
                scene: &scene,
            },
        )?;

        println!(
            "Wrote module with {} layers and {} warnings to {}",
            module.merge_animators.len(),
            module.warnings.len(),
            self.output.display()
        );

        Ok(())
    }
}

//! Extracts the changes made to a workspace copy of an avatar rig into a
//! self-contained module that can be installed on the original.

pub mod bake;
pub mod cli;
pub mod controller_diff;
pub mod descriptor;
pub mod error;
pub mod flat_diff;
pub mod hierarchy;
pub mod modularize;
pub mod module;
pub mod options;
pub mod relocate;
pub mod scene;
pub mod workspace;

mod multimap;

#[cfg(test)]
mod tree_view;

pub use crate::{
    descriptor::{Avatar, AvatarDescriptor, LayerType},
    error::{MergeWarning, ModularizeError},
    modularize::modularize,
    module::DiffModule,
    options::ModularizeOptions,
    scene::Scene,
    workspace::create_workspace,
};

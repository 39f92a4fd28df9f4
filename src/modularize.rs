//! Ties the merge passes together into a single diff module.

use rig_dom::{AssetId, Assets, ExpressionParameters, ExpressionsMenu, RigDom};

use crate::{
    bake::OverrideBaker,
    controller_diff::diff_controllers,
    descriptor::Avatar,
    error::{MergeWarning, ModularizeError},
    flat_diff::{diff_menu, diff_parameters},
    hierarchy::merge_hierarchy,
    module::{DiffModule, MenuItem, MergeAnimator, ParameterConfig, PersistRequest, ProxyRecord},
    options::ModularizeOptions,
    relocate::{clips_of, AnimationRelocator},
};

/// Merges `workspace` into `base` and describes everything that has to be
/// installed for the base to match the workspace.
///
/// The merge root is created under the base root. The workspace tree and the
/// workspace's assets are left untouched.
pub fn modularize(
    dom: &mut RigDom,
    assets: &mut Assets,
    workspace: &Avatar,
    base: &Avatar,
    options: &ModularizeOptions,
) -> Result<DiffModule, ModularizeError> {
    let merge = merge_hierarchy(dom, workspace.root, base.root, base.root, options)?;

    let workspace_name = dom
        .get_by_ref(workspace.root)
        .map(|node| node.name.clone())
        .ok_or(ModularizeError::MissingWorkspaceRoot { id: workspace.root })?;

    let mut warnings = merge.warnings;
    let mut merge_animators = Vec::new();
    let mut persist = Vec::new();

    let diffs = diff_controllers(
        assets,
        &workspace.descriptor.layers,
        &base.descriptor.layers,
        &mut warnings,
    );

    let mut relocator = AnimationRelocator::new();
    for &diff in diffs.values() {
        relocator.add_controller(assets, diff);
    }
    let relocated = relocator.rewrite_binding_paths(assets, &merge.path_mapping)?;
    log::debug!("Relocated {} clips", relocated);

    for (&layer_type, &diff) in &diffs {
        let path = options.asset_path(
            &workspace_name,
            &format!("{} Extracted", layer_type.as_str()),
        );
        let converted = relocator.controller(diff);

        let (controller, sub_assets) = if converted == diff {
            (diff, Vec::new())
        } else {
            match bake(assets, converted) {
                Ok((controller, sub_assets, bake_warnings)) => {
                    warnings.extend(bake_warnings);
                    (controller, sub_assets)
                }
                Err(reason) => {
                    let warning = MergeWarning::BakeFailed {
                        layer_type,
                        asset: converted,
                        reason,
                    };
                    log::error!("{}", warning);
                    warnings.push(warning);
                    (converted, unbaked_sub_assets(assets, &relocator, diff))
                }
            }
        };

        persist.push(PersistRequest {
            asset: controller,
            path,
            sub_assets,
        });
        merge_animators.push(MergeAnimator::new(layer_type, controller));
    }

    let parameters: Vec<ParameterConfig> = diff_parameters(
        expression_parameters(assets, workspace.descriptor.expression_parameters, &mut warnings),
        expression_parameters(assets, base.descriptor.expression_parameters, &mut warnings),
    )
    .iter()
    .map(ParameterConfig::from)
    .collect();

    let menu_items: Vec<MenuItem> = diff_menu(
        expressions_menu(assets, workspace.descriptor.expressions_menu, &mut warnings),
        expressions_menu(assets, base.descriptor.expressions_menu, &mut warnings),
    )
    .into_iter()
    .map(MenuItem::from)
    .collect();

    log::info!(
        "Modularized {:?}: {} layers, {} parameters, {} menu items, {} warnings",
        workspace_name,
        merge_animators.len(),
        parameters.len(),
        menu_items.len(),
        warnings.len()
    );

    Ok(DiffModule {
        merge_root: merge.merge_root,
        proxies: merge
            .proxies
            .iter()
            .map(|(target, proxy)| ProxyRecord { target, proxy })
            .collect(),
        path_mapping: merge.path_mapping,
        changes: merge.changes,
        merge_animators,
        parameters,
        menu_items,
        persist,
        warnings,
    })
}

fn bake(
    assets: &mut Assets,
    override_controller: AssetId,
) -> Result<(AssetId, Vec<AssetId>, Vec<MergeWarning>), String> {
    let mut baker = OverrideBaker::new(assets, override_controller).map_err(|err| err.to_string())?;
    let output = baker.bake(assets).map_err(|err| err.to_string())?;

    Ok((output.controller, baker.sub_assets(), output.warnings))
}

/// What an override controller that could not be baked still needs stored
/// next to it: the controller it overrides and the relocated clips.
fn unbaked_sub_assets(
    assets: &Assets,
    relocator: &AnimationRelocator,
    controller: AssetId,
) -> Vec<AssetId> {
    let mut sub_assets = vec![controller];

    for clip in clips_of(assets, controller) {
        let relocated = relocator.clip(clip);
        if relocated != clip && !sub_assets.contains(&relocated) {
            sub_assets.push(relocated);
        }
    }

    sub_assets
}

fn expression_parameters<'a>(
    assets: &'a Assets,
    id: Option<AssetId>,
    warnings: &mut Vec<MergeWarning>,
) -> Option<&'a ExpressionParameters> {
    let id = id?;
    let parameters = assets
        .get(id)
        .and_then(|entry| entry.asset.as_expression_parameters());

    if parameters.is_none() {
        let warning = MergeWarning::MissingAsset { asset: id };
        log::warn!("{}", warning);
        warnings.push(warning);
    }

    parameters
}

fn expressions_menu<'a>(
    assets: &'a Assets,
    id: Option<AssetId>,
    warnings: &mut Vec<MergeWarning>,
) -> Option<&'a ExpressionsMenu> {
    let id = id?;
    let menu = assets
        .get(id)
        .and_then(|entry| entry.asset.as_expressions_menu());

    if menu.is_none() {
        let warning = MergeWarning::MissingAsset { asset: id };
        log::warn!("{}", warning);
        warnings.push(warning);
    }

    menu
}

use crate::codec;
use crate::config::PlanConfig;
use crate::ip::{AddressRange, AllocationRegistry};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and validate an allocation plan from a YAML file
pub fn load_plan(plan_path: &Path) -> Result<PlanConfig> {
    info!("Loading allocation plan from: {:?}", plan_path);

    let file = File::open(plan_path)
        .wrap_err_with(|| format!("Failed to open plan file '{}'", plan_path.display()))?;

    let plan: PlanConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse plan file '{}'", plan_path.display()))?;

    plan.validate()?;

    Ok(plan)
}

/// Load a plan and build its registry
pub fn load_registry(plan_path: &Path) -> Result<(PlanConfig, AllocationRegistry)> {
    let plan = load_plan(plan_path)?;
    let registry = plan
        .build_registry()
        .wrap_err_with(|| format!("Plan '{}' is not a valid allocation", plan_path.display()))?;
    info!(
        "Loaded {} subnets within summary {}",
        registry.len(),
        registry.summary()
    );
    Ok((plan, registry))
}

/// Write an allocation plan as YAML
pub fn save_plan(plan: &PlanConfig, plan_path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(plan).wrap_err("Failed to serialize plan to YAML")?;
    std::fs::write(plan_path, yaml)
        .wrap_err_with(|| format!("Failed to write plan to {}", plan_path.display()))?;
    info!("Plan written to {}", plan_path.display());
    Ok(())
}

/// Export a registry as CSV
pub fn export_csv(registry: &AllocationRegistry, csv_path: &Path) -> Result<()> {
    std::fs::write(csv_path, codec::to_csv_string(registry))
        .wrap_err_with(|| format!("Failed to write CSV to {}", csv_path.display()))?;
    info!("Exported {} subnets to {}", registry.len(), csv_path.display());
    Ok(())
}

/// Import a registry from CSV, inferring the summary when no hint is given
pub fn import_csv(csv_path: &Path, summary_hint: Option<AddressRange>) -> Result<AllocationRegistry> {
    let text = std::fs::read_to_string(csv_path)
        .wrap_err_with(|| format!("Failed to read CSV file '{}'", csv_path.display()))?;
    let registry = codec::from_csv_str(&text, summary_hint)
        .wrap_err_with(|| format!("Failed to import '{}'", csv_path.display()))?;
    info!(
        "Imported {} subnets from {} (summary {})",
        registry.len(),
        csv_path.display(),
        registry.summary()
    );
    Ok(registry)
}

use crate::cli::MaterialsArgs;
use crate::error::Result;
use lartpc::core::materials::MaterialDatabase;
use lartpc::engine::error::EngineError;
use std::fmt::Write;

pub fn run(args: MaterialsArgs) -> Result<()> {
    let database = match &args.materials_file {
        Some(path) => MaterialDatabase::load(path).map_err(EngineError::from)?,
        None => MaterialDatabase::new(),
    };
    print!("{}", render_table(&database)?);
    Ok(())
}

fn render_table(database: &MaterialDatabase) -> Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "{:<28} {:>12} {:>16} {:>14} {:>14}",
        "Material", "g/cm3", "MeV cm2/g", "MeV/cm", "X0 (cm)"
    )
    .map_err(anyhow::Error::from)?;
    for name in database.names() {
        let material = database.find_or_build(&name).map_err(EngineError::from)?;
        let p = material.properties;
        writeln!(
            out,
            "{:<28} {:>12.6} {:>16.3} {:>14.4} {:>14.4}",
            name,
            p.density,
            p.stopping_power,
            p.stopping_power * p.density,
            p.radiation_length
        )
        .map_err(anyhow::Error::from)?;
    }
    Ok(out)
}

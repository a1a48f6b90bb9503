use crate::cli::ConstantsArgs;
use crate::error::Result;
use partbox::core::params::constants::{DEFAULT_PHYSICAL_CONSTANTS, PhysicalConstants};
use partbox::engine::error::ConfigurationError;

pub fn run(args: ConstantsArgs) -> Result<()> {
    match args.name {
        Some(name) => {
            let constants = PhysicalConstants::by_name(&name).map_err(ConfigurationError::from)?;
            println!("{}", describe(&constants));
        }
        None => {
            for name in PhysicalConstants::available() {
                let marker = if name == DEFAULT_PHYSICAL_CONSTANTS { " (default)" } else { "" };
                println!("{name}{marker}");
            }
        }
    }
    Ok(())
}

fn describe(constants: &PhysicalConstants) -> String {
    format!(
        "{}\n  boltzmann_constant   {:e} J/K\n  avogadro_constant    {:e} 1/mol\n  elementary_charge    {:e} C\n  permittivity_vacuum  {:e} F/m\n  ideal_gas_constant   {} J/(mol K)\n  charge_conversion    {} kJ A/(mol e^2)",
        constants.name(),
        constants.boltzmann_constant(),
        constants.avogadro_constant(),
        constants.elementary_charge(),
        constants.permittivity_vacuum(),
        constants.ideal_gas_constant(),
        constants.charge_conversion(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn describe_lists_derived_values() {
        let constants = PhysicalConstants::by_name("CODATA2010").unwrap();
        let text = describe(&constants);
        assert!(text.starts_with("CODATA2010"));
        assert!(text.contains("1.3806488e-23"));
    }

    #[test]
    fn unknown_set_is_rejected() {
        let err = run(ConstantsArgs {
            name: Some("bananas".to_string()),
        })
        .unwrap_err();
        assert!(matches!(err, CliError::Partbox(_)));
        assert!(err.to_string().contains("not recognized"));
    }
}

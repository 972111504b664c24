use lartpc::core::units::{CM, GEV, KEV, M, MEV, MM};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid quantity '{0}'. Expected a number optionally followed by a unit (e.g., '25 GeV').")]
    InvalidNumber(String),

    #[error("Unknown {kind} unit '{unit}'. Expected one of: {expected}.")]
    UnknownUnit {
        kind: &'static str,
        unit: String,
        expected: &'static str,
    },

    #[error("Quantity '{0}' must be positive and finite.")]
    NotPositive(String),
}

fn split_quantity(input: &str) -> Result<(f64, &str), ParseError> {
    let trimmed = input.trim();
    let bytes = trimmed.as_bytes();
    let split = (0..bytes.len())
        .find(|&i| {
            let c = bytes[i];
            let exponent = matches!(c, b'e' | b'E')
                && i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes
                    .get(i + 1)
                    .is_some_and(|n| n.is_ascii_digit() || matches!(n, b'+' | b'-'));
            c.is_ascii_alphabetic() && !exponent
        })
        .unwrap_or(bytes.len());
    let (number, unit) = trimmed.split_at(split);
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidNumber(input.to_string()))?;
    if !(value.is_finite() && value > 0.0) {
        return Err(ParseError::NotPositive(input.to_string()));
    }
    Ok((value, unit.trim()))
}

/// Parses an energy such as `25`, `25 GeV` or `500MeV` into MeV. A bare number is in
/// `default_unit`.
pub fn parse_energy(input: &str, default_unit: f64) -> Result<f64, ParseError> {
    let (value, unit) = split_quantity(input)?;
    let scale = match unit.to_ascii_lowercase().as_str() {
        "" => default_unit,
        "kev" => KEV,
        "mev" => MEV,
        "gev" => GEV,
        "tev" => 1.0e3 * GEV,
        _ => {
            return Err(ParseError::UnknownUnit {
                kind: "energy",
                unit: unit.to_string(),
                expected: "keV, MeV, GeV, TeV",
            });
        }
    };
    Ok(value * scale)
}

/// Parses a length such as `1.9`, `190 cm` or `1900mm` into mm. A bare number is in
/// `default_unit`.
pub fn parse_length(input: &str, default_unit: f64) -> Result<f64, ParseError> {
    let (value, unit) = split_quantity(input)?;
    let scale = match unit {
        "" => default_unit,
        "mm" => MM,
        "cm" => CM,
        "m" => M,
        _ => {
            return Err(ParseError::UnknownUnit {
                kind: "length",
                unit: unit.to_string(),
                expected: "mm, cm, m",
            });
        }
    };
    Ok(value * scale)
}

pub fn energy_gev_arg(input: &str) -> Result<f64, ParseError> {
    parse_energy(input, GEV).map(|e| e / GEV)
}

pub fn length_mm_arg(input: &str) -> Result<f64, ParseError> {
    parse_length(input, M)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn energies_with_units_convert_to_mev() {
        assert!(close(parse_energy("25 GeV", GEV).unwrap(), 25_000.0));
        assert!(close(parse_energy("500MeV", GEV).unwrap(), 500.0));
        assert!(close(parse_energy("  20 keV ", GEV).unwrap(), 0.02));
        assert!(close(parse_energy("1 gev", MEV).unwrap(), 1000.0));
        assert!(close(parse_energy("2.5e1 GeV", GEV).unwrap(), 25_000.0));
    }

    #[test]
    fn bare_numbers_use_the_default_unit() {
        assert!(close(parse_energy("3", GEV).unwrap(), 3000.0));
        assert!(close(parse_energy("3", MEV).unwrap(), 3.0));
        assert!(close(parse_length("1.9", M).unwrap(), 1900.0));
    }

    #[test]
    fn energy_argument_is_reported_in_gev() {
        assert!(close(energy_gev_arg("25").unwrap(), 25.0));
        assert!(close(energy_gev_arg("500 MeV").unwrap(), 0.5));
    }

    #[test]
    fn lengths_with_units_convert_to_mm() {
        assert!(close(parse_length("190 cm", M).unwrap(), 1900.0));
        assert!(close(parse_length("5mm", M).unwrap(), 5.0));
        assert!(close(length_mm_arg("2 m").unwrap(), 2000.0));
    }

    #[test]
    fn malformed_quantities_are_rejected() {
        assert_eq!(
            parse_energy("fast", GEV),
            Err(ParseError::InvalidNumber("fast".to_string()))
        );
        assert!(matches!(
            parse_energy("5 eV", GEV),
            Err(ParseError::UnknownUnit { kind: "energy", .. })
        ));
        assert!(matches!(
            parse_length("3 ft", M),
            Err(ParseError::UnknownUnit { kind: "length", .. })
        ));
        assert_eq!(
            parse_length("-1 m", M),
            Err(ParseError::NotPositive("-1 m".to_string()))
        );
        assert!(matches!(parse_energy("0", GEV), Err(ParseError::NotPositive(_))));
    }
}

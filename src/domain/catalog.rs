//! Display names for IPCC sector codes and the unit label for emissions.
//!
//! Codes missing from the table are shown bare; the store stays the source of
//! truth for which sectors exist.

use crate::domain::model::{SectorChoice, TOTALS_SECTOR};

const SECTOR_LABELS: &[(&str, &str)] = &[
    ("AGS", "Agricultural soils"),
    ("AWB", "Agricultural waste burning"),
    ("CHE", "Chemical industry"),
    ("ENE", "Power generation / Energy industry"),
    ("ENF", "Enteric Fermentation"),
    ("IDE", "Industrial processes (other)"),
    ("IND", "Combustion for manufacturing industry"),
    ("MNM", "Manure Management"),
    ("N2O", "Other N2O sources"),
    ("NMM", "Non-metallic minerals (e.g. cement)"),
    ("PRO_COAL", "Coal Production"),
    ("PRO_FFF", "Fossil Fuel Fires"),
    ("PRO_GAS", "Gas Production"),
    ("PRO_OIL", "Oil Production"),
    ("RCO", "Residential, commercial and other"),
    ("REF_TRF", "Refineries & fuel transformation"),
    ("SWD_INC", "Solid waste incineration"),
    ("SWD_LDF", "Solid Waste Disposal (Landfills)"),
    ("TNR_Aviation_CDS", "Aviation (climb & descent)"),
    ("TNR_Aviation_CRS", "Aviation (cruise)"),
    ("TNR_Other", "Other transport"),
    ("TRO", "Road transport"),
    ("WWT", "Wastewater Treatment"),
    (TOTALS_SECTOR, "All sectors (inventory total)"),
];

pub fn sector_label(code: &str) -> Option<&'static str> {
    SECTOR_LABELS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, label)| *label)
}

/// "CODE - Name" when the code is known, the bare code otherwise.
pub fn display_choice(choice: &SectorChoice) -> String {
    match choice {
        SectorChoice::All => "All sectors".to_string(),
        SectorChoice::Sector(code) => match sector_label(code) {
            Some(label) => format!("{} - {}", code, label),
            None => code.clone(),
        },
    }
}

/// Tonnes of substance per 0.1° cell per year. Values are never rescaled.
pub fn unit_label(substance: &str) -> String {
    format!("t {} · (0.1°)⁻² · yr⁻¹", substance)
}

/// Up to `digits` significant digits, trailing zeros trimmed.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let digits = digits.max(1);
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= digits as i32 {
        let formatted = format!("{:.*e}", digits - 1, value);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", trim_fraction(mantissa), exp),
            None => formatted,
        };
    }
    let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, value)).to_string()
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

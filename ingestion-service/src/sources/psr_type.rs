/// Provider production-type codes (`MktPSRType/psrType`) and their labels.
const PSR_TYPES: &[(&str, &str)] = &[
    ("A03", "Mixed"),
    ("A04", "Generation"),
    ("A05", "Load"),
    ("B01", "Biomass"),
    ("B02", "Fossil Brown coal/Lignite"),
    ("B03", "Fossil Coal-derived gas"),
    ("B04", "Fossil Gas"),
    ("B05", "Fossil Hard coal"),
    ("B06", "Fossil Oil"),
    ("B07", "Fossil Oil shale"),
    ("B08", "Fossil Peat"),
    ("B09", "Geothermal"),
    ("B10", "Hydro Pumped Storage"),
    ("B11", "Hydro Run-of-river and poundage"),
    ("B12", "Hydro Water Reservoir"),
    ("B13", "Marine"),
    ("B14", "Nuclear"),
    ("B15", "Other renewable"),
    ("B16", "Solar"),
    ("B17", "Waste"),
    ("B18", "Wind Offshore"),
    ("B19", "Wind Onshore"),
    ("B20", "Other"),
    ("B21", "AC Link"),
    ("B22", "DC Link"),
    ("B23", "Substation"),
    ("B24", "Transformer"),
    ("B25", "Energy storage"),
];

/// Human-readable resource label; unknown codes are kept verbatim.
pub fn label(code: &str) -> &str {
    PSR_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_labels() {
        assert_eq!(label("B16"), "Solar");
        assert_eq!(label("B19"), "Wind Onshore");
        assert_eq!(label("B04"), "Fossil Gas");
    }

    #[test]
    fn unknown_codes_are_kept() {
        assert_eq!(label("B99"), "B99");
    }
}

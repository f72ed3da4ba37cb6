//! Market-area short codes and their provider domain identifiers (EIC codes).

const AREAS: &[(&str, &str)] = &[
    ("AT", "10YAT-APG------L"),
    ("BE", "10YBE----------2"),
    ("BG", "10YCA-BULGARIA-R"),
    ("CH", "10YCH-SWISSGRIDZ"),
    ("CZ", "10YCZ-CEPS-----N"),
    ("DE", "10Y1001A1001A83F"),
    ("DE_LU", "10Y1001A1001A82H"),
    ("DK", "10Y1001A1001A65H"),
    ("EE", "10Y1001A1001A39I"),
    ("ES", "10YES-REE------0"),
    ("FI", "10YFI-1--------U"),
    ("FR", "10YFR-RTE------C"),
    ("GB", "10YGB----------A"),
    ("GR", "10YGR-HTSO-----Y"),
    ("HR", "10YHR-HEP------M"),
    ("HU", "10YHU-MAVIR----U"),
    ("IE", "10YIE-1001A00010"),
    ("IT", "10YIT-GRTN-----B"),
    ("LT", "10YLT-1001A0008Q"),
    ("LV", "10YLV-1001A00074"),
    ("NL", "10YNL----------L"),
    ("NO", "10YNO-0--------C"),
    ("PL", "10YPL-AREA-----S"),
    ("PT", "10YPT-REN------W"),
    ("RO", "10YRO-TEL------P"),
    ("RS", "10YCS-SERBIATSOV"),
    ("SE", "10YSE-1--------K"),
    ("SI", "10YSI-ELES-----O"),
    ("SK", "10YSK-SEPS-----K"),
];

const EIC_LEN: usize = 16;

/// Resolve a configured market area to the provider's domain identifier.
///
/// Short codes are matched case-insensitively; a full 16-character EIC code
/// passes through unchanged.
pub fn resolve(area: &str) -> Option<&str> {
    let trimmed = area.trim();
    if let Some((_, eic)) = AREAS.iter().find(|(code, _)| code.eq_ignore_ascii_case(trimmed)) {
        return Some(*eic);
    }

    if looks_like_eic(trimmed) {
        return Some(trimmed);
    }

    None
}

fn looks_like_eic(s: &str) -> bool {
    s.len() == EIC_LEN
        && s.starts_with("10Y")
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Schengen-area member states, matched exactly and case-sensitively against
/// the `country` stored on a visit.
pub const SCHENGEN_COUNTRIES: [&str; 29] = [
    "Austria",
    "Belgium",
    "Bulgaria",
    "Croatia",
    "Czech Republic",
    "Denmark",
    "Estonia",
    "Finland",
    "France",
    "Germany",
    "Greece",
    "Hungary",
    "Iceland",
    "Italy",
    "Latvia",
    "Liechtenstein",
    "Lithuania",
    "Luxembourg",
    "Malta",
    "Netherlands",
    "Norway",
    "Poland",
    "Portugal",
    "Romania",
    "Slovakia",
    "Slovenia",
    "Spain",
    "Sweden",
    "Switzerland",
];

pub fn is_schengen_country(country: &str) -> bool {
    SCHENGEN_COUNTRIES.contains(&country)
}

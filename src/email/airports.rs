use crate::schengen::SCHENGEN_COUNTRIES;

/// IATA airport codes with the country they are in, limited to the airports
/// DINO users actually fly through.
const AIRPORTS: &[(&str, &str)] = &[
    ("ICN", "South Korea"),
    ("GMP", "South Korea"),
    ("PUS", "South Korea"),
    ("CJU", "South Korea"),
    ("NRT", "Japan"),
    ("HND", "Japan"),
    ("KIX", "Japan"),
    ("FUK", "Japan"),
    ("PVG", "China"),
    ("PEK", "China"),
    ("HKG", "Hong Kong"),
    ("TPE", "Taiwan"),
    ("BKK", "Thailand"),
    ("CNX", "Thailand"),
    ("SGN", "Vietnam"),
    ("HAN", "Vietnam"),
    ("DAD", "Vietnam"),
    ("SIN", "Singapore"),
    ("KUL", "Malaysia"),
    ("MNL", "Philippines"),
    ("CEB", "Philippines"),
    ("DPS", "Indonesia"),
    ("DXB", "United Arab Emirates"),
    ("DOH", "Qatar"),
    ("IST", "Turkey"),
    ("LHR", "United Kingdom"),
    ("LGW", "United Kingdom"),
    ("DUB", "Ireland"),
    ("CDG", "France"),
    ("ORY", "France"),
    ("NCE", "France"),
    ("FRA", "Germany"),
    ("MUC", "Germany"),
    ("BER", "Germany"),
    ("AMS", "Netherlands"),
    ("BRU", "Belgium"),
    ("MAD", "Spain"),
    ("BCN", "Spain"),
    ("FCO", "Italy"),
    ("MXP", "Italy"),
    ("VCE", "Italy"),
    ("LIS", "Portugal"),
    ("OPO", "Portugal"),
    ("VIE", "Austria"),
    ("ZRH", "Switzerland"),
    ("GVA", "Switzerland"),
    ("PRG", "Czech Republic"),
    ("BUD", "Hungary"),
    ("WAW", "Poland"),
    ("CPH", "Denmark"),
    ("ARN", "Sweden"),
    ("OSL", "Norway"),
    ("HEL", "Finland"),
    ("ATH", "Greece"),
    ("ZAG", "Croatia"),
    ("KEF", "Iceland"),
    ("JFK", "United States"),
    ("LAX", "United States"),
    ("SFO", "United States"),
    ("YVR", "Canada"),
    ("SYD", "Australia"),
];

pub fn airport_country(code: &str) -> Option<&'static str> {
    AIRPORTS.iter().find(|(iata, _)| *iata == code).map(|(_, country)| *country)
}

pub fn is_known_airport(code: &str) -> bool {
    airport_country(code).is_some()
}

/// Every country name the parser can recognise in free text.
pub fn known_countries() -> impl Iterator<Item = &'static str> {
    let mut countries: Vec<&'static str> = SCHENGEN_COUNTRIES.to_vec();
    for (_, country) in AIRPORTS {
        if !countries.contains(country) {
            countries.push(country);
        }
    }
    countries.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_airport_country() {
        assert_eq!(airport_country("CDG"), Some("France"));
        assert_eq!(airport_country("ICN"), Some("South Korea"));
        assert_eq!(airport_country("cdg"), None);
        assert_eq!(airport_country("XXX"), None);
    }

    #[test]
    fn known_countries_are_unique() {
        let countries: Vec<_> = known_countries().collect();
        let mut deduped = countries.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(countries.len(), deduped.len());
        assert!(countries.contains(&"Liechtenstein"));
        assert!(countries.contains(&"Vietnam"));
    }
}

//! Fixed backend locations keyed by the country code embedded in backend
//! names (`fsd.<code><n>.<domain>`).

use crate::geo::GeoCoord;

const LOCATIONS: &[(&str, GeoCoord)] = &[
    ("usa-w", GeoCoord::new(37.7749, -122.431297)),
    ("usa-e", GeoCoord::new(40.7128, -73.935242)),
    ("can", GeoCoord::new(43.6532, -79.3832)),
    ("uk", GeoCoord::new(51.5072, 0.1276)),
    ("ger", GeoCoord::new(50.1109, 8.6821)),
    ("ams", GeoCoord::new(52.3676, 4.9041)),
];

/// Country code of a backend: its second label with everything outside
/// `[A-Za-z-]` stripped. Empty when the name has a single label.
pub fn country_code(name: &str) -> String {
    name.split('.')
        .nth(1)
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '-')
        .collect()
}

/// Coordinate for a country code, if the code is known.
pub fn location_for(code: &str) -> Option<GeoCoord> {
    LOCATIONS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, coord)| *coord)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_strips_digits() {
        assert_eq!(country_code("fsd.usa-e1.vatsim.net"), "usa-e");
        assert_eq!(country_code("fsd.uk2.vatsim.net"), "uk");
        assert_eq!(country_code("fsd.ams.vatsim.net"), "ams");
    }

    #[test]
    fn test_country_code_single_label() {
        assert_eq!(country_code("localhost"), "");
    }

    #[test]
    fn test_location_lookup() {
        assert_eq!(location_for("ger"), Some(GeoCoord::new(50.1109, 8.6821)));
        assert_eq!(location_for("mars"), None);
    }
}

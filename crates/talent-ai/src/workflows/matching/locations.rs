//! Closed catalogue of candidate-search locations.
//!
//! The directory collaborator filters profiles by the geo identifiers of a
//! fixed set of countries. Extraction output names countries in capital
//! letters (or a region alias); everything funnels through
//! [`LocationCode::parse`] and [`expand_locations`] so downstream stages
//! only ever see catalogue members.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

macro_rules! location_catalogue {
    ($( $variant:ident => ($name:literal, $geo:literal) ),+ $(,)?) => {
        /// A country supported by the candidate directory.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum LocationCode {
            $( $variant, )+
        }

        impl LocationCode {
            /// Canonical capital-letter name, as emitted by extraction.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )+
                }
            }

            /// Directory geo identifier for this country.
            pub fn geo_id(&self) -> &'static str {
                match self {
                    $( Self::$variant => $geo, )+
                }
            }

            /// Parse a country mention. Accepts the canonical name with
            /// spaces or underscores, case-insensitively.
            pub fn parse(raw: &str) -> Option<Self> {
                let normalized = raw.trim().to_ascii_uppercase().replace('_', " ");
                match normalized.as_str() {
                    $( $name => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

location_catalogue! {
    France => ("FRANCE", "105015875"),
    Belgium => ("BELGIUM", "100565514"),
    Spain => ("SPAIN", "105646813"),
    England => ("ENGLAND", "102299470"),
    Germany => ("GERMANY", "101282230"),
    Italy => ("ITALY", "103350119"),
    UnitedStates => ("UNITED STATES", "103644278"),
    Canada => ("CANADA", "101174742"),
    Australia => ("AUSTRALIA", "101452733"),
    India => ("INDIA", "102713980"),
    China => ("CHINA", "102890883"),
    Japan => ("JAPAN", "101355337"),
    Brazil => ("BRAZIL", "106057199"),
    Poland => ("POLAND", "105072130"),
    Netherlands => ("NETHERLANDS", "102890719"),
    Ukraine => ("UKRAINE", "102264497"),
    Switzerland => ("SWITZERLAND", "106693272"),
    Sweden => ("SWEDEN", "105117694"),
    Albania => ("ALBANIA", "102845717"),
    Russia => ("RUSSIA", "101728296"),
    UnitedArabEmirates => ("UNITED ARAB EMIRATES", "104305776"),
    Andorra => ("ANDORRA", "106296266"),
    Austria => ("AUSTRIA", "103883259"),
    Belarus => ("BELARUS", "101705918"),
    Bulgaria => ("BULGARIA", "105333783"),
    Croatia => ("CROATIA", "104688944"),
    CzechRepublic => ("CZECH REPUBLIC", "104508036"),
    Denmark => ("DENMARK", "104514075"),
    Estonia => ("ESTONIA", "102974008"),
    Finland => ("FINLAND", "100456013"),
    Georgia => ("GEORGIA", "106315325"),
    Greece => ("GREECE", "104677530"),
    Hungary => ("HUNGARY", "100288700"),
    Turkey => ("TURKEY", "106732692"),
    Romania => ("ROMANIA", "106670623"),
    Portugal => ("PORTUGAL", "100364837"),
    Norway => ("NORWAY", "103819153"),
    Moldova => ("MOLDOVA", "106178099"),
    Lithuania => ("LITHUANIA", "101464403"),
    Luxembourg => ("LUXEMBOURG", "104042105"),
    Serbia => ("SERBIA", "101855366"),
    Slovakia => ("SLOVAKIA", "103119917"),
    BosniaAndHerzegovina => ("BOSNIA AND HERZEGOVINA", "102869081"),
    Latvia => ("LATVIA", "104341318"),
    Liechtenstein => ("LIECHTENSTEIN", "100878084"),
    Israel => ("ISRAEL", "101620260"),
    Kazakhstan => ("KAZAKHSTAN", "106049128"),
    Azerbaijan => ("AZERBAIJAN", "103226548"),
    Uzbekistan => ("UZBEKISTAN", "107734735"),
    Tajikistan => ("TAJIKISTAN", "105925962"),
}

impl Serialize for LocationCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for LocationCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown location '{raw}'")))
    }
}

/// A multi-country region alias. When a vacancy names a region instead of
/// a country, the whole member list goes into the search filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    EuropeanUnion,
    Nordics,
    Baltics,
    Dach,
    Benelux,
    Cis,
}

impl Region {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace('_', " ");
        match normalized.as_str() {
            "EU" | "EUROPEAN UNION" | "EUROPE" => Some(Self::EuropeanUnion),
            "NORDICS" | "SCANDINAVIA" => Some(Self::Nordics),
            "BALTICS" | "BALTIC STATES" => Some(Self::Baltics),
            "DACH" => Some(Self::Dach),
            "BENELUX" => Some(Self::Benelux),
            "CIS" => Some(Self::Cis),
            _ => None,
        }
    }

    pub fn members(&self) -> &'static [LocationCode] {
        use LocationCode::*;
        match self {
            Self::EuropeanUnion => &[
                France,
                Belgium,
                Spain,
                England,
                Germany,
                Italy,
                Netherlands,
                Poland,
                Switzerland,
                Sweden,
                Austria,
                Bulgaria,
                Croatia,
                CzechRepublic,
                Denmark,
                Estonia,
                Finland,
                Greece,
                Hungary,
                Romania,
                Portugal,
                Norway,
                Lithuania,
                Luxembourg,
                Slovakia,
            ],
            Self::Nordics => &[Denmark, Finland, Norway, Sweden],
            Self::Baltics => &[Estonia, Latvia, Lithuania],
            Self::Dach => &[Germany, Austria, Switzerland],
            Self::Benelux => &[Belgium, Netherlands, Luxembourg],
            Self::Cis => &[
                Russia, Belarus, Moldova, Kazakhstan, Azerbaijan, Uzbekistan, Tajikistan,
            ],
        }
    }
}

/// Map raw location mentions (country names or region aliases) onto the
/// catalogue. Regions expand to their member lists; the set is
/// duplicate-free by construction; unknown mentions are logged and
/// skipped.
pub fn expand_locations<S: AsRef<str>>(tokens: &[S]) -> BTreeSet<LocationCode> {
    let mut locations = BTreeSet::new();
    for token in tokens {
        let token = token.as_ref();
        if let Some(region) = Region::parse(token) {
            locations.extend(region.members().iter().copied());
        } else if let Some(code) = LocationCode::parse(token) {
            locations.insert(code);
        } else {
            warn!(location = %token, "location mention outside the catalogue, skipping");
        }
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_underscore_names() {
        assert_eq!(LocationCode::parse("POLAND"), Some(LocationCode::Poland));
        assert_eq!(
            LocationCode::parse("united_states"),
            Some(LocationCode::UnitedStates)
        );
        assert_eq!(
            LocationCode::parse("Czech Republic"),
            Some(LocationCode::CzechRepublic)
        );
        assert_eq!(LocationCode::parse("NARNIA"), None);
    }

    #[test]
    fn region_alias_expands_to_full_member_union() {
        let expanded = expand_locations(&["EU"]);
        let members: BTreeSet<_> = Region::EuropeanUnion.members().iter().copied().collect();
        assert_eq!(expanded, members);
        assert_eq!(expanded.len(), 25);
    }

    #[test]
    fn expansion_is_duplicate_free_and_order_independent() {
        let forward = expand_locations(&["GERMANY", "DACH", "AUSTRIA"]);
        let backward = expand_locations(&["AUSTRIA", "DACH", "GERMANY"]);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3);
    }

    #[test]
    fn unknown_mentions_are_dropped() {
        let expanded = expand_locations(&["ATLANTIS", "JAPAN"]);
        assert_eq!(expanded.len(), 1);
        assert!(expanded.contains(&LocationCode::Japan));
    }

    #[test]
    fn every_member_has_a_geo_id() {
        for region in [
            Region::EuropeanUnion,
            Region::Nordics,
            Region::Baltics,
            Region::Dach,
            Region::Benelux,
            Region::Cis,
        ] {
            for member in region.members() {
                assert!(!member.geo_id().is_empty());
            }
        }
    }
}

//! Colour-code reference data.
//!
//! The remote represents colours as numeric ids; the canonical side uses the
//! display string. The table is pure reference data shipped as a JSON asset
//! so data updates do not touch code.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

const COLOUR_ASSET: &str = include_str!("../assets/colours.json");

#[derive(Debug, Deserialize)]
struct ColourAsset {
    colours: HashMap<String, String>,
}

struct ColourTable {
    by_id: HashMap<u32, String>,
    by_name: HashMap<String, u32>,
}

fn table() -> &'static ColourTable {
    static TABLE: OnceLock<ColourTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let asset: ColourAsset =
            serde_json::from_str(COLOUR_ASSET).expect("colours.json asset is well-formed");
        let mut by_id = HashMap::with_capacity(asset.colours.len());
        let mut by_name = HashMap::with_capacity(asset.colours.len());
        for (id, name) in asset.colours {
            let id: u32 = id.parse().expect("colour ids are numeric");
            by_name.insert(name.clone(), id);
            by_id.insert(id, name);
        }
        ColourTable { by_id, by_name }
    })
}

/// The display string for a remote colour id.
#[must_use]
pub fn colour_name(id: u32) -> Option<&'static str> {
    table().by_id.get(&id).map(String::as_str)
}

/// The remote colour id for a display string.
#[must_use]
pub fn colour_id(name: &str) -> Option<u32> {
    table().by_name.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_directions() {
        assert_eq!(colour_name(5), Some("Black"));
        assert_eq!(colour_id("Black"), Some(5));
        assert_eq!(colour_name(1), Some("Red"));
        assert_eq!(colour_id("Red"), Some(1));
    }

    #[test]
    fn test_unknown_values() {
        assert_eq!(colour_name(999_999), None);
        assert_eq!(colour_id("Colour That Does Not Exist"), None);
    }

    #[test]
    fn test_table_is_bijective() {
        let t = table();
        assert_eq!(t.by_id.len(), t.by_name.len());
    }
}

//! Province lookup and transit regions, keyed by a normalized city name.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Transit band measured from the atelier in Antalya.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingRegion {
    Local,
    Regional,
    National,
    Remote,
}

impl ShippingRegion {
    pub fn transit_hours(&self) -> i64 {
        match self {
            Self::Local => 24,
            Self::Regional => 48,
            Self::National => 72,
            Self::Remote => 96,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Province {
    /// Licence-plate code, also used as the carrier's city code.
    pub code: u8,
    pub name: &'static str,
    pub region: ShippingRegion,
}

const PROVINCES: [(u8, &str); 81] = [
    (1, "Adana"), (2, "Adıyaman"), (3, "Afyonkarahisar"), (4, "Ağrı"), (5, "Amasya"), (6, "Ankara"),
    (7, "Antalya"), (8, "Artvin"), (9, "Aydın"), (10, "Balıkesir"), (11, "Bilecik"), (12, "Bingöl"),
    (13, "Bitlis"), (14, "Bolu"), (15, "Burdur"), (16, "Bursa"), (17, "Çanakkale"), (18, "Çankırı"),
    (19, "Çorum"), (20, "Denizli"), (21, "Diyarbakır"), (22, "Edirne"), (23, "Elazığ"), (24, "Erzincan"),
    (25, "Erzurum"), (26, "Eskişehir"), (27, "Gaziantep"), (28, "Giresun"), (29, "Gümüşhane"), (30, "Hakkari"),
    (31, "Hatay"), (32, "Isparta"), (33, "Mersin"), (34, "İstanbul"), (35, "İzmir"), (36, "Kars"),
    (37, "Kastamonu"), (38, "Kayseri"), (39, "Kırklareli"), (40, "Kırşehir"), (41, "Kocaeli"), (42, "Konya"),
    (43, "Kütahya"), (44, "Malatya"), (45, "Manisa"), (46, "Kahramanmaraş"), (47, "Mardin"), (48, "Muğla"),
    (49, "Muş"), (50, "Nevşehir"), (51, "Niğde"), (52, "Ordu"), (53, "Rize"), (54, "Sakarya"),
    (55, "Samsun"), (56, "Siirt"), (57, "Sinop"), (58, "Sivas"), (59, "Tekirdağ"), (60, "Tokat"),
    (61, "Trabzon"), (62, "Tunceli"), (63, "Şanlıurfa"), (64, "Uşak"), (65, "Van"), (66, "Yozgat"),
    (67, "Zonguldak"), (68, "Aksaray"), (69, "Bayburt"), (70, "Karaman"), (71, "Kırıkkale"), (72, "Batman"),
    (73, "Şırnak"), (74, "Bartın"), (75, "Ardahan"), (76, "Iğdır"), (77, "Yalova"), (78, "Karabük"),
    (79, "Kilis"), (80, "Osmaniye"), (81, "Düzce"),
];

fn region_for_code(code: u8) -> ShippingRegion {
    match code {
        7 => ShippingRegion::Local,
        1 | 31 | 33 | 48 => ShippingRegion::Regional,
        4 | 30 | 36 | 65 => ShippingRegion::Remote,
        _ => ShippingRegion::National,
    }
}

static BY_KEY: Lazy<HashMap<String, Province>> = Lazy::new(|| {
    PROVINCES
        .iter()
        .map(|&(code, name)| (normalize(name), Province { code, name, region: region_for_code(code) }))
        .collect()
});

/// Lowercases with Turkish dotted/dotless i rules and folds diacritics,
/// so "İSTANBUL", "Istanbul" and "istanbul" share one key.
pub fn normalize(input: &str) -> String {
    input
        .trim()
        .chars()
        .flat_map(|c| match c {
            'İ' | 'I' | 'ı' | 'î' | 'Î' => vec!['i'],
            'Ç' | 'ç' => vec!['c'],
            'Ğ' | 'ğ' => vec!['g'],
            'Ö' | 'ö' => vec!['o'],
            'Ş' | 'ş' => vec!['s'],
            'Ü' | 'ü' | 'û' | 'Û' => vec!['u'],
            'Â' | 'â' => vec!['a'],
            other => other.to_lowercase().collect(),
        })
        .collect()
}

pub fn lookup_province(city: &str) -> Option<Province> { BY_KEY.get(&normalize(city)).copied() }

/// Unknown cities ship on the national band.
pub fn classify_region(city: &str) -> ShippingRegion {
    lookup_province(city).map(|p| p.region).unwrap_or(ShippingRegion::National)
}

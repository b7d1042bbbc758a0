use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChartError;

/// Zodiac signs in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    /// Get sign from ecliptic longitude (0-360 degrees)
    pub fn from_longitude(longitude: f64) -> Self {
        let normalized = longitude.rem_euclid(360.0);
        let sign_index = (normalized / 30.0).floor() as usize;
        Self::from_index(sign_index)
    }

    /// Get sign from index (0 = Aries, 11 = Pisces)
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Get sign index (0 = Aries, 11 = Pisces)
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Get the starting degree of this sign (0 = Aries start)
    pub fn start_degree(&self) -> f64 {
        self.index() as f64 * 30.0
    }

    pub fn next(&self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(&self) -> Self {
        Self::from_index(self.index() + 11)
    }

    pub fn opposite(&self) -> Self {
        Self::from_index(self.index() + 6)
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        };
        write!(f, "{}", name)
    }
}

/// Objects that can be placed in a chart.
///
/// Declaration order is the canonical chart order: it drives `Ord`, which in
/// turn orders chart objects, aspect pairs and cache keys.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
    /// True lunar node
    NorthNode,
    /// Point opposite the true lunar node
    SouthNode,
    Chiron,
    /// Black Moon Lilith (mean lunar apogee)
    Lilith,
    Ceres,
    Pallas,
    Juno,
    Vesta,
    Ascendant,
    Midheaven,
}

impl Body {
    const ALL: [Body; 20] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
        Body::Pluto,
        Body::NorthNode,
        Body::SouthNode,
        Body::Chiron,
        Body::Lilith,
        Body::Ceres,
        Body::Pallas,
        Body::Juno,
        Body::Vesta,
        Body::Ascendant,
        Body::Midheaven,
    ];

    /// Every supported object, in chart order
    pub fn all() -> &'static [Body] {
        &Self::ALL
    }

    /// Sun through Pluto, the default aspect inclusion set
    pub fn planets() -> &'static [Body] {
        &Self::ALL[..10]
    }

    /// Objects placed in every chart regardless of the inclusion set
    pub fn chart_defaults() -> &'static [Body] {
        &[
            Body::Sun,
            Body::Moon,
            Body::Mercury,
            Body::Venus,
            Body::Mars,
            Body::Jupiter,
            Body::Saturn,
            Body::Uranus,
            Body::Neptune,
            Body::Pluto,
            Body::NorthNode,
            Body::SouthNode,
            Body::Ascendant,
            Body::Midheaven,
        ]
    }

    /// Get Swiss Ephemeris body ID. Angles and the South Node have none.
    pub fn swe_id(&self) -> Option<i32> {
        match self {
            Body::Sun => Some(0),
            Body::Moon => Some(1),
            Body::Mercury => Some(2),
            Body::Venus => Some(3),
            Body::Mars => Some(4),
            Body::Jupiter => Some(5),
            Body::Saturn => Some(6),
            Body::Uranus => Some(7),
            Body::Neptune => Some(8),
            Body::Pluto => Some(9),
            Body::NorthNode => Some(11), // SE_TRUE_NODE
            Body::Lilith => Some(12),    // SE_MEAN_APOG
            Body::Chiron => Some(15),
            Body::Ceres => Some(17),
            Body::Pallas => Some(18),
            Body::Juno => Some(19),
            Body::Vesta => Some(20),
            Body::SouthNode | Body::Ascendant | Body::Midheaven => None,
        }
    }

    /// Whether this is a house angle rather than a body with its own ephemeris
    pub fn is_angle(&self) -> bool {
        matches!(self, Body::Ascendant | Body::Midheaven)
    }

    /// Whether this body can station and turn retrograde
    pub fn can_retrograde(&self) -> bool {
        !matches!(
            self,
            Body::Sun | Body::Moon | Body::Ascendant | Body::Midheaven
        )
    }

    /// Coarse sampling step (days) for event searches; faster bodies need smaller steps
    pub fn sampling_step(&self) -> f64 {
        match self {
            Body::Moon | Body::NorthNode | Body::SouthNode | Body::Lilith => 0.5,
            Body::Sun | Body::Mercury | Body::Venus => 1.0,
            Body::Mars | Body::Chiron | Body::Ceres | Body::Pallas | Body::Juno | Body::Vesta => {
                2.0
            }
            Body::Ascendant | Body::Midheaven => 0.01,
            _ => 5.0,
        }
    }
}

impl Body {
    /// Signs this body rules. Uranus, Neptune and Pluto take their modern signs.
    pub fn domiciles(&self) -> &'static [ZodiacSign] {
        use ZodiacSign::*;
        match self {
            Body::Sun => &[Leo],
            Body::Moon => &[Cancer],
            Body::Mercury => &[Gemini, Virgo],
            Body::Venus => &[Taurus, Libra],
            Body::Mars => &[Aries, Scorpio],
            Body::Jupiter => &[Sagittarius, Pisces],
            Body::Saturn => &[Capricorn, Aquarius],
            Body::Uranus => &[Aquarius],
            Body::Neptune => &[Pisces],
            Body::Pluto => &[Scorpio],
            _ => &[],
        }
    }

    pub fn exaltation(&self) -> Option<ZodiacSign> {
        let sign = match self {
            Body::Sun => ZodiacSign::Aries,
            Body::Moon => ZodiacSign::Taurus,
            Body::Mercury => ZodiacSign::Virgo,
            Body::Venus => ZodiacSign::Pisces,
            Body::Mars => ZodiacSign::Capricorn,
            Body::Jupiter => ZodiacSign::Cancer,
            Body::Saturn => ZodiacSign::Libra,
            Body::Pluto => ZodiacSign::Aries,
            _ => return None,
        };
        Some(sign)
    }
}

/// Essential dignities of a body in its sign
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
pub struct Dignities {
    /// In a sign it rules
    pub ruler: bool,
    pub exalted: bool,
    /// Opposite a sign it rules
    pub detriment: bool,
    /// Opposite its exaltation
    pub fall: bool,
}

impl Dignities {
    pub fn of(body: Body, sign: ZodiacSign) -> Self {
        let domiciles = body.domiciles();
        let exaltation = body.exaltation();
        Self {
            ruler: domiciles.contains(&sign),
            exalted: exaltation == Some(sign),
            detriment: domiciles.iter().any(|home| home.opposite() == sign),
            fall: exaltation.map(|exalted| exalted.opposite()) == Some(sign),
        }
    }

    /// Peregrine: none of the four apply
    pub fn is_empty(&self) -> bool {
        !(self.ruler || self.exalted || self.detriment || self.fall)
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
            Body::Mercury => "Mercury",
            Body::Venus => "Venus",
            Body::Mars => "Mars",
            Body::Jupiter => "Jupiter",
            Body::Saturn => "Saturn",
            Body::Uranus => "Uranus",
            Body::Neptune => "Neptune",
            Body::Pluto => "Pluto",
            Body::NorthNode => "North Node",
            Body::SouthNode => "South Node",
            Body::Chiron => "Chiron",
            Body::Lilith => "Lilith",
            Body::Ceres => "Ceres",
            Body::Pallas => "Pallas",
            Body::Juno => "Juno",
            Body::Vesta => "Vesta",
            Body::Ascendant => "Ascendant",
            Body::Midheaven => "Midheaven",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Body {
    type Err = ChartError;

    /// Accepts "CERES", "north_node", "North Node", "asc", "mc"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        let body = match normalized.as_str() {
            "sun" => Body::Sun,
            "moon" => Body::Moon,
            "mercury" => Body::Mercury,
            "venus" => Body::Venus,
            "mars" => Body::Mars,
            "jupiter" => Body::Jupiter,
            "saturn" => Body::Saturn,
            "uranus" => Body::Uranus,
            "neptune" => Body::Neptune,
            "pluto" => Body::Pluto,
            "northnode" | "truenode" | "node" => Body::NorthNode,
            "southnode" => Body::SouthNode,
            "chiron" => Body::Chiron,
            "lilith" | "blackmoonlilith" => Body::Lilith,
            "ceres" => Body::Ceres,
            "pallas" => Body::Pallas,
            "juno" => Body::Juno,
            "vesta" => Body::Vesta,
            "asc" | "ascendant" => Body::Ascendant,
            "mc" | "midheaven" => Body::Midheaven,
            _ => return Err(ChartError::invalid(format!("Unknown object: {}", s))),
        };
        Ok(body)
    }
}

//! Filter tags: the atoms of the filter language.
//!
//! Tags are parsed once when definitions load. Anything that does not fit
//! one of the known shapes becomes [`Tag::Unknown`], which never matches.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::interval::Comparison;
use crate::world::{Allegiance, ZoneKind};

static MEASURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(stack|hp|attr:(.+?)|need:(.+?))\s*(>=|<=|==|!=|>|<|=)\s*(.*)$").unwrap()
});

/// A boolean property of an object or agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    InStorage,
    Forbidden,
    UnderConstruction,
    Deceased,
    Incapacitated,
    Captive,
    Guest,
    Paused,
    Outdoors,
}

impl Flag {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in_storage" | "stored" => Some(Self::InStorage),
            "forbidden" => Some(Self::Forbidden),
            "under_construction" => Some(Self::UnderConstruction),
            "deceased" | "dead" => Some(Self::Deceased),
            "incapacitated" | "downed" => Some(Self::Incapacitated),
            "captive" | "prisoner" => Some(Self::Captive),
            "guest" => Some(Self::Guest),
            "paused" => Some(Self::Paused),
            "outdoors" => Some(Self::Outdoors),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::InStorage => "in_storage",
            Self::Forbidden => "forbidden",
            Self::UnderConstruction => "under_construction",
            Self::Deceased => "deceased",
            Self::Incapacitated => "incapacitated",
            Self::Captive => "captive",
            Self::Guest => "guest",
            Self::Paused => "paused",
            Self::Outdoors => "outdoors",
        }
    }
}

/// A numeric quantity a comparison tag reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Measure {
    /// Object stack size.
    Stack,
    /// Object hit points as a fraction.
    HitPoints,
    /// Agent attribute (skill or stat).
    Attribute(String),
    /// Agent need level.
    Need(String),
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stack => f.write_str("stack"),
            Self::HitPoints => f.write_str("hp"),
            Self::Attribute(name) => write!(f, "attr:{name}"),
            Self::Need(name) => write!(f, "need:{name}"),
        }
    }
}

/// A compiled filter tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tag {
    Not(Box<Tag>),
    Flag(Flag),
    Def(String),
    Kind(String),
    Category(String),
    Race(String),
    Allegiance(Allegiance),
    Trait(String),
    Affliction(String),
    ZoneKind(ZoneKind),
    Measure {
        measure: Measure,
        comparison: Comparison,
    },
    Unknown(String),
}

impl Tag {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('!') {
            return Self::Not(Box::new(Self::parse(rest)));
        }

        if let Some(caps) = MEASURE_RE.captures(text) {
            let measure = match &caps[1] {
                "stack" => Measure::Stack,
                "hp" => Measure::HitPoints,
                _ => match (caps.get(2), caps.get(3)) {
                    (Some(attr), _) => Measure::Attribute(attr.as_str().trim().to_string()),
                    (_, Some(need)) => Measure::Need(need.as_str().trim().to_string()),
                    _ => return Self::Unknown(text.to_string()),
                },
            };
            let comparison = Comparison::from_parts(&caps[4], &caps[5]);
            return Self::Measure {
                measure,
                comparison,
            };
        }

        if let Some((prefix, value)) = text.split_once(':') {
            let value = value.trim();
            if value.is_empty() {
                return Self::Unknown(text.to_string());
            }
            return match prefix.trim().to_lowercase().as_str() {
                "def" => Self::Def(value.to_string()),
                "kind" => Self::Kind(value.to_string()),
                "category" => Self::Category(value.to_string()),
                "race" => Self::Race(value.to_string()),
                "trait" => Self::Trait(value.to_string()),
                "affliction" => Self::Affliction(value.to_string()),
                "allegiance" => match Allegiance::parse(value) {
                    Some(a) => Self::Allegiance(a),
                    None => Self::Unknown(text.to_string()),
                },
                "zone" => match parse_zone_kind(value) {
                    Some(k) => Self::ZoneKind(k),
                    None => Self::Unknown(text.to_string()),
                },
                _ => Self::Unknown(text.to_string()),
            };
        }

        match Flag::parse(text) {
            Some(flag) => Self::Flag(flag),
            None => Self::Unknown(text.to_string()),
        }
    }

    /// The unknown tag text if this tag (or a negated inner tag) is unknown.
    pub fn unknown(&self) -> Option<&str> {
        match self {
            Self::Unknown(text) => Some(text),
            Self::Not(inner) => inner.unknown(),
            _ => None,
        }
    }
}

fn parse_zone_kind(s: &str) -> Option<ZoneKind> {
    match s.to_lowercase().as_str() {
        "room" => Some(ZoneKind::Room),
        "storage" | "stockpile" => Some(ZoneKind::Storage),
        "growing" => Some(ZoneKind::Growing),
        "outdoors" => Some(ZoneKind::Outdoors),
        _ => None,
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::Flag(flag) => f.write_str(flag.label()),
            Self::Def(v) => write!(f, "def:{v}"),
            Self::Kind(v) => write!(f, "kind:{v}"),
            Self::Category(v) => write!(f, "category:{v}"),
            Self::Race(v) => write!(f, "race:{v}"),
            Self::Allegiance(a) => write!(f, "allegiance:{}", a.label()),
            Self::Trait(v) => write!(f, "trait:{v}"),
            Self::Affliction(v) => write!(f, "affliction:{v}"),
            Self::ZoneKind(k) => write!(f, "zone:{}", k.label()),
            Self::Measure {
                measure,
                comparison,
            } => write!(f, "{measure}{comparison}"),
            Self::Unknown(text) => f.write_str(text),
        }
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_string()
    }
}

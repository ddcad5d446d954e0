//! Voting category model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed voting category codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Mfp,
    Cringe,
    Drunk,
    Miss,
    Dj,
    Sigma,
    Rizz,
    Gyatt,
    Fanum,
    Skibidi,
    Dance,
    Photo,
}

impl Category {
    pub const ALL: [Self; 12] = [
        Self::Mfp,
        Self::Cringe,
        Self::Drunk,
        Self::Miss,
        Self::Dj,
        Self::Sigma,
        Self::Rizz,
        Self::Gyatt,
        Self::Fanum,
        Self::Skibidi,
        Self::Dance,
        Self::Photo,
    ];

    /// Wire code, as stored in the `category` column.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Mfp => "MFP",
            Self::Cringe => "CRINGE",
            Self::Drunk => "DRUNK",
            Self::Miss => "MISS",
            Self::Dj => "DJ",
            Self::Sigma => "SIGMA",
            Self::Rizz => "RIZZ",
            Self::Gyatt => "GYATT",
            Self::Fanum => "FANUM",
            Self::Skibidi => "SKIBIDI",
            Self::Dance => "DANCE",
            Self::Photo => "PHOTO",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Mfp => "MFP (Type Shit)",
            Self::Cringe => "Yakka Na (Cringe)",
            Self::Drunk => "Dauna Totala (Bere)",
            Self::Miss => "Miss Cabana",
            Self::Dj => "DJ-ul de la 3 AM",
            Self::Sigma => "Sigma Male",
            Self::Rizz => "Rizz God",
            Self::Gyatt => "Gyatt Check",
            Self::Fanum => "Fanum Tax",
            Self::Skibidi => "Skibidi Toilet",
            Self::Dance => "Dance Battle",
            Self::Photo => "Photo Dump",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Mfp => "👑",
            Self::Cringe => "💀",
            Self::Drunk => "🍺",
            Self::Miss => "💅",
            Self::Dj => "🎧",
            Self::Sigma => "🗿",
            Self::Rizz => "🔥",
            Self::Gyatt => "👀",
            Self::Fanum => "💰",
            Self::Skibidi => "🚽",
            Self::Dance => "🕺",
            Self::Photo => "📸",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category '{wanted}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_uppercase_code() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.code()));
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("mfp".parse::<Category>(), Ok(Category::Mfp));
        assert_eq!(" Dj ".parse::<Category>(), Ok(Category::Dj));
        assert!("VIP".parse::<Category>().is_err());
    }
}

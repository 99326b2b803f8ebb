// Data models for persisted recognizer state
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Independent symbol sets. Each has its own registry, symbol models and
/// joint model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Fixed symbol set shipped for 32-bit systems
    Hardcoded32,
    /// Fixed symbol set shipped for 64-bit systems
    Hardcoded64,
    /// Symbols trained by the user
    UserDefined,
}

impl Partition {
    pub const ALL: [Partition; 3] = [
        Partition::Hardcoded32,
        Partition::Hardcoded64,
        Partition::UserDefined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Hardcoded32 => "hardcoded32",
            Partition::Hardcoded64 => "hardcoded64",
            Partition::UserDefined => "user_defined",
        }
    }

    pub fn is_hardcoded(&self) -> bool {
        !matches!(self, Partition::UserDefined)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = String;

    /// Accepts the storage names plus a few shorthands
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hardcoded32" | "32" => Ok(Partition::Hardcoded32),
            "hardcoded64" | "64" => Ok(Partition::Hardcoded64),
            "user_defined" | "user" => Ok(Partition::UserDefined),
            other => Err(format!(
                "unknown partition '{}' (expected hardcoded32, hardcoded64 or user)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Feature vectors collected while training a symbol
    TrainingSet,
    /// Fitted nearest-neighbor index of a symbol
    NeighborIndex,
    /// Acceptance threshold of a symbol
    Tolerance,
    /// Multi-class model over every active symbol of a partition
    JointModel,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::TrainingSet => "training_set",
            ArtifactKind::NeighborIndex => "neighbor_index",
            ArtifactKind::Tolerance => "tolerance",
            ArtifactKind::JointModel => "joint_model",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "training_set" => Some(ArtifactKind::TrainingSet),
            "neighbor_index" => Some(ArtifactKind::NeighborIndex),
            "tolerance" => Some(ArtifactKind::Tolerance),
            "joint_model" => Some(ArtifactKind::JointModel),
            _ => None,
        }
    }

    /// Per-symbol artifacts, in the order they are written
    pub const PER_SYMBOL: [ArtifactKind; 3] = [
        ArtifactKind::TrainingSet,
        ArtifactKind::NeighborIndex,
        ArtifactKind::Tolerance,
    ];
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one stored artifact. `symbol` is `None` for partition-wide
/// artifacts (the joint model).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub partition: Partition,
    pub symbol: Option<String>,
    pub kind: ArtifactKind,
}

impl ArtifactKey {
    pub fn symbol(partition: Partition, symbol: &str, kind: ArtifactKind) -> Self {
        ArtifactKey {
            partition,
            symbol: Some(symbol.to_string()),
            kind,
        }
    }

    pub fn joint(partition: Partition) -> Self {
        ArtifactKey {
            partition,
            symbol: None,
            kind: ArtifactKind::JointModel,
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{}/{}/{}", self.partition, symbol, self.kind),
            None => write!(f, "{}/{}", self.partition, self.kind),
        }
    }
}

/// One known symbol of a partition registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl SymbolEntry {
    pub fn new(name: impl Into<String>) -> Self {
        SymbolEntry {
            name: name.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_round_trip() {
        for partition in Partition::ALL {
            assert_eq!(partition.as_str().parse::<Partition>().unwrap(), partition);
        }
        assert_eq!("user".parse::<Partition>().unwrap(), Partition::UserDefined);
        assert!("nope".parse::<Partition>().is_err());
    }

    #[test]
    fn test_only_user_partition_is_editable() {
        assert!(Partition::Hardcoded32.is_hardcoded());
        assert!(Partition::Hardcoded64.is_hardcoded());
        assert!(!Partition::UserDefined.is_hardcoded());
    }

    #[test]
    fn test_artifact_key_display() {
        let key = ArtifactKey::symbol(Partition::UserDefined, "circle", ArtifactKind::Tolerance);
        assert_eq!(key.to_string(), "user_defined/circle/tolerance");
        assert_eq!(
            ArtifactKey::joint(Partition::Hardcoded64).to_string(),
            "hardcoded64/joint_model"
        );
    }

    #[test]
    fn test_artifact_kind_from_string() {
        for kind in [
            ArtifactKind::TrainingSet,
            ArtifactKind::NeighborIndex,
            ArtifactKind::Tolerance,
            ArtifactKind::JointModel,
        ] {
            assert_eq!(ArtifactKind::from_string(kind.as_str()), Some(kind));
        }
        assert_eq!(ArtifactKind::from_string("pickle"), None);
    }
}

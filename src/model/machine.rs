use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MachineKind {
    Packer,
    Feeder,
}

impl MachineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineKind::Packer => "PACKER",
            MachineKind::Feeder => "FEEDER",
        }
    }

    pub fn from_str(s: &str) -> rusqlite::Result<Self> {
        match s {
            "PACKER" => Ok(MachineKind::Packer),
            "FEEDER" => Ok(MachineKind::Feeder),
            other => Err(rusqlite::Error::InvalidColumnType(
                0,
                format!("unknown machine kind {other}"),
                rusqlite::types::Type::Text,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Active,
    Idle,
    Maintenance,
    Error,
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Active => "active",
            MachineStatus::Idle => "idle",
            MachineStatus::Maintenance => "maintenance",
            MachineStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> rusqlite::Result<Self> {
        match s {
            "active" => Ok(MachineStatus::Active),
            "idle" => Ok(MachineStatus::Idle),
            "maintenance" => Ok(MachineStatus::Maintenance),
            "error" => Ok(MachineStatus::Error),
            other => Err(rusqlite::Error::InvalidColumnType(
                0,
                format!("unknown machine status {other}"),
                rusqlite::types::Type::Text,
            )),
        }
    }
}

/// A packer or feeder machine. Codes are globally unique strings (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub code: String,
    pub kind: MachineKind,
    pub status: MachineStatus,
}

impl Machine {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind: String = row.get("kind")?;
        let status: String = row.get("status")?;
        Ok(Self {
            code: row.get("code")?,
            kind: MachineKind::from_str(&kind)?,
            status: MachineStatus::from_str(&status)?,
        })
    }
}

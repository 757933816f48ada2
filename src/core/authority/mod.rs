//! Per-user authority table
//!
//! Provides permission resolution over a fixed 256 x 8 grid with:
//! - Three-state cells: Deter (explicit deny), Default, Allow
//! - Broader grants covering narrower ones (FullControl, Modify, ReadAndExecute)
//! - Explicit deny precedence anywhere in the covering chain
//! - Access-list export as user sets, bit masks or JSON

mod access_list;
mod table;

pub use access_list::AccessList;
pub use table::{FsAuthorityTable, AUTHORITY_TABLE_LEN};

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one (user, authority type) cell
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthorityState {
    /// Explicit denial, wins over any grant
    Deter = 0xFF,
    /// No explicit decision
    #[default]
    Default = 0x00,
    /// Explicit grant
    Allow = 0x01,
}

impl AuthorityState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0xFF => Some(Self::Deter),
            0x00 => Some(Self::Default),
            0x01 => Some(Self::Allow),
            _ => None,
        }
    }
}

/// Authority columns of the table
///
/// Column 7 is reserved and has no variant.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityType {
    /// Grants every other authority
    FullControl = 0,
    /// Grants Read, Write and ListFileContent
    Modify = 1,
    /// Grants Read and ListFileContent
    ReadAndExecute = 2,
    ListFileContent = 3,
    Read = 4,
    Write = 5,
    /// Not used by the file system itself
    Special = 6,
}

impl AuthorityType {
    pub const ALL: [AuthorityType; 7] = [
        AuthorityType::FullControl,
        AuthorityType::Modify,
        AuthorityType::ReadAndExecute,
        AuthorityType::ListFileContent,
        AuthorityType::Read,
        AuthorityType::Write,
        AuthorityType::Special,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn column(self) -> usize {
        self as usize
    }

    /// Broader authority types whose grant also covers this one
    pub fn covered_by(self) -> &'static [AuthorityType] {
        use AuthorityType::*;
        match self {
            FullControl => &[],
            Modify | ReadAndExecute | Special => &[FullControl],
            Write => &[FullControl, Modify],
            Read | ListFileContent => &[FullControl, Modify, ReadAndExecute],
        }
    }
}

impl fmt::Display for AuthorityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthorityType::FullControl => "full-control",
            AuthorityType::Modify => "modify",
            AuthorityType::ReadAndExecute => "read-and-execute",
            AuthorityType::ListFileContent => "list-file-content",
            AuthorityType::Read => "read",
            AuthorityType::Write => "write",
            AuthorityType::Special => "special",
        };
        f.write_str(name)
    }
}

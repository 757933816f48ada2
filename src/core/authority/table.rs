//! Authority grid storage and cascade evaluation

use super::{AccessList, AuthorityState, AuthorityType};
use crate::error::{Result, TyfsError};
use crate::geometry::{AUTHORITY_COLUMNS, USER_TABLE_SIZE};
use crate::identity::{hash_bytes, Describe, UserId};
use tracing::debug;

/// Encoded size of an authority table (one byte per cell, row-major by user)
pub const AUTHORITY_TABLE_LEN: usize = USER_TABLE_SIZE * AUTHORITY_COLUMNS;

type AuthorityRow = [AuthorityState; AUTHORITY_COLUMNS];

/// 256 users x 8 authority columns, every cell defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsAuthorityTable {
    rows: Box<[AuthorityRow; USER_TABLE_SIZE]>,
}

impl FsAuthorityTable {
    /// Every cell Default
    pub fn new() -> Self {
        FsAuthorityTable {
            rows: Box::new([[AuthorityState::Default; AUTHORITY_COLUMNS]; USER_TABLE_SIZE]),
        }
    }

    /// Raw stored cell, no cascade
    pub fn evaluate(&self, user: UserId, authority: AuthorityType) -> AuthorityState {
        self.rows[user.index()][authority.column()]
    }

    /// Overwrite one cell
    pub fn set(&mut self, user: UserId, authority: AuthorityType, state: AuthorityState) {
        debug!("Authority {} for {} set to {:?}", authority, user, state);
        self.rows[user.index()][authority.column()] = state;
    }

    /// Reset all of a user's cells to Default
    pub fn reset_user(&mut self, user: UserId) {
        self.rows[user.index()] = [AuthorityState::Default; AUTHORITY_COLUMNS];
    }

    /// Resolve whether `user` holds `authority`
    ///
    /// Consults the requested cell and every broader type covering it. Any
    /// Deter denies; otherwise any Allow grants; otherwise denied.
    pub fn is_allowed(&self, user: UserId, authority: AuthorityType) -> bool {
        let mut allowed = false;

        for &ty in std::iter::once(&authority).chain(authority.covered_by()) {
            match self.evaluate(user, ty) {
                AuthorityState::Deter => return false,
                AuthorityState::Allow => allowed = true,
                AuthorityState::Default => {}
            }
        }

        allowed
    }

    /// True when a Deter in the covering chain blocks `authority`
    pub fn is_detered(&self, user: UserId, authority: AuthorityType) -> bool {
        std::iter::once(&authority)
            .chain(authority.covered_by())
            .any(|&ty| self.evaluate(user, ty) == AuthorityState::Deter)
    }

    /// Users whose raw cell for `authority` is Allow, ascending
    pub fn allowed_users(&self, authority: AuthorityType) -> Vec<UserId> {
        self.users_in_state(authority, AuthorityState::Allow)
    }

    /// Users whose raw cell for `authority` is Deter, ascending
    pub fn detered_users(&self, authority: AuthorityType) -> Vec<UserId> {
        self.users_in_state(authority, AuthorityState::Deter)
    }

    pub fn access_list(&self, authority: AuthorityType) -> AccessList {
        AccessList {
            authority,
            allowed: self.allowed_users(authority),
            detered: self.detered_users(authority),
        }
    }

    /// One byte per user, bit `t` set when column `t` is Allow
    pub fn allow_mask_bytes(&self) -> [u8; USER_TABLE_SIZE] {
        self.mask_bytes(AuthorityState::Allow)
    }

    /// One byte per user, bit `t` set when column `t` is Deter
    pub fn deter_mask_bytes(&self) -> [u8; USER_TABLE_SIZE] {
        self.mask_bytes(AuthorityState::Deter)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(|&cell| cell as u8))
            .collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != AUTHORITY_TABLE_LEN {
            return Err(TyfsError::Corrupt(format!(
                "authority table needs {} bytes, got {}",
                AUTHORITY_TABLE_LEN,
                bytes.len()
            )));
        }

        let mut table = Self::new();
        for (offset, &byte) in bytes.iter().enumerate() {
            let state = AuthorityState::from_u8(byte).ok_or_else(|| {
                TyfsError::Corrupt(format!(
                    "authority cell for user {} column {} holds 0x{:02x}",
                    offset / AUTHORITY_COLUMNS,
                    offset % AUTHORITY_COLUMNS,
                    byte
                ))
            })?;
            table.rows[offset / AUTHORITY_COLUMNS][offset % AUTHORITY_COLUMNS] = state;
        }

        Ok(table)
    }

    fn users_in_state(&self, authority: AuthorityType, state: AuthorityState) -> Vec<UserId> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row[authority.column()] == state)
            .map(|(user, _)| UserId(user as u8))
            .collect()
    }

    fn mask_bytes(&self, state: AuthorityState) -> [u8; USER_TABLE_SIZE] {
        let mut masks = [0u8; USER_TABLE_SIZE];
        for (mask, row) in masks.iter_mut().zip(self.rows.iter()) {
            for (column, &cell) in row.iter().enumerate() {
                if cell == state {
                    *mask |= 1 << column;
                }
            }
        }
        masks
    }
}

impl Default for FsAuthorityTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Describe for FsAuthorityTable {
    fn describe(&self) -> String {
        let explicit = self
            .rows
            .iter()
            .filter(|row| row.iter().any(|&c| c != AuthorityState::Default))
            .count();
        format!("authority table: {} of {} users with explicit cells", explicit, USER_TABLE_SIZE)
    }

    fn type_tag(&self) -> &'static str {
        "tyfs.authority_table"
    }

    fn content_hash(&self) -> u64 {
        hash_bytes(&self.to_bytes())
    }
}

//! Privileged hub operations issued by cogs through the `HUBOP` instruction.

use std::fmt;

/// Program address that selects the ROM bytecode interpreter in `COGINIT`.
pub const INTERPRETER_ENTRY: u32 = 0xF004;

/// `COGINIT` argument bit requesting the lowest free cog.
pub const COGINIT_NEW: u32 = 0x8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubOperation {
    ClkSet = 0,
    CogId = 1,
    CogInit = 2,
    CogStop = 3,
    LockNew = 4,
    LockRet = 5,
    LockSet = 6,
    LockClr = 7,
}

impl HubOperation {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(HubOperation::ClkSet),
            1 => Some(HubOperation::CogId),
            2 => Some(HubOperation::CogInit),
            3 => Some(HubOperation::CogStop),
            4 => Some(HubOperation::LockNew),
            5 => Some(HubOperation::LockRet),
            6 => Some(HubOperation::LockSet),
            7 => Some(HubOperation::LockClr),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        *self as u32
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            HubOperation::ClkSet => "CLKSET",
            HubOperation::CogId => "COGID",
            HubOperation::CogInit => "COGINIT",
            HubOperation::CogStop => "COGSTOP",
            HubOperation::LockNew => "LOCKNEW",
            HubOperation::LockRet => "LOCKRET",
            HubOperation::LockSet => "LOCKSET",
            HubOperation::LockClr => "LOCKCLR",
        }
    }
}

impl fmt::Display for HubOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Result word and carry produced by a hub operation.
///
/// `carry` is `None` for operations that leave the caller's carry flag as it
/// was: `CLKSET`, `COGID`, `COGSTOP` and `LOCKRET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubOpOutcome {
    pub result: u32,
    pub carry: Option<bool>,
}

impl HubOpOutcome {
    pub fn value(result: u32) -> Self {
        HubOpOutcome {
            result,
            carry: None,
        }
    }

    pub fn with_carry(result: u32, carry: bool) -> Self {
        HubOpOutcome {
            result,
            carry: Some(carry),
        }
    }

    /// Fold the outcome into a caller-held carry flag and return the result.
    pub fn apply(self, carry: &mut bool) -> u32 {
        if let Some(c) = self.carry {
            *carry = c;
        }
        self.result
    }
}

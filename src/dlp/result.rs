//! Status codes returned by the distribution service
//!
//! Every service call yields a raw 32-bit status. Bit 31 flags a failure; the
//! remaining fields follow the legacy layout:
//!
//! ```text
//!  31    27 26  21 20 18 17     10 9          0
//! ┌───────┬──────┬─────┬─────────┬────────────┐
//! │ level │ sum  │ res │ module  │ description│
//! └───────┴──────┴─────┴─────────┴────────────┘
//! ```

use std::fmt;

/// Convenience alias for service calls
pub type DlpResult<T> = Result<T, ResultCode>;

const FAILURE_BIT: u32 = 0x8000_0000;
const DESCRIPTION_MASK: u32 = 0x3FF;
const MODULE_SHIFT: u32 = 10;
const MODULE_MASK: u32 = 0xFF;
const SUMMARY_SHIFT: u32 = 21;
const SUMMARY_MASK: u32 = 0x3F;
const LEVEL_SHIFT: u32 = 27;
const LEVEL_MASK: u32 = 0x1F;

const DLP_MODULE: u32 = 0x94;
const DLP_LEVEL: u32 = 0x17;

const SUMMARY_WOULD_BLOCK: u32 = 2;
const SUMMARY_OUT_OF_RESOURCE: u32 = 3;
const SUMMARY_INVALID_STATE: u32 = 5;
const SUMMARY_INVALID_ARGUMENT: u32 = 7;

/// Raw service status
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(u32);

impl ResultCode {
    pub const SUCCESS: Self = Self(0);

    /// Returned by a non-blocking state poll when nothing changed
    pub const NOT_FOUND: Self = Self(0xBAB2_53FA);

    pub const NOT_INITIALIZED: Self = Self::dlp_failure(SUMMARY_INVALID_STATE, 1016);
    pub const ALREADY_INITIALIZED: Self = Self::dlp_failure(SUMMARY_INVALID_STATE, 1017);
    pub const INVALID_STATE: Self = Self::dlp_failure(SUMMARY_INVALID_STATE, 1003);
    pub const OUT_OF_RANGE: Self = Self::dlp_failure(SUMMARY_INVALID_ARGUMENT, 1021);
    pub const BUSY: Self = Self::dlp_failure(SUMMARY_WOULD_BLOCK, 1008);
    pub const TOO_MANY_CLIENTS: Self = Self::dlp_failure(SUMMARY_OUT_OF_RESOURCE, 1001);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    const fn dlp_failure(summary: u32, description: u32) -> Self {
        Self(
            (DLP_LEVEL << LEVEL_SHIFT)
                | ((summary & SUMMARY_MASK) << SUMMARY_SHIFT)
                | (DLP_MODULE << MODULE_SHIFT)
                | (description & DESCRIPTION_MASK),
        )
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_failure(self) -> bool {
        self.0 & FAILURE_BIT != 0
    }

    pub const fn is_success(self) -> bool {
        !self.is_failure()
    }

    pub const fn description(self) -> u32 {
        self.0 & DESCRIPTION_MASK
    }

    pub const fn module(self) -> u32 {
        (self.0 >> MODULE_SHIFT) & MODULE_MASK
    }

    pub const fn summary(self) -> u32 {
        (self.0 >> SUMMARY_SHIFT) & SUMMARY_MASK
    }

    pub const fn level(self) -> u32 {
        (self.0 >> LEVEL_SHIFT) & LEVEL_MASK
    }

    /// Turns a raw status into a `DlpResult`, keeping the success value
    pub fn into_result<T>(self, value: T) -> DlpResult<T> {
        if self.is_failure() {
            Err(self)
        } else {
            Ok(value)
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "res: {:08x}, desc: {}, sum: {}",
            self.0,
            self.description(),
            self.summary()
        )
    }
}

impl fmt::Debug for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultCode({:#010x})", self.0)
    }
}

impl std::error::Error for ResultCode {}

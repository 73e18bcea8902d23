/// Finisher: closes the last few points between the running value and the
/// target with fixed filler traits.

use crate::core::allocator::AllocationError;

/// A filler trait and the value it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filler {
    pub name: &'static str,
    pub cost: i32,
}

pub const SPEED_DEMON: Filler = Filler {
    name: "Speed Demon",
    cost: -1,
};
pub const GRACEFUL: Filler = Filler {
    name: "Graceful",
    cost: -2,
};
pub const SUNDAY_DRIVER: Filler = Filler {
    name: "Sunday Driver",
    cost: 1,
};
pub const COWARDLY: Filler = Filler {
    name: "Cowardly",
    cost: 2,
};

/// All fillers the finisher can emit.
pub const FILLERS: [Filler; 4] = [SPEED_DEMON, GRACEFUL, SUNDAY_DRIVER, COWARDLY];

/// Largest residual magnitude the finisher maps.
pub const MAX_RESIDUAL: i32 = 3;

/// Returns true if `name` is reserved for the finisher.
pub fn is_filler(name: &str) -> bool {
    FILLERS.iter().any(|f| f.name == name)
}

/// Map a residual (`target - running`) to the fillers that absorb it.
///
/// The fillers' costs always sum to `residual`.
pub fn resolve(residual: i32) -> Result<&'static [Filler], AllocationError> {
    match residual {
        -3 => Ok(&[SPEED_DEMON, GRACEFUL]),
        -2 => Ok(&[GRACEFUL]),
        -1 => Ok(&[SPEED_DEMON]),
        0 => Ok(&[]),
        1 => Ok(&[SUNDAY_DRIVER]),
        2 => Ok(&[COWARDLY]),
        3 => Ok(&[SUNDAY_DRIVER, COWARDLY]),
        other => Err(AllocationError::ResidualOutOfRange(other)),
    }
}

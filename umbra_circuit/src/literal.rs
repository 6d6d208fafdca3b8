use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/**
 * Represents a literal node's data.
 *
 * Literals appear in two roles: single-bit constants that lower to a
 * trivial encryption, and wider values that exist solely to index into
 * arrays.
 */
pub enum Literal {
    /**
     * An unsigned 64-bit integer.
     */
    U64(u64),
}

impl Literal {
    /**
     * The literal's value widened to a `u64`.
     */
    pub fn as_u64(&self) -> u64 {
        match self {
            Self::U64(x) => *x,
        }
    }

    /**
     * Whether every bit of the literal is zero.
     */
    pub fn is_zero(&self) -> bool {
        self.as_u64() == 0
    }
}

impl From<u64> for Literal {
    fn from(x: u64) -> Self {
        Self::U64(x)
    }
}

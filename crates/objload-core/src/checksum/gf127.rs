//! Arithmetic in GF(2^127) modulo x^127 + x^63 + 1

use std::ops::{Add, Mul};

const MASK: u128 = u128::MAX >> 1;
const REDUCTION: u128 = (1 << 63) | 1;

/// Field element; bit 127 is always clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Gf127(u128);

impl Gf127 {
    /// Additive identity
    pub const ZERO: Self = Self(0);
    /// Multiplicative identity
    pub const ONE: Self = Self(1);
    /// The polynomial `x`
    pub const X: Self = Self(2);

    /// Element from its big-endian encoding; `None` if bit 127 is set
    pub fn from_be_bytes(bytes: [u8; 16]) -> Option<Self> {
        let v = u128::from_be_bytes(bytes);
        (v & !MASK == 0).then_some(Self(v))
    }

    /// Big-endian encoding
    pub fn to_be_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Multiply by `x`
    #[inline]
    pub fn mul_x(self) -> Self {
        let carry = (self.0 >> 126) & 1;
        let mut v = (self.0 << 1) & MASK;
        if carry == 1 {
            v ^= REDUCTION;
        }
        Self(v)
    }
}

impl Add for Gf127 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Mul for Gf127 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut acc = 0u128;
        let mut a = self;
        for i in 0..127 {
            if (rhs.0 >> i) & 1 == 1 {
                acc ^= a.0;
            }
            a = a.mul_x();
        }
        Self(acc)
    }
}

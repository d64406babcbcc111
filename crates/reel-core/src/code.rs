//! OWAS posture classification codes
//!
//! An OWAS code labels a working posture with three independent factors:
//! - Back: 1-4
//! - Arms: 1-3
//! - Legs: 1-7
//!
//! The familiar three-digit number (e.g. 215) is only a presentation of the
//! three factors; the factors themselves are what gets stored.

use std::fmt;
use std::str::FromStr;

use crate::{ReelError, ReelResult};

/// One factor of an OWAS code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OwasFactor {
    Back,
    Arms,
    Legs,
}

impl OwasFactor {
    /// All factors in code order
    pub fn all() -> &'static [OwasFactor] {
        &[OwasFactor::Back, OwasFactor::Arms, OwasFactor::Legs]
    }

    /// Highest valid value for this factor
    #[inline]
    pub fn max(self) -> u8 {
        match self {
            OwasFactor::Back => 4,
            OwasFactor::Arms => 3,
            OwasFactor::Legs => 7,
        }
    }

    #[inline]
    pub fn is_valid(self, value: u8) -> bool {
        (1..=self.max()).contains(&value)
    }

    pub fn name(self) -> &'static str {
        match self {
            OwasFactor::Back => "back",
            OwasFactor::Arms => "arms",
            OwasFactor::Legs => "legs",
        }
    }
}

impl fmt::Display for OwasFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Composite OWAS code. Only constructible with in-range factors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwasCode {
    back: u8,
    arms: u8,
    legs: u8,
}

impl OwasCode {
    pub fn new(back: u8, arms: u8, legs: u8) -> ReelResult<Self> {
        for (factor, value) in OwasFactor::all().iter().zip([back, arms, legs]) {
            if !factor.is_valid(value) {
                return Err(ReelError::InvalidCode {
                    factor: *factor,
                    value,
                });
            }
        }
        Ok(OwasCode { back, arms, legs })
    }

    #[inline]
    pub fn back(&self) -> u8 {
        self.back
    }

    #[inline]
    pub fn arms(&self) -> u8 {
        self.arms
    }

    #[inline]
    pub fn legs(&self) -> u8 {
        self.legs
    }

    #[inline]
    pub fn factor(&self, factor: OwasFactor) -> u8 {
        match factor {
            OwasFactor::Back => self.back,
            OwasFactor::Arms => self.arms,
            OwasFactor::Legs => self.legs,
        }
    }

    /// Three-digit presentation, e.g. 215
    #[inline]
    pub fn as_number(&self) -> u16 {
        self.back as u16 * 100 + self.arms as u16 * 10 + self.legs as u16
    }

    /// Inverse of [`OwasCode::as_number`]
    pub fn from_number(number: u16) -> ReelResult<Self> {
        if !(100..1000).contains(&number) {
            return Err(ReelError::MalformedCode(number.to_string()));
        }
        OwasCode::new(
            (number / 100) as u8,
            ((number / 10) % 10) as u8,
            (number % 10) as u8,
        )
    }
}

impl fmt::Display for OwasCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.back, self.arms, self.legs)
    }
}

impl FromStr for OwasCode {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<u8> = s
            .trim()
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(|| ReelError::MalformedCode(s.to_string()))?;

        match digits.as_slice() {
            [back, arms, legs] => OwasCode::new(*back, *arms, *legs),
            _ => Err(ReelError::MalformedCode(s.to_string())),
        }
    }
}

//! Named physical units and the code-to-physical scale table
//!
//! Every output stores values in code units. [`UnitScaleTable`] maps each named [`Unit`]
//! to a multiplicative factor with the convention
//!
//! ```text
//! physical_value = code_value * scale[unit]
//! ```
//!
//! Base factors come straight from the five conversion scalars of the output; composite
//! units are layered multiplicatively on the base factors (`Msun/pc³ = Msun / pc³`), so
//! changing one base constant changes every dependent unit consistently.
//!
//! # Usage
//! ```
//! use amrscope_core::core_types::metadata::UnitConversions;
//! use amrscope_core::core_types::units::{Unit, UnitScaleTable};
//!
//! // One code length unit is one kiloparsec
//! let units = UnitConversions::from_ldt(3.0856775814913673e21, 1.0e-24, 3.0e15);
//! let scale = UnitScaleTable::build(&units);
//! assert!((scale.get(Unit::Kpc) - 1.0).abs() < 1e-12);
//! assert_eq!(scale.get(Unit::Pc), 1000.0 * scale.get(Unit::Kpc));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core_types::metadata::UnitConversions;
use crate::error::Error;

// ============================================================================
// PHYSICAL CONSTANTS (cgs)
// ============================================================================

/// Kiloparsec in centimetres (IAU 2015)
pub const KPC_CM: f64 = 3.0856775814913673e21;
/// Light year in centimetres
pub const LY_CM: f64 = 9.4607304725808e17;
/// Astronomical unit in centimetres
pub const AU_CM: f64 = 1.495978707e13;
/// Solar mass in grams
pub const MSUN_G: f64 = 1.98847e33;
/// Julian year in seconds
pub const YR_S: f64 = 3.15576e7;
/// Hydrogen atom mass in grams
pub const M_H_G: f64 = 1.6735575e-24;

// ============================================================================
// UNITS
// ============================================================================

/// Physical dimension of a [`Unit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Code units; the factor is 1
    Code,
    /// Length
    Length,
    /// Mass
    Mass,
    /// Time
    Time,
    /// Velocity
    Velocity,
    /// Mass density
    Density,
    /// Number density
    NumberDensity,
    /// Pressure
    Pressure,
    /// Energy
    Energy,
    /// Mass per time
    MassRate,
}

impl Dimension {
    /// Dimension of a known stored variable; `None` for dimensionless or unrecognized names
    pub fn of_variable(name: &str) -> Option<Self> {
        match name {
            "rho" | "rho-" | "rho+" | "rho_av" => Some(Dimension::Density),
            "vx" | "vy" | "vz" => Some(Dimension::Velocity),
            "p" => Some(Dimension::Pressure),
            "mass" | "mass_cl" => Some(Dimension::Mass),
            "birth" => Some(Dimension::Time),
            "peak_x" | "peak_y" | "peak_z" => Some(Dimension::Length),
            _ => None,
        }
    }

    /// Whether values of this dimension can be expressed in `unit`
    pub fn accepts(self, unit: Unit) -> bool {
        match (self, unit.dimension()) {
            (_, Dimension::Code) => true,
            (Dimension::Density, Dimension::NumberDensity) => true,
            (expected, found) => expected == found,
        }
    }
}

/// Named unit understood by the scale table
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Unit {
    /// Code units. For spatial ranges this means fractions of the box, `[0, 1]`.
    #[default]
    Standard,
    /// Megaparsec
    Mpc,
    /// Kiloparsec
    Kpc,
    /// Parsec
    Pc,
    /// Light year
    Ly,
    /// Astronomical unit
    Au,
    /// Kilometre
    Km,
    /// Metre
    M,
    /// Centimetre
    Cm,
    /// Gram
    G,
    /// Kilogram
    Kg,
    /// Solar mass
    Msun,
    /// Second
    S,
    /// Year
    Yr,
    /// Megayear
    Myr,
    /// Gigayear
    Gyr,
    /// cm/s
    CmPerS,
    /// m/s
    MPerS,
    /// km/s
    KmPerS,
    /// g/cm³
    GPerCm3,
    /// Msun/pc³
    MsunPerPc3,
    /// Hydrogen atoms per cm³
    HPerCc,
    /// Barye (g cm⁻¹ s⁻²)
    Barye,
    /// Erg
    Erg,
    /// Msun/yr
    MsunPerYr,
}

impl Unit {
    /// Every unit in the table
    pub const ALL: [Unit; 25] = [
        Unit::Standard,
        Unit::Mpc,
        Unit::Kpc,
        Unit::Pc,
        Unit::Ly,
        Unit::Au,
        Unit::Km,
        Unit::M,
        Unit::Cm,
        Unit::G,
        Unit::Kg,
        Unit::Msun,
        Unit::S,
        Unit::Yr,
        Unit::Myr,
        Unit::Gyr,
        Unit::CmPerS,
        Unit::MPerS,
        Unit::KmPerS,
        Unit::GPerCm3,
        Unit::MsunPerPc3,
        Unit::HPerCc,
        Unit::Barye,
        Unit::Erg,
        Unit::MsunPerYr,
    ];

    /// Physical dimension of this unit
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Standard => Dimension::Code,
            Unit::Mpc
            | Unit::Kpc
            | Unit::Pc
            | Unit::Ly
            | Unit::Au
            | Unit::Km
            | Unit::M
            | Unit::Cm => Dimension::Length,
            Unit::G | Unit::Kg | Unit::Msun => Dimension::Mass,
            Unit::S | Unit::Yr | Unit::Myr | Unit::Gyr => Dimension::Time,
            Unit::CmPerS | Unit::MPerS | Unit::KmPerS => Dimension::Velocity,
            Unit::GPerCm3 | Unit::MsunPerPc3 => Dimension::Density,
            Unit::HPerCc => Dimension::NumberDensity,
            Unit::Barye => Dimension::Pressure,
            Unit::Erg => Dimension::Energy,
            Unit::MsunPerYr => Dimension::MassRate,
        }
    }

    /// Whether the unit can express a spatial coordinate or extent
    pub fn is_spatial(self) -> bool {
        matches!(self.dimension(), Dimension::Code | Dimension::Length)
    }

    /// Canonical symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Standard => "standard",
            Unit::Mpc => "Mpc",
            Unit::Kpc => "kpc",
            Unit::Pc => "pc",
            Unit::Ly => "ly",
            Unit::Au => "au",
            Unit::Km => "km",
            Unit::M => "m",
            Unit::Cm => "cm",
            Unit::G => "g",
            Unit::Kg => "kg",
            Unit::Msun => "Msun",
            Unit::S => "s",
            Unit::Yr => "yr",
            Unit::Myr => "Myr",
            Unit::Gyr => "Gyr",
            Unit::CmPerS => "cm/s",
            Unit::MPerS => "m/s",
            Unit::KmPerS => "km/s",
            Unit::GPerCm3 => "g/cm^3",
            Unit::MsunPerPc3 => "Msun/pc^3",
            Unit::HPerCc => "H/cc",
            Unit::Barye => "Ba",
            Unit::Erg => "erg",
            Unit::MsunPerYr => "Msun/yr",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = Error;

    /// Parse a unit symbol. Accepts the canonical symbol and the underscore
    /// spellings used in analysis scripts (`km_s`, `Msol_pc3`, `g_cm3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim() {
            "standard" | "code" => Unit::Standard,
            "Mpc" => Unit::Mpc,
            "kpc" => Unit::Kpc,
            "pc" => Unit::Pc,
            "ly" => Unit::Ly,
            "au" | "Au" | "AU" => Unit::Au,
            "km" => Unit::Km,
            "m" => Unit::M,
            "cm" => Unit::Cm,
            "g" => Unit::G,
            "kg" => Unit::Kg,
            "Msun" | "Msol" => Unit::Msun,
            "s" => Unit::S,
            "yr" => Unit::Yr,
            "Myr" => Unit::Myr,
            "Gyr" => Unit::Gyr,
            "cm/s" | "cm_s" => Unit::CmPerS,
            "m/s" | "m_s" => Unit::MPerS,
            "km/s" | "km_s" => Unit::KmPerS,
            "g/cm^3" | "g/cm3" | "g_cm3" => Unit::GPerCm3,
            "Msun/pc^3" | "Msun/pc3" | "Msun_pc3" | "Msol_pc3" => Unit::MsunPerPc3,
            "H/cc" | "nH" | "cm-3" => Unit::HPerCc,
            "Ba" | "g_cms2" => Unit::Barye,
            "erg" => Unit::Erg,
            "Msun/yr" | "Msun_yr" | "Msol_yr" => Unit::MsunPerYr,
            other => return Err(Error::UnknownUnit(other.to_string())),
        };
        Ok(unit)
    }
}

// ============================================================================
// SCALE TABLE
// ============================================================================

/// Fixed mapping from unit to code-to-physical factor
///
/// Built once per output and shared read-only (typically behind an `Arc`) by every
/// dataset loaded from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitScaleTable {
    factors: FxHashMap<Unit, f64>,
}

impl UnitScaleTable {
    /// Derive every factor from the output's conversion scalars
    ///
    /// Pure and total: malformed scalars give meaningless factors, never a panic.
    #[must_use]
    pub fn build(units: &UnitConversions) -> Self {
        let kpc = units.length / KPC_CM;
        let pc = kpc * 1000.0;
        let cm = units.length;
        let g = units.mass;
        let msun = units.mass / MSUN_G;
        let s = units.time;
        let yr = units.time / YR_S;
        let cm_s = units.velocity;

        let entries = [
            (Unit::Standard, 1.0),
            (Unit::Mpc, kpc / 1000.0),
            (Unit::Kpc, kpc),
            (Unit::Pc, pc),
            (Unit::Ly, cm / LY_CM),
            (Unit::Au, cm / AU_CM),
            (Unit::Km, cm / 1.0e5),
            (Unit::M, cm / 100.0),
            (Unit::Cm, cm),
            (Unit::G, g),
            (Unit::Kg, g / 1000.0),
            (Unit::Msun, msun),
            (Unit::S, s),
            (Unit::Yr, yr),
            (Unit::Myr, yr / 1.0e6),
            (Unit::Gyr, yr / 1.0e9),
            (Unit::CmPerS, cm_s),
            (Unit::MPerS, cm_s / 100.0),
            (Unit::KmPerS, cm_s / 1.0e5),
            (Unit::GPerCm3, units.density),
            (Unit::MsunPerPc3, msun / pc.powi(3)),
            (Unit::HPerCc, units.density / M_H_G),
            (Unit::Barye, units.density * cm_s * cm_s),
            (Unit::Erg, g * cm_s * cm_s),
            (Unit::MsunPerYr, msun / yr),
        ];

        let mut factors = FxHashMap::default();
        factors.reserve(entries.len());
        for (unit, factor) in entries {
            factors.insert(unit, factor);
        }
        Self { factors }
    }

    /// Factor for `unit`
    #[inline]
    pub fn get(&self, unit: Unit) -> f64 {
        // Every variant is inserted by `build`
        self.factors.get(&unit).copied().unwrap_or(1.0)
    }

    /// Convert a code-unit value to `unit`
    #[inline]
    pub fn to_physical(&self, code_value: f64, unit: Unit) -> f64 {
        code_value * self.get(unit)
    }

    /// Convert a value in `unit` back to code units
    #[inline]
    pub fn to_code(&self, physical_value: f64, unit: Unit) -> f64 {
        physical_value / self.get(unit)
    }

    /// Iterate over all `(unit, factor)` pairs in [`Unit::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (Unit, f64)> + '_ {
        Unit::ALL.iter().map(move |&u| (u, self.get(u)))
    }
}

//! MIPS32 general-purpose registers.

extern crate alloc;

use core::fmt;

/// MIPS32 general-purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(u8);

impl Reg {
    /// Create a new register from its number (0-31).
    ///
    /// # Panics
    ///
    /// Panics if the register number is >= 32.
    pub fn new(num: u8) -> Self {
        assert!(num < 32, "Register number must be < 32");
        Self(num)
    }

    /// Get the register number (0-31).
    pub fn num(&self) -> u8 {
        self.0
    }
}

// Named registers for the modeled machine: the zero register, the return
// value register, four argument registers, the stack pointer, the return
// address register, and the temporary pool t0-t9 (t8/t9 are reserved as
// allocator scratch).
impl Reg {
    // $0: hardwired zero
    pub const ZERO: Reg = Reg(0);
    // $2: return value
    pub const V0: Reg = Reg(2);
    // $4-$7: arguments
    pub const A0: Reg = Reg(4);
    pub const A1: Reg = Reg(5);
    pub const A2: Reg = Reg(6);
    pub const A3: Reg = Reg(7);
    // $8-$15: temporaries t0-t7 (the allocatable pool)
    pub const T0: Reg = Reg(8);
    pub const T1: Reg = Reg(9);
    pub const T2: Reg = Reg(10);
    pub const T3: Reg = Reg(11);
    pub const T4: Reg = Reg(12);
    pub const T5: Reg = Reg(13);
    pub const T6: Reg = Reg(14);
    pub const T7: Reg = Reg(15);
    // $24-$25: temporaries t8-t9 (allocator scratch)
    pub const T8: Reg = Reg(24);
    pub const T9: Reg = Reg(25);
    // $29: stack pointer
    pub const SP: Reg = Reg(29);
    // $31: return address
    pub const RA: Reg = Reg(31);

    /// Parse a register name (with or without the `$` sigil) into a `Reg`.
    ///
    /// Supports the canonical MIPS names (`zero`, `v0`, `a0`-`a3`,
    /// `t0`-`t9`, `sp`, `ra`, ...) and numeric names (`$0`-`$31`).
    ///
    /// # Errors
    ///
    /// Returns an error string if the register name is invalid.
    pub fn from_name(name: &str) -> Result<Self, alloc::string::String> {
        let name = name.strip_prefix('$').unwrap_or(name);
        match name {
            "zero" => Ok(Reg::ZERO),
            "at" => Ok(Reg(1)),
            "v0" => Ok(Reg::V0),
            "v1" => Ok(Reg(3)),
            "a0" => Ok(Reg::A0),
            "a1" => Ok(Reg::A1),
            "a2" => Ok(Reg::A2),
            "a3" => Ok(Reg::A3),
            "t0" => Ok(Reg::T0),
            "t1" => Ok(Reg::T1),
            "t2" => Ok(Reg::T2),
            "t3" => Ok(Reg::T3),
            "t4" => Ok(Reg::T4),
            "t5" => Ok(Reg::T5),
            "t6" => Ok(Reg::T6),
            "t7" => Ok(Reg::T7),
            "s0" => Ok(Reg(16)),
            "s1" => Ok(Reg(17)),
            "s2" => Ok(Reg(18)),
            "s3" => Ok(Reg(19)),
            "s4" => Ok(Reg(20)),
            "s5" => Ok(Reg(21)),
            "s6" => Ok(Reg(22)),
            "s7" => Ok(Reg(23)),
            "t8" => Ok(Reg::T8),
            "t9" => Ok(Reg::T9),
            "k0" => Ok(Reg(26)),
            "k1" => Ok(Reg(27)),
            "gp" => Ok(Reg(28)),
            "sp" => Ok(Reg::SP),
            "fp" => Ok(Reg(30)),
            "ra" => Ok(Reg::RA),
            _ => {
                if let Ok(num) = name.parse::<u8>() {
                    if num < 32 {
                        return Ok(Reg::new(num));
                    }
                }
                Err(alloc::format!("Invalid register name: {}", name))
            }
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "zero",
            1 => "at",
            2 => "v0",
            3 => "v1",
            4 => "a0",
            5 => "a1",
            6 => "a2",
            7 => "a3",
            8 => "t0",
            9 => "t1",
            10 => "t2",
            11 => "t3",
            12 => "t4",
            13 => "t5",
            14 => "t6",
            15 => "t7",
            16 => "s0",
            17 => "s1",
            18 => "s2",
            19 => "s3",
            20 => "s4",
            21 => "s5",
            22 => "s6",
            23 => "s7",
            24 => "t8",
            25 => "t9",
            26 => "k0",
            27 => "k1",
            28 => "gp",
            29 => "sp",
            30 => "fp",
            31 => "ra",
            _ => unreachable!(),
        };
        write!(f, "${}", name)
    }
}

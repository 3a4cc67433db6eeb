//! Static table of known LED resources.
//!
//! | label      | mask (bit) |
//! |------------|------------|
//! | `ledred`   | 27         |
//! | `ledgreen` | 22         |
//! | `ledblue`  | 26         |

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Identifying bit of each LED, as laid out on the GPIO port.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceMask: u32 {
        /// Red LED
        const RED = 1 << (27 % 32);
        /// Green LED
        const GREEN = 1 << (22 % 32);
        /// Blue LED
        const BLUE = 1 << (26 % 32);
    }
}

/// A known LED resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `ledred`
    Red,
    /// `ledgreen`
    Green,
    /// `ledblue`
    Blue,
}

impl ResourceKind {
    /// All known resources, in table order.
    pub const ALL: [ResourceKind; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Look up a label. Returns `None` for unrecognised labels.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }

    /// The configuration label of this resource.
    pub fn label(self) -> &'static str {
        match self {
            Self::Red => "ledred",
            Self::Green => "ledgreen",
            Self::Blue => "ledblue",
        }
    }

    /// The identifying mask bit.
    pub fn mask(self) -> ResourceMask {
        match self {
            Self::Red => ResourceMask::RED,
            Self::Green => ResourceMask::GREEN,
            Self::Blue => ResourceMask::BLUE,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

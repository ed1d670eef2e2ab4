//! Dual carriage selection state.

use heapless::String;

use crate::error::name;

/// One of the two X carriages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Carriage {
    /// Carriage on the `stepper_x` rail.
    #[default]
    First,
    /// Carriage on the `dual_carriage` rail.
    Second,
}

/// Which of two X carriages currently follows the toolhead.
///
/// Switching is done by the owner of the carriages; topologies only read
/// [`DualCarriages::active_carriage`].
#[derive(Debug, Clone)]
pub struct DualCarriages {
    rails: [String<32>; 2],
    active: Carriage,
}

impl DualCarriages {
    /// Track two carriage rails with the first one active.
    pub fn new(first_rail: &str, second_rail: &str) -> Self {
        Self {
            rails: [name(first_rail), name(second_rail)],
            active: Carriage::First,
        }
    }

    /// Currently active carriage.
    #[inline]
    pub fn active_carriage(&self) -> Carriage {
        self.active
    }

    /// Make `carriage` the active one.
    pub fn set_active(&mut self, carriage: Carriage) {
        if carriage != self.active {
            tracing::info!(?carriage, "active carriage changed");
        }
        self.active = carriage;
    }

    /// Rail driving `carriage`.
    pub fn carriage_rail(&self, carriage: Carriage) -> &str {
        match carriage {
            Carriage::First => self.rails[0].as_str(),
            Carriage::Second => self.rails[1].as_str(),
        }
    }

    /// Rail driving the active carriage.
    pub fn active_rail(&self) -> &str {
        self.carriage_rail(self.active)
    }
}

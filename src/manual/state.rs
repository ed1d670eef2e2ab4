//! Manual axis states.

/// What a manual axis is currently doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisState {
    /// Ready for commands.
    #[default]
    Idle,
    /// A homing move is in progress.
    Homing,
}

impl AxisState {
    /// State name for display/debugging.
    pub fn name(self) -> &'static str {
        match self {
            AxisState::Idle => "Idle",
            AxisState::Homing => "Homing",
        }
    }
}

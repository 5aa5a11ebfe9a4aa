/// One of the three parallel signal paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    Mid,
    High,
}

impl Band {
    pub const COUNT: usize = 3;
    pub const ALL: [Band; Band::COUNT] = [Band::Low, Band::Mid, Band::High];

    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Mid => 1,
            Self::High => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Mid => "Mid",
            Self::High => "High",
        }
    }
}

/// The three per-band toggle buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandButton {
    Solo,
    Mute,
    Bypass,
}

/// Solo/mute/bypass state of a band
///
/// The three toggles are mutually exclusive, so a band is in exactly one of these modes and
/// "soloed and muted at once" cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandMode {
    #[default]
    Normal,
    Soloed,
    Muted,
    Bypassed,
}

impl BandMode {
    /// Fold the three host-visible flags into a mode
    ///
    /// Automation can set several flags at once. Solo wins over mute, mute over bypass.
    pub fn from_flags(solo: bool, mute: bool, bypassed: bool) -> Self {
        match (solo, mute, bypassed) {
            (true, _, _) => Self::Soloed,
            (false, true, _) => Self::Muted,
            (false, false, true) => Self::Bypassed,
            (false, false, false) => Self::Normal,
        }
    }

    /// `(solo, mute, bypassed)` flags for this mode
    pub fn flags(self) -> (bool, bool, bool) {
        match self {
            Self::Normal => (false, false, false),
            Self::Soloed => (true, false, false),
            Self::Muted => (false, true, false),
            Self::Bypassed => (false, false, true),
        }
    }

    /// Transition table for a button press
    ///
    /// Pressing the button of the active mode releases it, pressing any other button switches
    /// to that button's mode and releases the others.
    pub fn press(self, button: BandButton) -> Self {
        match (self, button) {
            (Self::Soloed, BandButton::Solo)
            | (Self::Muted, BandButton::Mute)
            | (Self::Bypassed, BandButton::Bypass) => Self::Normal,
            (_, BandButton::Solo) => Self::Soloed,
            (_, BandButton::Mute) => Self::Muted,
            (_, BandButton::Bypass) => Self::Bypassed,
        }
    }

    pub fn is_soloed(self) -> bool {
        self == Self::Soloed
    }

    pub fn is_muted(self) -> bool {
        self == Self::Muted
    }

    pub fn is_bypassed(self) -> bool {
        self == Self::Bypassed
    }

    /// Attack/release/threshold/ratio have no audible effect while muted or bypassed
    pub fn controls_enabled(self) -> bool {
        !matches!(self, Self::Muted | Self::Bypassed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressing_a_button_releases_the_others() {
        let mode = BandMode::Normal.press(BandButton::Mute);
        assert_eq!(mode, BandMode::Muted);

        let mode = mode.press(BandButton::Solo);
        assert_eq!(mode, BandMode::Soloed);
        assert_eq!(mode.flags(), (true, false, false));

        let mode = mode.press(BandButton::Bypass);
        assert_eq!(mode, BandMode::Bypassed);
        assert_eq!(mode.flags(), (false, false, true));
    }

    #[test]
    fn pressing_the_active_button_returns_to_normal() {
        for button in [BandButton::Solo, BandButton::Mute, BandButton::Bypass] {
            let mode = BandMode::Normal.press(button);
            assert_ne!(mode, BandMode::Normal);
            assert_eq!(mode.press(button), BandMode::Normal);
        }
    }

    #[test]
    fn conflicting_flags_resolve_by_precedence() {
        assert_eq!(BandMode::from_flags(true, true, true), BandMode::Soloed);
        assert_eq!(BandMode::from_flags(false, true, true), BandMode::Muted);
        assert_eq!(BandMode::from_flags(false, false, true), BandMode::Bypassed);
        assert_eq!(BandMode::from_flags(false, false, false), BandMode::Normal);
    }

    #[test]
    fn flags_round_trip_through_modes() {
        for mode in [BandMode::Normal, BandMode::Soloed, BandMode::Muted, BandMode::Bypassed] {
            let (solo, mute, bypassed) = mode.flags();
            assert_eq!(BandMode::from_flags(solo, mute, bypassed), mode);
        }
    }

    #[test]
    fn controls_are_disabled_when_band_is_silent_or_bypassed() {
        assert!(BandMode::Normal.controls_enabled());
        assert!(BandMode::Soloed.controls_enabled());
        assert!(!BandMode::Muted.controls_enabled());
        assert!(!BandMode::Bypassed.controls_enabled());
    }
}

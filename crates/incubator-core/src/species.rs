//! Fixed species → incubation length lookup.

use crate::types::Species;

/// Cycle length used for unlisted species when no usable override is given.
pub const FALLBACK_CYCLE_DAYS: u32 = 28;

/// Incubation length in days for the listed species, `None` for `Other`.
pub fn catalog_days(species: Species) -> Option<u32> {
    match species {
        Species::Poule => Some(21),
        Species::Canne => Some(28),
        Species::Oie => Some(30),
        Species::Caille => Some(18),
        Species::Other => None,
    }
}

/// Resolve the cycle length for `species`.
///
/// Listed species always use the catalog value. For anything else the
/// caller's `override_days` (the operator's `timetoclose`) applies when it is
/// positive, otherwise [`FALLBACK_CYCLE_DAYS`].
pub fn resolve_cycle_length(species: Species, override_days: Option<i64>) -> u32 {
    if let Some(days) = catalog_days(species) {
        return days;
    }
    override_days
        .filter(|d| *d > 0)
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(FALLBACK_CYCLE_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_species_use_catalog() {
        assert_eq!(resolve_cycle_length(Species::Poule, None), 21);
        assert_eq!(resolve_cycle_length(Species::Canne, None), 28);
        assert_eq!(resolve_cycle_length(Species::Oie, None), 30);
        assert_eq!(resolve_cycle_length(Species::Caille, None), 18);
    }

    #[test]
    fn listed_species_ignore_override() {
        assert_eq!(resolve_cycle_length(Species::Caille, Some(40)), 18);
    }

    #[test]
    fn other_uses_positive_override() {
        assert_eq!(resolve_cycle_length(Species::Other, Some(24)), 24);
    }

    #[test]
    fn other_falls_back_when_override_absent_or_non_positive() {
        assert_eq!(resolve_cycle_length(Species::Other, None), 28);
        assert_eq!(resolve_cycle_length(Species::Other, Some(0)), 28);
        assert_eq!(resolve_cycle_length(Species::Other, Some(-5)), 28);
    }

    #[test]
    fn unknown_string_resolves_through_other() {
        assert_eq!(resolve_cycle_length(Species::parse("pintade"), Some(26)), 26);
    }
}

// ── Free-slot reconciliation ──

use std::collections::HashSet;

use crate::model::{FreeSlot, PortCoordinate};

/// Slots in `1..=universe` the device did not report, ascending.
///
/// The membership set is rebuilt on every call; ids outside the universe
/// are ignored.
pub fn free_slots(
    port: PortCoordinate,
    discovered: impl IntoIterator<Item = u32>,
    universe: u32,
) -> Vec<FreeSlot> {
    let taken: HashSet<u32> = discovered.into_iter().collect();
    (1..=universe)
        .filter(|id| !taken.contains(id))
        .map(|id| port.terminal(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SLOTS_PER_PORT;
    use pretty_assertions::assert_eq;

    const PORT: PortCoordinate = PortCoordinate::new(1, 1);

    fn ids(slots: &[FreeSlot]) -> Vec<u32> {
        slots.iter().map(|s| s.onu_id).collect()
    }

    #[test]
    fn excludes_exactly_the_discovered_ids() {
        let free = free_slots(PORT, [3, 7, 10], SLOTS_PER_PORT);
        assert_eq!(free.len(), 125);
        let free_ids = ids(&free);
        for taken in [3, 7, 10] {
            assert!(!free_ids.contains(&taken));
        }
        assert_eq!(free_ids[..4], [1, 2, 4, 5]);
        assert!(free.iter().all(|s| s.board == 1 && s.pon == 1));
    }

    #[test]
    fn union_is_the_universe_and_sets_are_disjoint() {
        let discovered: Vec<u32> = (1..=SLOTS_PER_PORT).filter(|i| i % 3 == 0 || i % 7 == 0).collect();
        let free = ids(&free_slots(PORT, discovered.iter().copied(), SLOTS_PER_PORT));

        assert!(free.iter().all(|id| !discovered.contains(id)));
        let mut union: Vec<u32> = free.iter().chain(&discovered).copied().collect();
        union.sort_unstable();
        assert_eq!(union, (1..=SLOTS_PER_PORT).collect::<Vec<_>>());
    }

    #[test]
    fn strictly_ascending_even_with_duplicate_input() {
        let free = ids(&free_slots(PORT, [9, 2, 9, 2, 200], SLOTS_PER_PORT));
        assert!(free.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(free.len(), 126);
    }

    #[test]
    fn empty_and_full_ports() {
        assert_eq!(free_slots(PORT, [], SLOTS_PER_PORT).len(), 128);
        assert!(free_slots(PORT, 1..=SLOTS_PER_PORT, SLOTS_PER_PORT).is_empty());
    }
}

//! Port allocation
//!
//! A bot's window is a pure function of its slot and the stack's base port.
//! Allocation picks the lowest slot not held by a live entry, so destroying
//! a bot frees its slot for the next creation without a separate ledger.

use botfleet_types::{PortAssignment, Registry};

/// Allocate the lowest free slot against the current registry.
///
/// Never fails: the slot space is unbounded.
pub fn allocate(registry: &Registry) -> PortAssignment {
    let used = registry.used_slots();
    let mut slot = 0;
    while used.contains(&slot) {
        slot += 1;
    }
    PortAssignment::for_slot(registry.stack.base_port, slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use botfleet_types::BotEntry;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn add(registry: &mut Registry, name: &str) -> PortAssignment {
        let ports = allocate(registry);
        registry.add(BotEntry::new(
            name,
            "anthropic",
            "",
            ports,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        ));
        ports
    }

    #[test]
    fn test_first_allocation() {
        let mut registry = Registry::default();
        let nova = add(&mut registry, "nova");
        assert_eq!(nova.slot, 0);
        assert_eq!(nova.gateway_port, 19000);
        assert_eq!(nova.dev_port_start, 19001);
        assert_eq!(nova.dev_port_end, 19009);

        let echo = add(&mut registry, "echo");
        assert_eq!(echo.slot, 1);
        assert_eq!(echo.gateway_port, 19010);
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let mut registry = Registry::default();
        add(&mut registry, "nova");
        add(&mut registry, "echo");
        registry.remove("nova");

        let atlas = add(&mut registry, "atlas");
        assert_eq!(atlas.slot, 0);
        assert_eq!(atlas.gateway_port, 19000);
    }

    #[test]
    fn test_respects_base_port() {
        let mut registry = Registry::default();
        registry.stack.base_port = 30000;
        assert_eq!(allocate(&registry).gateway_port, 30000);
    }

    proptest! {
        #[test]
        fn prop_windows_are_disjoint(ops in proptest::collection::vec(any::<Option<u8>>(), 1..40)) {
            let mut registry = Registry::default();
            let mut counter = 0u32;
            for op in ops {
                match op {
                    // Some(i): destroy the i-th live bot (if any)
                    Some(i) if !registry.bots.is_empty() => {
                        let idx = i as usize % registry.bots.len();
                        let name = registry.bots[idx].name.clone();
                        registry.remove(&name);
                    }
                    _ => {
                        counter += 1;
                        add(&mut registry, &format!("bot{}", counter));
                    }
                }
            }

            let windows: Vec<PortAssignment> = registry.bots.iter().map(|b| b.ports()).collect();
            for (i, a) in windows.iter().enumerate() {
                prop_assert_eq!(a.window().count(), 10);
                for b in windows.iter().skip(i + 1) {
                    prop_assert!(!a.overlaps(b));
                }
            }
        }
    }
}

//! Port windows derived from a slot index

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Width of every bot's port window
pub const RANGE_SIZE: u32 = 10;

/// A bot's slot-aligned port window: gateway port followed by nine dev ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortAssignment {
    pub slot: u32,
    pub gateway_port: u32,
    pub dev_port_start: u32,
    pub dev_port_end: u32,
}

impl PortAssignment {
    /// Window for `slot` given the stack's base port
    pub fn for_slot(base_port: u32, slot: u32) -> Self {
        let range_start = base_port + slot * RANGE_SIZE;
        Self {
            slot,
            gateway_port: range_start,
            dev_port_start: range_start + 1,
            dev_port_end: range_start + RANGE_SIZE - 1,
        }
    }

    /// Every port in the window, gateway included
    pub fn window(&self) -> RangeInclusive<u32> {
        self.gateway_port..=self.dev_port_end
    }

    /// Dev ports mapped host-port-equal-to-container-port
    pub fn dev_ports(&self) -> RangeInclusive<u32> {
        self.dev_port_start..=self.dev_port_end
    }

    pub fn overlaps(&self, other: &PortAssignment) -> bool {
        self.gateway_port <= other.dev_port_end && other.gateway_port <= self.dev_port_end
    }
}

use crate::domain::entities::SlotTime;
use chrono::{Duration, NaiveTime};
use std::collections::HashSet;

/// Configured slot grid of a salon day: `[open, close)` in fixed steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    open: NaiveTime,
    close: NaiveTime,
    interval_minutes: u32,
}

impl SlotGrid {
    pub fn new(open: NaiveTime, close: NaiveTime, interval_minutes: u32) -> Result<Self, String> {
        if interval_minutes == 0 {
            return Err("Slot interval must be positive".to_string());
        }
        if open >= close {
            return Err(format!("Opening time {} must be before closing time {}", open, close));
        }
        Ok(Self {
            open,
            close,
            interval_minutes,
        })
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn slots(&self) -> Vec<SlotTime> {
        let step = Duration::minutes(i64::from(self.interval_minutes));
        let mut slots = Vec::new();
        let mut current = self.open;
        while current < self.close {
            slots.push(SlotTime::new(current));
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }
        slots
    }

    pub fn contains(&self, time: SlotTime) -> bool {
        self.slots().contains(&time)
    }

    /// Grid slots not present in `taken`, in grid order.
    pub fn available<I>(&self, taken: I) -> Vec<SlotTime>
    where
        I: IntoIterator<Item = SlotTime>,
    {
        let taken: HashSet<SlotTime> = taken.into_iter().collect();
        self.slots()
            .into_iter()
            .filter(|slot| !taken.contains(slot))
            .collect()
    }
}

impl Default for SlotGrid {
    /// 9:00 AM to 7:30 PM every half hour.
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            interval_minutes: 30,
        }
    }
}

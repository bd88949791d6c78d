pub mod kv_slots;

pub use kv_slots::SlotRecord;

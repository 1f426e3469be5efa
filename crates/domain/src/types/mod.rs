//! Domain types and models

pub mod device;
pub mod mode;
pub mod schedule;

pub use device::{AttributeUpdate, DeviceInfo, StatusChangeEvent, TrainStatus};
pub use mode::{AirQuality, DelayMinutes, Mode, ModeDescriptor, Status};
pub use schedule::{LocationDetail, SearchResponse, ServiceRecord};

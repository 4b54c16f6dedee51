use serde::{Deserialize, Serialize};

/// Rooms are owned by the catalog subsystem; this core only reads them to
/// verify existence and price. `status` is a coarse signal — date-range
/// availability is always computed from booking rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub room_number: String,
    pub room_type: String,
    pub base_price: i64,
    pub capacity: i32,
    pub status: RoomStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Occupied => "occupied",
            RoomStatus::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "occupied" => RoomStatus::Occupied,
            "maintenance" => RoomStatus::Maintenance,
            _ => RoomStatus::Available,
        }
    }
}

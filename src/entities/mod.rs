//! Storage model of the picking, reservation and addressing subsystem.

pub mod inventory;
pub mod inventory_movement;
pub mod label_association;
pub mod picking_order;
pub mod picking_order_item;
pub mod picking_wave;
pub mod picking_wave_item;
pub mod product;
pub mod receiving_order;
pub mod receiving_preallocation;
pub mod tenant;
pub mod warehouse_location;
pub mod warehouse_zone;

pub use inventory::{Entity as Inventory, InventoryStatus, Model as InventoryModel};
pub use picking_order::{Entity as PickingOrder, Model as PickingOrderModel, PickingOrderStatus};
pub use picking_wave::{Entity as PickingWave, Model as WaveModel, WaveStatus};
pub use picking_wave_item::{Entity as PickingWaveItem, Model as WaveItemModel, WaveItemStatus};
pub use receiving_order::ReceivingOrderStatus;
pub use receiving_preallocation::PreallocationStatus;
pub use tenant::PickingRule;
pub use warehouse_location::LocationType;

use std::sync::Arc;

use crate::{
    config::WarehouseConfig,
    db::DbPool,
    events::EventSender,
    services::{
        picking::PickingScanService, placement::PlacementValidator,
        preallocation::PreallocationService, reservations::ReservationReconciler,
        waves::WaveService,
    },
};

/// Factory for creating service instances with shared dependencies
#[derive(Clone)]
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    warehouse: Arc<WarehouseConfig>,
}

impl ServiceFactory {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, warehouse: WarehouseConfig) -> Self {
        Self {
            db_pool,
            event_sender,
            warehouse: Arc::new(warehouse),
        }
    }

    pub fn wave_service(&self) -> WaveService {
        WaveService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.warehouse.clone(),
        )
    }

    pub fn picking_service(&self) -> PickingScanService {
        PickingScanService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn reservation_reconciler(&self) -> ReservationReconciler {
        ReservationReconciler::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.warehouse.clone(),
        )
    }

    pub fn placement_validator(&self) -> PlacementValidator {
        PlacementValidator::new(self.db_pool.clone(), self.warehouse.clone())
    }

    pub fn preallocation_service(&self) -> PreallocationService {
        PreallocationService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.warehouse.clone(),
        )
    }
}

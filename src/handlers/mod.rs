pub mod health;
pub mod maintenance;
pub mod preallocations;
pub mod waves;

use std::sync::Arc;

use crate::services::{
    factory::ServiceFactory, picking::PickingScanService, preallocation::PreallocationService,
    reservations::ReservationReconciler, waves::WaveService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub waves: Arc<WaveService>,
    pub picking: Arc<PickingScanService>,
    pub reservations: Arc<ReservationReconciler>,
    pub preallocations: Arc<PreallocationService>,
}

impl AppServices {
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            waves: Arc::new(factory.wave_service()),
            picking: Arc::new(factory.picking_service()),
            reservations: Arc::new(factory.reservation_reconciler()),
            preallocations: Arc::new(factory.preallocation_service()),
        }
    }
}

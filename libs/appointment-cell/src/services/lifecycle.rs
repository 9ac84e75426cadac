use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Pending => &[
                AppointmentStatus::Accepted,
                AppointmentStatus::Rejected,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Accepted => &[AppointmentStatus::Cancelled],
            // Terminal states
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled => &[],
        }
    }

    /// Only live appointments can be moved or retitled.
    pub fn can_modify(&self, current_status: AppointmentStatus) -> bool {
        current_status.occupies_slot()
    }

    /// Accepting and rejecting are the doctor's (or an admin's) call; patients
    /// may only cancel.
    pub fn requires_staff(&self, new_status: AppointmentStatus) -> bool {
        matches!(new_status, AppointmentStatus::Accepted | AppointmentStatus::Rejected)
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

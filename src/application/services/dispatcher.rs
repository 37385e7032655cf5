use crate::application::services::booking_workflow::BookingWorkflow;
use crate::domain::entities::{Booking, CreateBooking, Identity, SlotTime};
use crate::domain::errors::{CoreResult, ErrorKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A booking action requested by the UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BookingAction {
    Create(CreateBooking),
    Confirm {
        booking_id: String,
    },
    Cancel {
        booking_id: String,
    },
    Complete {
        booking_id: String,
    },
    NoShow {
        booking_id: String,
    },
    CheckIn {
        booking_id: String,
    },
    Reschedule {
        booking_id: String,
        booking_date: NaiveDate,
        booking_time: SlotTime,
    },
}

impl BookingAction {
    pub fn name(&self) -> &'static str {
        match self {
            BookingAction::Create(_) => "create",
            BookingAction::Confirm { .. } => "confirm",
            BookingAction::Cancel { .. } => "cancel",
            BookingAction::Complete { .. } => "complete",
            BookingAction::NoShow { .. } => "no_show",
            BookingAction::CheckIn { .. } => "check_in",
            BookingAction::Reschedule { .. } => "reschedule",
        }
    }
}

/// Result handed back to the UI: success with the booking, or failure with a reason.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<Booking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DispatchOutcome {
    fn from_result(result: CoreResult<Booking>) -> Self {
        match result {
            Ok(booking) => Self {
                success: true,
                booking: Some(booking),
                error: None,
                message: None,
            },
            Err(e) => Self {
                success: false,
                booking: None,
                error: Some(e.kind()),
                message: Some(e.to_string()),
            },
        }
    }
}

#[derive(Clone)]
pub struct BookingDispatcher {
    workflow: Arc<BookingWorkflow>,
}

impl BookingDispatcher {
    pub fn new(workflow: Arc<BookingWorkflow>) -> Self {
        Self { workflow }
    }

    pub async fn dispatch(&self, identity: Option<&Identity>, action: BookingAction) -> DispatchOutcome {
        let name = action.name();
        let result = match action {
            BookingAction::Create(request) => self.workflow.create(identity, request).await,
            BookingAction::Confirm { booking_id } => self.workflow.confirm(identity, &booking_id).await,
            BookingAction::Cancel { booking_id } => self.workflow.cancel(identity, &booking_id).await,
            BookingAction::Complete { booking_id } => self.workflow.complete(identity, &booking_id).await,
            BookingAction::NoShow { booking_id } => self.workflow.mark_no_show(identity, &booking_id).await,
            BookingAction::CheckIn { booking_id } => self.workflow.check_in(identity, &booking_id).await,
            BookingAction::Reschedule {
                booking_id,
                booking_date,
                booking_time,
            } => {
                self.workflow
                    .reschedule(identity, &booking_id, booking_date, booking_time)
                    .await
            }
        };

        if let Err(e) = &result {
            tracing::warn!("Booking action {} failed: {}", name, e);
        }
        DispatchOutcome::from_result(result)
    }
}

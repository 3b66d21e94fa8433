//! Booking confirmation messages.
//!
//! The engine composes the messages; delivering them (SMTP, queue, ...) is
//! left to a [`BookingNotifier`] supplied by the caller.

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::model::Booking;

/// A plain-text message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait BookingNotifier: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Writes each message to the `tracing` log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl BookingNotifier for TracingNotifier {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "booking notification"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl BookingNotifier for NoopNotifier {
    fn deliver(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Build the customer confirmation and the salon's own notice for `booking`.
///
/// `salon_address` is both the sender shown to the customer and the inbox
/// that receives the internal notice.
pub fn compose_notifications(
    booking: &Booking,
    service_name: &str,
    staff_name: &str,
    salon_address: &str,
) -> [Notification; 2] {
    let starts = booking.starts_at.format(TIME_FORMAT);
    let ends = booking.ends_at.format(TIME_FORMAT);
    let notes = booking
        .notes
        .as_deref()
        .filter(|n| !n.trim().is_empty());

    let mut customer_body = format!(
        "Hello {},\n\nthank you for your booking.\nAppointment: {} - {}\nService: {}\nStylist: {}\n\n",
        booking.customer.name, starts, ends, service_name, staff_name
    );
    if let Some(notes) = notes {
        customer_body.push_str(&format!("Notes: {}\n\n", notes));
    }
    customer_body.push_str("We look forward to your visit!");

    let mut salon_body = format!(
        "New appointment:\nCustomer: {}\nContact: {} / {}\nService: {}\nStylist: {}\nStart: {}\nEnd: {}\n",
        booking.customer.name,
        booking.customer.email,
        booking.customer.phone,
        service_name,
        staff_name,
        starts,
        ends
    );
    if let Some(notes) = notes {
        salon_body.push_str(&format!("Notes: {}\n", notes));
    }

    [
        Notification {
            to: booking.customer.email.clone(),
            subject: "Appointment confirmation".to_string(),
            body: customer_body,
        },
        Notification {
            to: salon_address.to_string(),
            subject: format!("New booking: {}", booking.customer.name),
            body: salon_body,
        },
    ]
}

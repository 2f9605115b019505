/// Ticket state machine shared by the purchase, tutoring and admin handlers.
///
/// Course sales terminate at PAID (or APP_NOT_AVAILABLE when no payment surface
/// exists); tutoring sales continue PAID -> ACTIVE -> COMPLETED with CANCELLED
/// and REFUND_PROCESSED side exits. Transitions are one-directional.
pub const SALE_COURSE: &str = "course";
pub const SALE_TUTORING: &str = "tutoring";

pub const STATUS_INITIATED: &str = "INITIATED";
pub const STATUS_PAID: &str = "PAID";
pub const STATUS_APP_NOT_AVAILABLE: &str = "APP_NOT_AVAILABLE";
pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_CANCELLED: &str = "CANCELLED";
pub const STATUS_REFUND_PROCESSED: &str = "REFUND_PROCESSED";

pub const CANCEL_REASON_NO_SHOW: &str = "NO_SHOW";

pub fn is_sale_type(raw: &str) -> bool {
    matches!(raw, SALE_COURSE | SALE_TUTORING)
}

pub fn can_transition(sale_type: &str, from: &str, to: &str) -> bool {
    match sale_type {
        SALE_COURSE => matches!(
            (from, to),
            (STATUS_INITIATED, STATUS_PAID) | (STATUS_INITIATED, STATUS_APP_NOT_AVAILABLE)
        ),
        SALE_TUTORING => matches!(
            (from, to),
            (STATUS_INITIATED, STATUS_PAID)
                | (STATUS_INITIATED, STATUS_APP_NOT_AVAILABLE)
                | (STATUS_PAID, STATUS_ACTIVE)
                | (STATUS_PAID, STATUS_CANCELLED)
                | (STATUS_ACTIVE, STATUS_COMPLETED)
                | (STATUS_ACTIVE, STATUS_CANCELLED)
                | (STATUS_CANCELLED, STATUS_REFUND_PROCESSED)
        ),
        _ => false,
    }
}

/// Admin session-view label derived from a tutoring ticket's status.
pub fn session_view_status(status: &str, cancel_reason: Option<&str>) -> &'static str {
    match status {
        STATUS_PAID => "UPCOMING",
        STATUS_ACTIVE => "ONGOING",
        STATUS_COMPLETED => "COMPLETED",
        STATUS_CANCELLED if cancel_reason == Some(CANCEL_REASON_NO_SHOW) => "NO_SHOW",
        STATUS_CANCELLED => "CANCELLED",
        STATUS_REFUND_PROCESSED => "REFUNDED",
        _ => "PENDING",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_sales_terminate_at_paid() {
        assert!(can_transition(SALE_COURSE, STATUS_INITIATED, STATUS_PAID));
        assert!(!can_transition(SALE_COURSE, STATUS_PAID, STATUS_ACTIVE));
        assert!(!can_transition(SALE_COURSE, STATUS_PAID, STATUS_INITIATED));
    }

    #[test]
    fn tutoring_lifecycle_is_one_directional() {
        assert!(can_transition(SALE_TUTORING, STATUS_PAID, STATUS_ACTIVE));
        assert!(can_transition(SALE_TUTORING, STATUS_ACTIVE, STATUS_COMPLETED));
        assert!(can_transition(SALE_TUTORING, STATUS_CANCELLED, STATUS_REFUND_PROCESSED));
        assert!(!can_transition(SALE_TUTORING, STATUS_COMPLETED, STATUS_ACTIVE));
        assert!(!can_transition(SALE_TUTORING, STATUS_COMPLETED, STATUS_REFUND_PROCESSED));
        assert!(!can_transition(SALE_TUTORING, STATUS_ACTIVE, STATUS_PAID));
    }

    #[test]
    fn no_show_cancellations_surface_in_session_view() {
        assert_eq!(
            session_view_status(STATUS_CANCELLED, Some(CANCEL_REASON_NO_SHOW)),
            "NO_SHOW"
        );
        assert_eq!(session_view_status(STATUS_CANCELLED, Some("STUDENT_REQUEST")), "CANCELLED");
        assert_eq!(session_view_status(STATUS_ACTIVE, None), "ONGOING");
    }
}

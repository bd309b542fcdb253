//! Pure state-transition rules for the patient/call/message lifecycle.
//! Webhook handlers and the orchestrator call into these; nothing here
//! touches the network or the store.

use crate::schema::{CallStatus, MessageStatus, PatientStatus, ResponseType};

/// Status reason written when both follow-up ceilings are exhausted.
pub const MAX_ATTEMPTS_REASON: &str = "Max follow-up attempts reached";

/// Statuses eligible for follow-up processing. "Cold lead" is a filter over
/// `not_answered` after exhaustion, not a distinct state, so exhausted
/// patients drop out of this set via their counters, not their status.
pub fn is_actionable(status: PatientStatus) -> bool {
    matches!(status, PatientStatus::Pending | PatientStatus::NotAnswered)
}

/// Patient status resulting from a classified WhatsApp reply.
pub fn status_after_reply(reply: ResponseType) -> PatientStatus {
    match reply {
        ResponseType::Yes => PatientStatus::Booked,
        ResponseType::No => PatientStatus::NotInterested,
        ResponseType::Other => PatientStatus::FollowUp,
    }
}

fn message_rank(status: MessageStatus) -> u8 {
    match status {
        MessageStatus::Queued => 0,
        MessageStatus::Sent => 1,
        MessageStatus::Delivered => 2,
        MessageStatus::Read => 3,
        MessageStatus::Failed => 4,
    }
}

/// Message delivery status is monotonic: `queued → sent → delivered → read`,
/// with `failed` allowed from any stage except a message already read or
/// failed. Out-of-order provider webhooks must never regress the status.
pub fn message_status_can_advance(from: MessageStatus, to: MessageStatus) -> bool {
    match (from, to) {
        (MessageStatus::Read | MessageStatus::Failed, _) => false,
        (_, MessageStatus::Failed) => true,
        (from, to) => message_rank(to) > message_rank(from),
    }
}

/// Calls move from `scheduled` to exactly one terminal status; terminal
/// statuses are write-once.
pub fn call_status_can_finalize(from: CallStatus, to: CallStatus) -> bool {
    from == CallStatus::Scheduled && to.is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_and_not_answered_are_actionable() {
        assert!(is_actionable(PatientStatus::Pending));
        assert!(is_actionable(PatientStatus::NotAnswered));
        assert!(!is_actionable(PatientStatus::Called));
        assert!(!is_actionable(PatientStatus::Booked));
        assert!(!is_actionable(PatientStatus::FollowUp));
    }

    #[test]
    fn reply_outcomes_map_to_statuses() {
        assert_eq!(status_after_reply(ResponseType::Yes), PatientStatus::Booked);
        assert_eq!(
            status_after_reply(ResponseType::No),
            PatientStatus::NotInterested
        );
        assert_eq!(
            status_after_reply(ResponseType::Other),
            PatientStatus::FollowUp
        );
    }

    #[test]
    fn message_status_never_regresses() {
        assert!(message_status_can_advance(
            MessageStatus::Queued,
            MessageStatus::Sent
        ));
        assert!(message_status_can_advance(
            MessageStatus::Sent,
            MessageStatus::Read
        ));
        assert!(!message_status_can_advance(
            MessageStatus::Delivered,
            MessageStatus::Sent
        ));
        assert!(!message_status_can_advance(
            MessageStatus::Read,
            MessageStatus::Queued
        ));
        assert!(!message_status_can_advance(
            MessageStatus::Sent,
            MessageStatus::Sent
        ));
    }

    #[test]
    fn failure_is_reachable_until_read() {
        assert!(message_status_can_advance(
            MessageStatus::Queued,
            MessageStatus::Failed
        ));
        assert!(message_status_can_advance(
            MessageStatus::Delivered,
            MessageStatus::Failed
        ));
        assert!(!message_status_can_advance(
            MessageStatus::Read,
            MessageStatus::Failed
        ));
        assert!(!message_status_can_advance(
            MessageStatus::Failed,
            MessageStatus::Sent
        ));
    }

    #[test]
    fn calls_finalize_once() {
        assert!(call_status_can_finalize(
            CallStatus::Scheduled,
            CallStatus::Completed
        ));
        assert!(call_status_can_finalize(
            CallStatus::Scheduled,
            CallStatus::NoAnswer
        ));
        assert!(!call_status_can_finalize(
            CallStatus::Completed,
            CallStatus::Failed
        ));
        assert!(!call_status_can_finalize(
            CallStatus::Scheduled,
            CallStatus::Scheduled
        ));
    }
}

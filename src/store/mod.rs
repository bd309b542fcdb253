pub mod postgres;

#[cfg(test)]
pub mod memory;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::schema::{Call, CallStatus, Message, MessageStatus, Patient, PatientStatus, ResponseType, Setting};

pub use postgres::PgStore;

/// Candidate filter for ad-hoc call scheduling. Explicit ids win over the
/// appointment-date window; `date` defaults to tomorrow upstream.
#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub patient_ids: Option<Vec<Uuid>>,
}

/// Durable record store for patients, calls, messages and the settings
/// singleton. The production implementation is Postgres; tests run the same
/// orchestration logic against an in-memory implementation.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn load_settings(&self) -> Result<Option<Setting>>;
    async fn upsert_settings(&self, settings: &Setting) -> Result<()>;

    async fn create_patient(&self, patient: &Patient) -> Result<()>;
    async fn patient_by_id(&self, id: Uuid) -> Result<Option<Patient>>;
    /// Inbound webhook numbers arrive in provider formats; matching is done
    /// on bare digit strings.
    async fn patient_by_phone_digits(&self, digits: &str) -> Result<Option<Patient>>;

    /// Patients in `{pending, not_answered}` with both follow-up counters
    /// strictly under their ceilings.
    async fn followup_candidates(&self, max_calls: i32, max_messages: i32)
    -> Result<Vec<Patient>>;
    /// Pending patients matching an ad-hoc scheduling filter, capped.
    async fn scheduling_candidates(&self, filter: &ScheduleFilter, limit: i64)
    -> Result<Vec<Patient>>;
    /// Pending patients that have never been messaged, capped
    /// (first-contact outreach).
    async fn new_patient_candidates(&self, limit: i64) -> Result<Vec<Patient>>;

    /// Conditionally count one follow-up message against the patient.
    /// Returns false when the ceiling was already reached (a concurrent run
    /// got there first); the counter never regresses.
    async fn record_message_attempt(
        &self,
        patient_id: Uuid,
        max_messages: i32,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    /// Conditionally count one follow-up call and move the patient to
    /// `called`. Same ceiling semantics as message attempts.
    async fn record_call_attempt(
        &self,
        patient_id: Uuid,
        max_calls: i32,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    /// Bump the legacy per-template send counter.
    async fn record_template_send(&self, patient_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    async fn set_patient_status(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        reason: Option<&str>,
    ) -> Result<()>;
    /// Classifier outcome: status, reason and the overwritten analysis notes.
    async fn apply_classification(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        reason: &str,
        ai_notes: &str,
    ) -> Result<()>;
    /// Inbound-reply outcome: status plus last-response bookkeeping.
    async fn record_reply(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        response: ResponseType,
        now: DateTime<Utc>,
    ) -> Result<()>;
    /// Cold-lead promotion: patients still in `{pending, not_answered}` with
    /// both counters at their ceilings. Returns how many were promoted.
    async fn promote_exhausted(&self, max_calls: i32, max_messages: i32) -> Result<u64>;

    async fn create_call(&self, call: &Call) -> Result<()>;
    async fn call_by_provider_id(&self, provider_call_id: &str) -> Result<Option<Call>>;
    /// Write-once terminal update; applies only while the call is still
    /// `scheduled`. Returns false on duplicate webhook replay.
    async fn finalize_call(
        &self,
        call_id: Uuid,
        status: CallStatus,
        duration_secs: i32,
        notes: Option<&str>,
        recording_url: Option<&str>,
    ) -> Result<bool>;
    /// Voice calls dispatched since the given instant (daily-cap check).
    async fn calls_since(&self, since: DateTime<Utc>) -> Result<i64>;

    async fn create_message(&self, message: &Message) -> Result<()>;
    async fn message_by_provider_id(&self, provider_message_id: &str) -> Result<Option<Message>>;
    /// Monotonic status advance; stale or out-of-order webhooks are dropped
    /// and reported as false.
    async fn advance_message_status(
        &self,
        provider_message_id: &str,
        status: MessageStatus,
    ) -> Result<bool>;
    /// Pair an inbound reply with the message it answers.
    async fn attach_message_response(
        &self,
        provider_message_id: &str,
        body: &str,
        response_type: ResponseType,
        now: DateTime<Utc>,
    ) -> Result<()>;
}

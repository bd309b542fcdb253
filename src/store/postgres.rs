use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::functions::lifecycle;
use crate::schema::{
    Call, CallStatus, Message, MessageStatus, MessageType, Patient, PatientStatus, ResponseType,
    Setting,
};
use crate::store::{ScheduleFilter, Store};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bad_enum(column: &str, value: &str) -> Error {
    Error::Storage(anyhow::anyhow!("unrecognized {column} value in store: {value}"))
}

#[derive(sqlx::FromRow)]
struct PatientRow {
    id: Uuid,
    name: String,
    phone: String,
    email: Option<String>,
    call_script: String,
    appointment_date: Option<DateTime<Utc>>,
    preferred_call_day: Option<String>,
    preferred_call_time: Option<String>,
    status: String,
    status_reason: Option<String>,
    notes: Option<String>,
    ai_notes: Option<String>,
    added_by: Option<Uuid>,
    assigned_doctor: Option<Uuid>,
    assigned_doctor_name: Option<String>,
    clinic_name: Option<String>,
    followup_calls: i32,
    followup_messages: i32,
    message_attempts: i32,
    call_attempts: i32,
    last_message_date: Option<DateTime<Utc>>,
    last_call_date: Option<DateTime<Utc>>,
    last_response: Option<String>,
    last_response_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = Error;

    fn try_from(row: PatientRow) -> Result<Self> {
        let status =
            PatientStatus::parse(&row.status).ok_or_else(|| bad_enum("status", &row.status))?;
        Ok(Patient {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            call_script: row.call_script,
            appointment_date: row.appointment_date,
            preferred_call_day: row.preferred_call_day,
            preferred_call_time: row.preferred_call_time,
            status,
            status_reason: row.status_reason,
            notes: row.notes,
            ai_notes: row.ai_notes,
            added_by: row.added_by,
            assigned_doctor: row.assigned_doctor,
            assigned_doctor_name: row.assigned_doctor_name,
            clinic_name: row.clinic_name,
            followup_calls: row.followup_calls,
            followup_messages: row.followup_messages,
            message_attempts: row.message_attempts,
            call_attempts: row.call_attempts,
            last_message_date: row.last_message_date,
            last_call_date: row.last_call_date,
            last_response: row.last_response,
            last_response_date: row.last_response_date,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CallRow {
    id: Uuid,
    patient_id: Uuid,
    call_time: DateTime<Utc>,
    status: String,
    duration_secs: i32,
    provider_call_id: Option<String>,
    notes: Option<String>,
    recording_url: Option<String>,
    is_followup: bool,
    followup_attempt: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<CallRow> for Call {
    type Error = Error;

    fn try_from(row: CallRow) -> Result<Self> {
        let status =
            CallStatus::parse(&row.status).ok_or_else(|| bad_enum("call status", &row.status))?;
        Ok(Call {
            id: row.id,
            patient_id: row.patient_id,
            call_time: row.call_time,
            status,
            duration_secs: row.duration_secs,
            provider_call_id: row.provider_call_id,
            notes: row.notes,
            recording_url: row.recording_url,
            is_followup: row.is_followup,
            followup_attempt: row.followup_attempt,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    patient_id: Uuid,
    content: String,
    sent_at: DateTime<Utc>,
    status: String,
    message_type: String,
    provider_message_id: Option<String>,
    sent_by: Option<Uuid>,
    is_followup: bool,
    followup_attempt: i32,
    response_content: Option<String>,
    response_type: Option<String>,
    response_date: Option<DateTime<Utc>>,
}

impl TryFrom<MessageRow> for Message {
    type Error = Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        let status = MessageStatus::parse(&row.status)
            .ok_or_else(|| bad_enum("message status", &row.status))?;
        let message_type = MessageType::parse(&row.message_type)
            .ok_or_else(|| bad_enum("message type", &row.message_type))?;
        let response_type = match row.response_type.as_deref() {
            Some(raw) => Some(ResponseType::parse(raw).ok_or_else(|| bad_enum("response type", raw))?),
            None => None,
        };
        Ok(Message {
            id: row.id,
            patient_id: row.patient_id,
            content: row.content,
            sent_at: row.sent_at,
            status,
            message_type,
            provider_message_id: row.provider_message_id,
            sent_by: row.sent_by,
            is_followup: row.is_followup,
            followup_attempt: row.followup_attempt,
            response_content: row.response_content,
            response_type,
            response_date: row.response_date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SettingRow {
    call_start_time: String,
    call_end_time: String,
    max_calls_per_day: i32,
    retell_api_key: Option<String>,
    retell_from_number: Option<String>,
    twilio_account_sid: Option<String>,
    twilio_auth_token: Option<String>,
    twilio_phone_number: Option<String>,
    whatsapp_enabled: bool,
    message_template: String,
    whatsapp_reminder_template: String,
    whatsapp_confirmation_template: String,
    whatsapp_followup_template: String,
    send_message_before_call: bool,
    max_followup_calls: i32,
    max_followup_messages: i32,
    days_before_followup: i32,
    followup_schedule: String,
    timezone: String,
    updated_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl From<SettingRow> for Setting {
    fn from(row: SettingRow) -> Self {
        Setting {
            call_start_time: row.call_start_time,
            call_end_time: row.call_end_time,
            max_calls_per_day: row.max_calls_per_day,
            retell_api_key: row.retell_api_key,
            retell_from_number: row.retell_from_number,
            twilio_account_sid: row.twilio_account_sid,
            twilio_auth_token: row.twilio_auth_token,
            twilio_phone_number: row.twilio_phone_number,
            whatsapp_enabled: row.whatsapp_enabled,
            message_template: row.message_template,
            whatsapp_reminder_template: row.whatsapp_reminder_template,
            whatsapp_confirmation_template: row.whatsapp_confirmation_template,
            whatsapp_followup_template: row.whatsapp_followup_template,
            send_message_before_call: row.send_message_before_call,
            max_followup_calls: row.max_followup_calls,
            max_followup_messages: row.max_followup_messages,
            days_before_followup: row.days_before_followup,
            followup_schedule: row.followup_schedule,
            timezone: row.timezone,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        }
    }
}

const PATIENT_COLUMNS: &str = "id, name, phone, email, call_script, appointment_date, \
    preferred_call_day, preferred_call_time, status, status_reason, notes, ai_notes, added_by, \
    assigned_doctor, assigned_doctor_name, clinic_name, followup_calls, followup_messages, \
    message_attempts, call_attempts, last_message_date, last_call_date, last_response, \
    last_response_date, created_at";

#[async_trait::async_trait]
impl Store for PgStore {
    async fn load_settings(&self) -> Result<Option<Setting>> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT call_start_time, call_end_time, max_calls_per_day, retell_api_key, \
             retell_from_number, twilio_account_sid, twilio_auth_token, twilio_phone_number, \
             whatsapp_enabled, message_template, whatsapp_reminder_template, \
             whatsapp_confirmation_template, whatsapp_followup_template, \
             send_message_before_call, max_followup_calls, max_followup_messages, \
             days_before_followup, followup_schedule, timezone, updated_by, updated_at \
             FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Setting::from))
    }

    async fn upsert_settings(&self, settings: &Setting) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (id, call_start_time, call_end_time, max_calls_per_day, \
             retell_api_key, retell_from_number, twilio_account_sid, twilio_auth_token, \
             twilio_phone_number, whatsapp_enabled, message_template, \
             whatsapp_reminder_template, whatsapp_confirmation_template, \
             whatsapp_followup_template, send_message_before_call, max_followup_calls, \
             max_followup_messages, days_before_followup, followup_schedule, timezone, \
             updated_by, updated_at) \
             VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21) \
             ON CONFLICT (id) DO UPDATE SET \
             call_start_time = EXCLUDED.call_start_time, \
             call_end_time = EXCLUDED.call_end_time, \
             max_calls_per_day = EXCLUDED.max_calls_per_day, \
             retell_api_key = EXCLUDED.retell_api_key, \
             retell_from_number = EXCLUDED.retell_from_number, \
             twilio_account_sid = EXCLUDED.twilio_account_sid, \
             twilio_auth_token = EXCLUDED.twilio_auth_token, \
             twilio_phone_number = EXCLUDED.twilio_phone_number, \
             whatsapp_enabled = EXCLUDED.whatsapp_enabled, \
             message_template = EXCLUDED.message_template, \
             whatsapp_reminder_template = EXCLUDED.whatsapp_reminder_template, \
             whatsapp_confirmation_template = EXCLUDED.whatsapp_confirmation_template, \
             whatsapp_followup_template = EXCLUDED.whatsapp_followup_template, \
             send_message_before_call = EXCLUDED.send_message_before_call, \
             max_followup_calls = EXCLUDED.max_followup_calls, \
             max_followup_messages = EXCLUDED.max_followup_messages, \
             days_before_followup = EXCLUDED.days_before_followup, \
             followup_schedule = EXCLUDED.followup_schedule, \
             timezone = EXCLUDED.timezone, \
             updated_by = EXCLUDED.updated_by, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(&settings.call_start_time)
        .bind(&settings.call_end_time)
        .bind(settings.max_calls_per_day)
        .bind(&settings.retell_api_key)
        .bind(&settings.retell_from_number)
        .bind(&settings.twilio_account_sid)
        .bind(&settings.twilio_auth_token)
        .bind(&settings.twilio_phone_number)
        .bind(settings.whatsapp_enabled)
        .bind(&settings.message_template)
        .bind(&settings.whatsapp_reminder_template)
        .bind(&settings.whatsapp_confirmation_template)
        .bind(&settings.whatsapp_followup_template)
        .bind(settings.send_message_before_call)
        .bind(settings.max_followup_calls)
        .bind(settings.max_followup_messages)
        .bind(settings.days_before_followup)
        .bind(&settings.followup_schedule)
        .bind(&settings.timezone)
        .bind(settings.updated_by)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_patient(&self, patient: &Patient) -> Result<()> {
        sqlx::query(
            "INSERT INTO patients (id, name, phone, email, call_script, appointment_date, \
             preferred_call_day, preferred_call_time, status, status_reason, notes, ai_notes, \
             added_by, assigned_doctor, assigned_doctor_name, clinic_name, followup_calls, \
             followup_messages, message_attempts, call_attempts, last_message_date, \
             last_call_date, last_response, last_response_date, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25)",
        )
        .bind(patient.id)
        .bind(&patient.name)
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.call_script)
        .bind(patient.appointment_date)
        .bind(&patient.preferred_call_day)
        .bind(&patient.preferred_call_time)
        .bind(patient.status.as_str())
        .bind(&patient.status_reason)
        .bind(&patient.notes)
        .bind(&patient.ai_notes)
        .bind(patient.added_by)
        .bind(patient.assigned_doctor)
        .bind(&patient.assigned_doctor_name)
        .bind(&patient.clinic_name)
        .bind(patient.followup_calls)
        .bind(patient.followup_messages)
        .bind(patient.message_attempts)
        .bind(patient.call_attempts)
        .bind(patient.last_message_date)
        .bind(patient.last_call_date)
        .bind(&patient.last_response)
        .bind(patient.last_response_date)
        .bind(patient.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn patient_by_id(&self, id: Uuid) -> Result<Option<Patient>> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Patient::try_from).transpose()
    }

    async fn patient_by_phone_digits(&self, digits: &str) -> Result<Option<Patient>> {
        // an empty digit string would LIKE-match every patient
        if digits.is_empty() {
            return Ok(None);
        }
        // inbound numbers carry country prefixes the stored ones may lack,
        // so match digit strings in either direction
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients \
             WHERE $1 LIKE '%' || regexp_replace(phone, '[^0-9]', '', 'g') || '%' \
                OR regexp_replace(phone, '[^0-9]', '', 'g') LIKE '%' || $1 || '%' \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(digits)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Patient::try_from).transpose()
    }

    async fn followup_candidates(
        &self,
        max_calls: i32,
        max_messages: i32,
    ) -> Result<Vec<Patient>> {
        let rows = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients \
             WHERE status IN ('pending', 'not_answered') \
               AND followup_calls < $1 AND followup_messages < $2 \
             ORDER BY created_at"
        ))
        .bind(max_calls)
        .bind(max_messages)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Patient::try_from).collect()
    }

    async fn scheduling_candidates(
        &self,
        filter: &ScheduleFilter,
        limit: i64,
    ) -> Result<Vec<Patient>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE status = 'pending'"
        ));

        if let Some(ids) = &filter.patient_ids {
            builder.push(" AND id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        } else if let Some(date) = filter.date {
            let start = date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc();
            let end = start + chrono::Duration::days(1);
            builder.push(" AND appointment_date >= ");
            builder.push_bind(start);
            builder.push(" AND appointment_date < ");
            builder.push_bind(end);
        }
        if let Some(doctor_id) = filter.doctor_id {
            builder.push(" AND assigned_doctor = ");
            builder.push_bind(doctor_id);
        }
        builder.push(" ORDER BY created_at LIMIT ");
        builder.push_bind(limit);

        let rows = builder
            .build_query_as::<PatientRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Patient::try_from).collect()
    }

    async fn new_patient_candidates(&self, limit: i64) -> Result<Vec<Patient>> {
        let rows = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients \
             WHERE status = 'pending' AND message_attempts = 0 \
             ORDER BY created_at LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Patient::try_from).collect()
    }

    async fn record_message_attempt(
        &self,
        patient_id: Uuid,
        max_messages: i32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE patients \
             SET followup_messages = followup_messages + 1, last_message_date = $3 \
             WHERE id = $1 AND followup_messages < $2",
        )
        .bind(patient_id)
        .bind(max_messages)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_call_attempt(
        &self,
        patient_id: Uuid,
        max_calls: i32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE patients \
             SET followup_calls = followup_calls + 1, status = 'called', last_call_date = $3 \
             WHERE id = $1 AND followup_calls < $2",
        )
        .bind(patient_id)
        .bind(max_calls)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_template_send(&self, patient_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE patients \
             SET message_attempts = message_attempts + 1, last_message_date = $2 \
             WHERE id = $1",
        )
        .bind(patient_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_patient_status(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE patients SET status = $2, status_reason = $3 WHERE id = $1")
            .bind(patient_id)
            .bind(status.as_str())
            .bind(reason)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn apply_classification(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        reason: &str,
        ai_notes: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE patients SET status = $2, status_reason = $3, ai_notes = $4 WHERE id = $1",
        )
        .bind(patient_id)
        .bind(status.as_str())
        .bind(reason)
        .bind(ai_notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_reply(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        response: ResponseType,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE patients \
             SET status = $2, last_response = $3, last_response_date = $4 \
             WHERE id = $1",
        )
        .bind(patient_id)
        .bind(status.as_str())
        .bind(response.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn promote_exhausted(&self, max_calls: i32, max_messages: i32) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE patients \
             SET status = 'not_answered', status_reason = $3 \
             WHERE status IN ('pending', 'not_answered') \
               AND followup_calls >= $1 AND followup_messages >= $2",
        )
        .bind(max_calls)
        .bind(max_messages)
        .bind(lifecycle::MAX_ATTEMPTS_REASON)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn create_call(&self, call: &Call) -> Result<()> {
        sqlx::query(
            "INSERT INTO calls (id, patient_id, call_time, status, duration_secs, \
             provider_call_id, notes, recording_url, is_followup, followup_attempt, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(call.id)
        .bind(call.patient_id)
        .bind(call.call_time)
        .bind(call.status.as_str())
        .bind(call.duration_secs)
        .bind(&call.provider_call_id)
        .bind(&call.notes)
        .bind(&call.recording_url)
        .bind(call.is_followup)
        .bind(call.followup_attempt)
        .bind(call.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn call_by_provider_id(&self, provider_call_id: &str) -> Result<Option<Call>> {
        let row = sqlx::query_as::<_, CallRow>(
            "SELECT id, patient_id, call_time, status, duration_secs, provider_call_id, notes, \
             recording_url, is_followup, followup_attempt, created_at \
             FROM calls WHERE provider_call_id = $1",
        )
        .bind(provider_call_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Call::try_from).transpose()
    }

    async fn finalize_call(
        &self,
        call_id: Uuid,
        status: CallStatus,
        duration_secs: i32,
        notes: Option<&str>,
        recording_url: Option<&str>,
    ) -> Result<bool> {
        if !status.is_terminal() {
            return Ok(false);
        }
        // the status guard makes duplicate webhook replays no-ops
        let result = sqlx::query(
            "UPDATE calls \
             SET status = $2, duration_secs = $3, notes = $4, \
                 recording_url = COALESCE($5, recording_url) \
             WHERE id = $1 AND status = 'scheduled'",
        )
        .bind(call_id)
        .bind(status.as_str())
        .bind(duration_secs)
        .bind(notes)
        .bind(recording_url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn calls_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM calls WHERE call_time >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn create_message(&self, message: &Message) -> Result<()> {
        sqlx::query(
            "INSERT INTO messages (id, patient_id, content, sent_at, status, message_type, \
             provider_message_id, sent_by, is_followup, followup_attempt, response_content, \
             response_type, response_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(message.id)
        .bind(message.patient_id)
        .bind(&message.content)
        .bind(message.sent_at)
        .bind(message.status.as_str())
        .bind(message.message_type.as_str())
        .bind(&message.provider_message_id)
        .bind(message.sent_by)
        .bind(message.is_followup)
        .bind(message.followup_attempt)
        .bind(&message.response_content)
        .bind(message.response_type.map(ResponseType::as_str))
        .bind(message.response_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn message_by_provider_id(&self, provider_message_id: &str) -> Result<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT id, patient_id, content, sent_at, status, message_type, \
             provider_message_id, sent_by, is_followup, followup_attempt, response_content, \
             response_type, response_date \
             FROM messages WHERE provider_message_id = $1",
        )
        .bind(provider_message_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Message::try_from).transpose()
    }

    async fn advance_message_status(
        &self,
        provider_message_id: &str,
        status: MessageStatus,
    ) -> Result<bool> {
        let Some(message) = self.message_by_provider_id(provider_message_id).await? else {
            return Ok(false);
        };
        if !lifecycle::message_status_can_advance(message.status, status) {
            return Ok(false);
        }
        // optimistic status guard against a racing webhook
        let result = sqlx::query(
            "UPDATE messages SET status = $2 WHERE provider_message_id = $1 AND status = $3",
        )
        .bind(provider_message_id)
        .bind(status.as_str())
        .bind(message.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn attach_message_response(
        &self,
        provider_message_id: &str,
        body: &str,
        response_type: ResponseType,
        now: DateTime<Utc>,
    ) -> Result<()> {
        // a reply proves the message was read, but never revives a failed
        // one or regresses a terminal status
        sqlx::query(
            "UPDATE messages \
             SET status = CASE WHEN status IN ('read', 'failed') THEN status ELSE 'read' END, \
                 response_content = $2, response_type = $3, response_date = $4 \
             WHERE provider_message_id = $1",
        )
        .bind(provider_message_id)
        .bind(body)
        .bind(response_type.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

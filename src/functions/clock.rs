//! Clock daemon: fires the follow-up orchestrator on the cron schedule from
//! settings, but only inside the clinic's configured calling window.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

use crate::error::{Error, Result};
use crate::functions::followup;
use crate::schema::Setting;
use crate::services::{MessageProvider, VoiceProvider};
use crate::store::Store;

// the `cron` crate requires 6-field (second-granularity) expressions,
// so we prepend "0" to standard 5-field minute-granularity inputs
fn normalize_schedule(schedule: &str) -> String {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    let normalized = fields.join(" ");
    if fields.len() == 5 {
        format!("0 {normalized}")
    } else {
        normalized
    }
}

pub fn compute_next_run_at(
    schedule: &str,
    timezone: &str,
    from: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let tz: chrono_tz::Tz = timezone
        .parse()
        .map_err(|_| Error::Config(format!("invalid timezone: {timezone}")))?;
    let normalized = normalize_schedule(schedule);
    let parsed = cron::Schedule::from_str(&normalized)
        .map_err(|e| Error::Config(format!("invalid cron expression `{normalized}`: {e}")))?;

    let from_local = from.with_timezone(&tz);
    let next_local = parsed
        .after(&from_local)
        .next()
        .ok_or_else(|| Error::Config("cron has no future occurrences".to_string()))?;

    Ok(next_local.with_timezone(&Utc))
}

/// Whether `now`, viewed in the clinic's timezone, falls inside the
/// call_start_time..call_end_time window. A start after the end wraps
/// around midnight.
pub fn within_call_window(settings: &Setting, now: DateTime<Utc>) -> Result<bool> {
    let tz: chrono_tz::Tz = settings
        .timezone
        .parse()
        .map_err(|_| Error::Config(format!("invalid timezone: {}", settings.timezone)))?;
    let start = parse_clock_time(&settings.call_start_time)?;
    let end = parse_clock_time(&settings.call_end_time)?;

    let local = now.with_timezone(&tz).time();
    if start <= end {
        Ok(local >= start && local < end)
    } else {
        Ok(local >= start || local < end)
    }
}

fn parse_clock_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| Error::Config(format!("invalid call window time `{raw}`, expected HH:MM")))
}

/// One poll. The first tick only schedules the next run; later ticks fire the
/// orchestrator when due and inside the call window, and advance the
/// schedule either way. Returns whether a follow-up pass ran.
pub async fn clock_tick(
    store: &dyn Store,
    voice: &dyn VoiceProvider,
    messaging: &dyn MessageProvider,
    public_url: &str,
    next_run: &mut Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(settings) = store.load_settings().await? else {
        tracing::debug!("clock: settings not configured, idle");
        return Ok(false);
    };

    let Some(due_at) = *next_run else {
        let next = compute_next_run_at(&settings.followup_schedule, &settings.timezone, now)?;
        tracing::info!(next_run_at = %next, schedule = %settings.followup_schedule, "clock: scheduled first run");
        *next_run = Some(next);
        return Ok(false);
    };

    if now < due_at {
        return Ok(false);
    }

    // advance before running so a slow or failing pass cannot refire early
    *next_run = Some(compute_next_run_at(
        &settings.followup_schedule,
        &settings.timezone,
        now,
    )?);

    if !within_call_window(&settings, now)? {
        tracing::info!(
            call_start = %settings.call_start_time,
            call_end = %settings.call_end_time,
            "clock: outside call window, skipping run"
        );
        return Ok(false);
    }

    let report = followup::process_follow_ups(store, voice, messaging, public_url).await?;
    tracing::info!(
        candidates = report.candidates,
        messages_sent = report.messages_sent,
        calls_placed = report.calls_placed,
        promoted = report.promoted,
        "clock: follow-up run complete"
    );
    Ok(true)
}

/// Daemon loop. Polls until the shutdown signal flips.
pub async fn run(
    store: Arc<dyn Store>,
    voice: Arc<dyn VoiceProvider>,
    messaging: Arc<dyn MessageProvider>,
    public_url: String,
    poll_interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut next_run: Option<DateTime<Utc>> = None;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(poll_interval) => {
                if let Err(e) = clock_tick(
                    store.as_ref(),
                    voice.as_ref(),
                    messaging.as_ref(),
                    &public_url,
                    &mut next_run,
                    Utc::now(),
                )
                .await
                {
                    tracing::error!(error = %e, "clock tick failed");
                }
            }
        }
    }
    tracing::info!("clock: shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::followup::testing::{
        ScriptedMessenger, ScriptedVoice, messaging_settings, patient,
    };
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;

    const PUBLIC_URL: &str = "https://care.example.com";

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn computes_next_run_for_five_field_schedule() {
        let now = noon_utc();
        let next = compute_next_run_at("0 9 * * *", "UTC", now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap());
    }

    #[test]
    fn respects_clinic_timezone() {
        let now = noon_utc();
        // 9am in New York is 14:00 UTC in January
        let next = compute_next_run_at("0 9 * * *", "America/New_York", now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 5, 14, 0, 0).unwrap());
    }

    #[test]
    fn rejects_bad_timezone_and_schedule() {
        let now = noon_utc();
        assert!(matches!(
            compute_next_run_at("0 9 * * *", "Mars/Olympus", now),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            compute_next_run_at("not a cron", "UTC", now),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn call_window_bounds() {
        let settings = messaging_settings(); // 09:00..17:00 UTC
        let at = |h, m| Utc.with_ymd_and_hms(2026, 1, 5, h, m, 0).unwrap();
        assert!(!within_call_window(&settings, at(8, 59)).unwrap());
        assert!(within_call_window(&settings, at(9, 0)).unwrap());
        assert!(within_call_window(&settings, at(16, 59)).unwrap());
        assert!(!within_call_window(&settings, at(17, 0)).unwrap());
    }

    #[test]
    fn call_window_wraps_past_midnight() {
        let mut settings = messaging_settings();
        settings.call_start_time = "22:00".to_string();
        settings.call_end_time = "02:00".to_string();
        let at = |h| Utc.with_ymd_and_hms(2026, 1, 5, h, 0, 0).unwrap();
        assert!(within_call_window(&settings, at(23)).unwrap());
        assert!(within_call_window(&settings, at(1)).unwrap());
        assert!(!within_call_window(&settings, at(12)).unwrap());
    }

    #[tokio::test]
    async fn first_tick_schedules_without_firing() {
        let store = MemoryStore::with_settings(messaging_settings());
        store.seed_patient(patient("Ana", "+15550102222"));
        let voice = ScriptedVoice::default();
        let messaging = ScriptedMessenger::default();
        let mut next_run = None;

        let fired = clock_tick(&store, &voice, &messaging, PUBLIC_URL, &mut next_run, noon_utc())
            .await
            .unwrap();
        assert!(!fired);
        assert!(next_run.is_some());
        assert!(messaging.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn due_tick_inside_window_runs_followups_and_advances() {
        let store = MemoryStore::with_settings(messaging_settings());
        store.seed_patient(patient("Ana", "+15550102222"));
        let voice = ScriptedVoice::default();
        let messaging = ScriptedMessenger::default();
        let now = noon_utc();
        let mut next_run = Some(now - chrono::Duration::minutes(1));

        let fired = clock_tick(&store, &voice, &messaging, PUBLIC_URL, &mut next_run, now)
            .await
            .unwrap();
        assert!(fired);
        assert_eq!(messaging.sent.lock().unwrap().len(), 1);
        assert!(next_run.unwrap() > now);
    }

    #[tokio::test]
    async fn due_tick_outside_window_skips_but_advances() {
        let store = MemoryStore::with_settings(messaging_settings());
        store.seed_patient(patient("Ana", "+15550102222"));
        let voice = ScriptedVoice::default();
        let messaging = ScriptedMessenger::default();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 20, 0, 0).unwrap();
        let mut next_run = Some(now - chrono::Duration::minutes(1));

        let fired = clock_tick(&store, &voice, &messaging, PUBLIC_URL, &mut next_run, now)
            .await
            .unwrap();
        assert!(!fired);
        assert!(messaging.sent.lock().unwrap().is_empty());
        assert!(next_run.unwrap() > now);
    }

    #[tokio::test]
    async fn not_yet_due_tick_is_a_no_op() {
        let store = MemoryStore::with_settings(messaging_settings());
        store.seed_patient(patient("Ana", "+15550102222"));
        let voice = ScriptedVoice::default();
        let messaging = ScriptedMessenger::default();
        let now = noon_utc();
        let due_at = now + chrono::Duration::hours(1);
        let mut next_run = Some(due_at);

        let fired = clock_tick(&store, &voice, &messaging, PUBLIC_URL, &mut next_run, now)
            .await
            .unwrap();
        assert!(!fired);
        assert_eq!(next_run, Some(due_at));
    }
}

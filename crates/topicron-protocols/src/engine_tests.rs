use super::*;

#[test]
fn test_job_key_format() {
    let id = Uuid::new_v4();
    let key = JobKey::new(id, ScheduleEventType::Start, "abc");
    assert_eq!(key.as_str(), format!("schedule-{}-Start-abc", id));
}

#[test]
fn test_job_key_recovers_correlation() {
    let id = Uuid::new_v4();
    let key = JobKey::generate(id, ScheduleEventType::End);
    assert_eq!(key.schedule_id(), Some(id));
    assert_eq!(key.event_type(), Some(ScheduleEventType::End));
    assert!(key.belongs_to(id));
    assert!(!key.belongs_to(Uuid::new_v4()));
}

#[test]
fn test_generated_keys_are_unique() {
    let id = Uuid::new_v4();
    let a = JobKey::generate(id, ScheduleEventType::Once);
    let b = JobKey::generate(id, ScheduleEventType::Once);
    assert_ne!(a, b);
}

#[test]
fn test_malformed_key_has_no_correlation() {
    let key = JobKey::from_raw("schedule-not-a-uuid-Start-x");
    assert!(key.schedule_id().is_none());
    assert!(JobKey::from_raw("other").event_type().is_none());
}

#[test]
fn test_trigger_key_mirrors_job_key() {
    let id = Uuid::new_v4();
    let key = JobKey::new(id, ScheduleEventType::Once, "s1");
    assert_eq!(
        key.trigger_key().as_str(),
        format!("trigger-{}-Once-s1", id)
    );
}

#[test]
fn test_job_data_for_event() {
    let id = Uuid::new_v4();
    let key = JobKey::generate(id, ScheduleEventType::Start);
    let trigger = ScheduleEventTrigger::new(id, ScheduleEventType::Start);
    let topics = vec![Topic::from("orders"), Topic::from("billing")];

    let data = JobData::for_event(&key, &trigger, &topics, 2).unwrap();
    assert_eq!(data.schedule_id(), Some(id));
    assert_eq!(data.event_type(), Some(ScheduleEventType::Start));
    assert_eq!(data.topics().unwrap(), topics);
    assert_eq!(data.get(JobData::ORIGINAL_TOPIC_COUNT), Some("2"));
    assert_eq!(data.get(JobData::JOB_KEY), Some(key.as_str()));
    assert!(data.created_at().is_some());
}

#[test]
fn test_job_data_missing_topics() {
    let data = JobData::new();
    assert!(data.topics().is_err());
    assert!(data.schedule_id().is_none());
}

#[test]
fn test_trigger_spec_serde_tagged() {
    let spec = TriggerSpec::Daily { hour: 9, minute: 30 };
    let json = serde_json::to_string(&spec).unwrap();
    assert!(json.contains("\"kind\":\"daily\""));
    let back: TriggerSpec = serde_json::from_str(&json).unwrap();
    assert_eq!(back, spec);
}

#[test]
fn test_trigger_state_parse() {
    assert_eq!("paused".parse::<TriggerState>().unwrap(), TriggerState::Paused);
    assert!("sleeping".parse::<TriggerState>().is_err());
}

//! Schedule and input validation.
//!
//! Schedule checks collect every problem into one `Validation` error so a
//! caller sees the full list at once. Input checks (topics, attachments)
//! reject malformed arguments with `Precondition`.

use topicron_protocols::{
    ResourceAttachment, Schedule, ScheduleSubType, SchedulingError, Topic,
};

/// Validate a schedule's own fields.
pub fn validate_schedule(schedule: &Schedule) -> Result<(), SchedulingError> {
    let mut errors = Vec::new();

    if schedule.id.is_nil() {
        errors.push("schedule id must not be nil".to_string());
    }

    if let Some(end) = schedule.end_date_time {
        if schedule.start_date_time >= end {
            errors.push(format!(
                "start {} must be before end {}",
                schedule.start_date_time.to_rfc3339(),
                end.to_rfc3339()
            ));
        }
    }

    if schedule.sub_type == ScheduleSubType::SelectedDays && schedule.start_days.is_empty() {
        errors.push("selected days schedule needs at least one start day".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchedulingError::Validation(errors.join(", ")))
    }
}

/// Reject blank topic names.
pub fn check_topics(topics: &[Topic]) -> Result<(), SchedulingError> {
    match topics.iter().position(|t| t.as_str().trim().is_empty()) {
        Some(index) => Err(SchedulingError::Precondition(format!(
            "topic at position {} is blank",
            index
        ))),
        None => Ok(()),
    }
}

/// Reject attachments with no owner or no resource.
pub fn check_attachment(attachment: &ResourceAttachment) -> Result<(), SchedulingError> {
    if attachment.schedule_id.is_nil() {
        return Err(SchedulingError::Precondition(format!(
            "attachment {} has no schedule",
            attachment.id
        )));
    }
    if attachment.resource_id.trim().is_empty() {
        return Err(SchedulingError::Precondition(format!(
            "attachment {} has a blank resource id",
            attachment.id
        )));
    }
    Ok(())
}
